#![deny(missing_docs)]

//! Core library for syncing Google Drive PDFs into a Pinecone index.

/// Environment-driven configuration management.
pub mod config;
/// Google Drive listing, download and OAuth.
pub mod drive;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// PDF text extraction and fragment splitting.
pub mod fragment;
/// Processed-documents ledger.
pub mod ledger;
/// Structured logging and tracing setup.
pub mod logging;
/// Sync run counters.
pub mod metrics;
/// Pinecone vector store integration.
pub mod pinecone;
/// Sync orchestration.
pub mod sync;
