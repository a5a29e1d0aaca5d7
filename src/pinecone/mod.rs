//! Pinecone vector store integration.

pub mod client;
pub mod types;

pub use client::{PineconeService, VectorIndex};
pub use types::{PineconeError, RecordMetadata, VectorRecord};
