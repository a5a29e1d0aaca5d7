//! Error taxonomy and run summaries for the sync driver.

use crate::{
    config::ConfigError,
    drive::{AuthError, DriveError},
    embedding::EmbeddingClientError,
    fragment::FragmentError,
    ledger::LedgerError,
    pinecone::PineconeError,
};
use std::io;
use thiserror::Error;

/// Errors raised while pushing one document's fragments into the index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Embedding provider failed to produce vectors for a batch.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Vector index rejected an upsert.
    #[error("Failed to upsert vectors: {0}")]
    Upsert(#[from] PineconeError),
}

/// Any failure that aborts a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Configuration was missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    /// Drive credentials could not be obtained.
    #[error("Drive authorization failed: {0}")]
    Auth(#[from] AuthError),
    /// Listing the Drive folder failed.
    #[error("Drive listing failed: {0}")]
    Drive(#[from] DriveError),
    /// A document could not be downloaded or parsed.
    #[error("Fragmentation failed: {0}")]
    Fragment(#[from] FragmentError),
    /// Embedding or upserting fragments failed.
    #[error("Indexing failed: {0}")]
    Index(#[from] IndexError),
    /// Embedding client could not be constructed.
    #[error("Embedding client error: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Vector index client could not be constructed.
    #[error("Vector index error: {0}")]
    VectorIndex(#[from] PineconeError),
    /// Ledger could not be read or written.
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
    /// Progress output could not be written.
    #[error("Failed to write progress: {0}")]
    Output(#[from] io::Error),
}

/// Coarse classification of a [`SyncError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Credentials rejected or unobtainable.
    Auth,
    /// Remote service unreachable or returned an error.
    Network,
    /// Document content could not be parsed.
    Parse,
    /// Missing or invalid settings.
    Config,
    /// Local disk or stdout failure.
    LocalIo,
}

impl SyncError {
    /// Classify the error for reporting.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Config(_) => FailureKind::Config,
            Self::Auth(AuthError::ClientSecretsUnreadable { .. })
            | Self::Auth(AuthError::InvalidClientSecrets { .. }) => FailureKind::Config,
            Self::Auth(_) => FailureKind::Auth,
            Self::Drive(error) => drive_kind(error),
            Self::Fragment(FragmentError::Download(error)) => drive_kind(error),
            Self::Fragment(FragmentError::Unreadable { .. }) => FailureKind::Parse,
            Self::Fragment(FragmentError::InvalidFragmentSize) => FailureKind::Config,
            Self::Index(IndexError::Embedding(error)) | Self::Embedding(error) => {
                embedding_kind(error)
            }
            Self::Index(IndexError::Upsert(error)) | Self::VectorIndex(error) => {
                pinecone_kind(error)
            }
            Self::Ledger(_) | Self::Output(_) => FailureKind::LocalIo,
        }
    }
}

fn drive_kind(error: &DriveError) -> FailureKind {
    match error {
        DriveError::Unauthorized { .. } => FailureKind::Auth,
        DriveError::InvalidUrl(_) => FailureKind::Config,
        DriveError::Http(_) | DriveError::UnexpectedStatus { .. } => FailureKind::Network,
    }
}

fn embedding_kind(error: &EmbeddingClientError) -> FailureKind {
    match error {
        EmbeddingClientError::Unauthorized { .. } => FailureKind::Auth,
        _ => FailureKind::Network,
    }
}

fn pinecone_kind(error: &PineconeError) -> FailureKind {
    match error {
        PineconeError::Unauthorized { .. } => FailureKind::Auth,
        PineconeError::InvalidUrl(_) => FailureKind::Config,
        PineconeError::Http(_) | PineconeError::UnexpectedStatus { .. } => FailureKind::Network,
    }
}

/// Per-document progress through a run. Only `Recorded` reaches the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentState {
    /// Listed remotely, not yet examined.
    Pending,
    /// Already in the ledger; nothing to do.
    Skipped,
    /// Downloading, parsing, and splitting.
    Fragmenting,
    /// Embedding and upserting fragments.
    Indexing,
    /// Persisted to the ledger.
    Recorded,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Documents indexed and recorded during this run, in processing order.
    pub processed: Vec<String>,
    /// Documents skipped because the ledger already held them.
    pub skipped: Vec<String>,
    /// Total fragments upserted.
    pub fragments_indexed: usize,
}
