//! Incremental sync: ledger diffing, per-document fragmentation and indexing.

mod driver;
mod indexer;
pub mod types;

pub use driver::SyncDriver;
pub use indexer::IndexUpdater;
pub use types::{DocumentState, FailureKind, IndexError, SyncError, SyncReport};
