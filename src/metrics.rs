use std::sync::atomic::{AtomicU64, Ordering};

/// Counters describing a sync run.
#[derive(Default)]
pub struct SyncMetrics {
    documents_processed: AtomicU64,
    documents_skipped: AtomicU64,
    fragments_indexed: AtomicU64,
}

impl SyncMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fully indexed document and the number of fragments produced for it.
    pub fn record_document(&self, fragment_count: u64) {
        self.documents_processed.fetch_add(1, Ordering::Relaxed);
        self.fragments_indexed
            .fetch_add(fragment_count, Ordering::Relaxed);
    }

    /// Record a document that was already present in the ledger.
    pub fn record_skip(&self) {
        self.documents_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_processed: self.documents_processed.load(Ordering::Relaxed),
            documents_skipped: self.documents_skipped.load(Ordering::Relaxed),
            fragments_indexed: self.fragments_indexed.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of the sync counters used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Documents fragmented, indexed and recorded during this run.
    pub documents_processed: u64,
    /// Documents skipped because the ledger already held them.
    pub documents_skipped: u64,
    /// Total fragments upserted across all processed documents.
    pub fragments_indexed: u64,
}
