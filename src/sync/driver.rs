//! Sync driver coordinating listing, fragmentation, indexing, and the ledger.

use std::io::Write;
use std::sync::Arc;

use crate::{
    config::Config,
    drive::{DocumentSource, DriveAuthenticator, DriveService},
    embedding::{EmbeddingClient, OpenAiEmbeddingClient},
    fragment::{DocumentFragmenter, PdfTextExtractor, TextExtractor},
    ledger::{ProcessedDocument, ProcessedSetStore},
    metrics::{MetricsSnapshot, SyncMetrics},
    pinecone::{PineconeService, VectorIndex},
};

use super::indexer::IndexUpdater;
use super::types::{DocumentState, SyncError, SyncReport};

/// Runs one incremental sync from the Drive folder into the vector index.
///
/// Every collaborator is injected, so tests can swap the Drive folder, PDF parser, embedding
/// provider, and index for in-memory fakes. Documents are handled one at a time; the ledger is
/// rewritten as soon as a document's last fragment is upserted.
pub struct SyncDriver {
    source: Arc<dyn DocumentSource>,
    fragmenter: DocumentFragmenter,
    indexer: IndexUpdater,
    store: ProcessedSetStore,
    metrics: SyncMetrics,
}

impl SyncDriver {
    /// Assemble a driver from explicit collaborators.
    pub fn new(
        source: Arc<dyn DocumentSource>,
        extractor: Arc<dyn TextExtractor>,
        embeddings: Arc<dyn EmbeddingClient>,
        index: Arc<dyn VectorIndex>,
        store: ProcessedSetStore,
        batch_size: usize,
    ) -> Self {
        Self {
            fragmenter: DocumentFragmenter::new(Arc::clone(&source), extractor),
            source,
            indexer: IndexUpdater::new(embeddings, index, batch_size),
            store,
            metrics: SyncMetrics::new(),
        }
    }

    /// Build the production driver: Drive over OAuth, `pdf-extract`, OpenAI, and Pinecone.
    pub async fn from_config(config: &Config) -> Result<Self, SyncError> {
        tracing::info!("Authorizing Drive access");
        let access_token = DriveAuthenticator::new(config)?.access_token().await?;
        let drive = DriveService::with_base_url(
            &config.drive_api_url,
            access_token,
            config.drive_folder_id.clone(),
        )?;
        let embeddings = OpenAiEmbeddingClient::from_config(config)?;
        let index = PineconeService::connect(config).await?;
        tracing::info!(index = %config.pinecone_index_name, "Vector index ready");

        Ok(Self::new(
            Arc::new(drive),
            Arc::new(PdfTextExtractor),
            Arc::new(embeddings),
            Arc::new(index),
            ProcessedSetStore::new(config.ledger_path.clone()),
            config.index_batch_size,
        ))
    }

    /// Index every listed document missing from the ledger, writing progress lines to `out`.
    pub async fn run<W: Write>(&self, out: &mut W) -> Result<SyncReport, SyncError> {
        writeln!(out, "Iniciando actualización de documentos...")?;

        let mut processed = self.store.load()?;
        let listing = self.source.list_documents().await?;
        tracing::info!(
            remote = listing.len(),
            recorded = processed.len(),
            "Comparing Drive folder against ledger"
        );

        let mut report = SyncReport::default();
        for (name, remote_id) in &listing {
            if processed.contains_key(name) {
                writeln!(out, "{name} ya fue procesado. Omitiendo...")?;
                tracing::debug!(
                    document = %name,
                    state = ?DocumentState::Skipped,
                    "Document already recorded"
                );
                self.metrics.record_skip();
                report.skipped.push(name.clone());
                continue;
            }

            writeln!(out, "Procesando: {name}")?;
            tracing::debug!(document = %name, state = ?DocumentState::Pending, "Document queued");
            let (entry, fragment_count) = self.process_document(name, remote_id).await?;

            processed.insert(name.clone(), entry);
            self.store.save(&processed)?;
            tracing::info!(
                document = %name,
                fragments = fragment_count,
                state = ?DocumentState::Recorded,
                "Document recorded"
            );

            self.metrics.record_document(fragment_count as u64);
            report.fragments_indexed += fragment_count;
            report.processed.push(name.clone());
        }

        writeln!(out, "Actualización completada.")?;
        tracing::info!(metrics = ?self.metrics.snapshot(), "Sync finished");
        Ok(report)
    }

    async fn process_document(
        &self,
        name: &str,
        remote_id: &str,
    ) -> Result<(ProcessedDocument, usize), SyncError> {
        tracing::debug!(
            document = name,
            remote_id,
            state = ?DocumentState::Fragmenting,
            "Fetching document"
        );
        let document = self.fragmenter.fetch(remote_id).await?;
        let page_count = document.page_count();
        let fragments = document.fragments(name)?;
        tracing::debug!(
            document = name,
            pages = page_count,
            fragments = fragments.len(),
            "Document fragmented"
        );

        tracing::debug!(document = name, state = ?DocumentState::Indexing, "Indexing fragments");
        let fragment_count = self.indexer.index(fragments, name).await?;

        Ok((
            ProcessedDocument {
                remote_id: remote_id.to_string(),
                page_count,
            },
            fragment_count,
        ))
    }

    /// Counters accumulated across runs of this driver.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
