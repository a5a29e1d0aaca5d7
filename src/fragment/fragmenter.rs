//! Fetches remote documents and turns them into ordered fragments.

use std::sync::Arc;

use crate::drive::DocumentSource;

use super::extract::TextExtractor;
use super::types::{Fragment, FragmentError, LoadedDocument};

/// Downloads a document once and exposes its page count and fragments.
pub struct DocumentFragmenter {
    source: Arc<dyn DocumentSource>,
    extractor: Arc<dyn TextExtractor>,
}

impl DocumentFragmenter {
    /// Build a fragmenter reading from `source` and parsing with `extractor`.
    pub fn new(source: Arc<dyn DocumentSource>, extractor: Arc<dyn TextExtractor>) -> Self {
        Self { source, extractor }
    }

    /// Download and parse a document.
    ///
    /// Parsing runs on the blocking pool; a parser panic is reported as an unreadable document.
    pub async fn fetch(&self, remote_id: &str) -> Result<LoadedDocument, FragmentError> {
        let bytes = self.source.download(remote_id).await?;
        let extractor = Arc::clone(&self.extractor);
        let id = remote_id.to_string();

        let pages = tokio::task::spawn_blocking(move || extractor.extract_pages(&id, &bytes))
            .await
            .map_err(|err| FragmentError::Unreadable {
                remote_id: remote_id.to_string(),
                reason: format!("parser task failed: {err}"),
            })??;

        tracing::debug!(remote_id, pages = pages.len(), "Document parsed");
        Ok(LoadedDocument {
            remote_id: remote_id.to_string(),
            pages,
        })
    }

    /// Report the page count of a remote document.
    pub async fn page_count(&self, remote_id: &str) -> Result<u32, FragmentError> {
        Ok(self.fetch(remote_id).await?.page_count())
    }

    /// Fetch a remote document and split it into fragments tagged with `document_name`.
    pub async fn fragment(
        &self,
        remote_id: &str,
        document_name: &str,
    ) -> Result<Vec<Fragment>, FragmentError> {
        self.fetch(remote_id).await?.fragments(document_name)
    }
}
