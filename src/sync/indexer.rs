//! Embeds fragments and upserts them into the vector index.

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    embedding::{EmbeddingClient, EmbeddingClientError},
    fragment::Fragment,
    pinecone::{RecordMetadata, VectorIndex, VectorRecord},
};

use super::types::IndexError;

/// Pushes a document's fragments to the index in fixed-size batches.
pub struct IndexUpdater {
    embeddings: Arc<dyn EmbeddingClient>,
    index: Arc<dyn VectorIndex>,
    batch_size: usize,
}

impl IndexUpdater {
    /// Build an updater; `batch_size` is raised to at least one.
    pub fn new(
        embeddings: Arc<dyn EmbeddingClient>,
        index: Arc<dyn VectorIndex>,
        batch_size: usize,
    ) -> Self {
        Self {
            embeddings,
            index,
            batch_size: batch_size.max(1),
        }
    }

    /// Embed every fragment and upsert it with `{text, source: document_name}` metadata.
    ///
    /// Returns the number of fragments sent. Any failure aborts the remaining batches; batches
    /// already upserted stay in the index.
    pub async fn index(
        &self,
        fragments: Vec<Fragment>,
        document_name: &str,
    ) -> Result<usize, IndexError> {
        let mut indexed = 0;
        for batch in fragments.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|fragment| fragment.text.clone()).collect();
            let vectors = self.embeddings.generate_embeddings(texts.clone()).await?;
            if vectors.len() != texts.len() {
                return Err(EmbeddingClientError::CountMismatch {
                    sent: texts.len(),
                    got: vectors.len(),
                }
                .into());
            }

            let records: Vec<VectorRecord> = texts
                .into_iter()
                .zip(vectors)
                .map(|(text, values)| VectorRecord {
                    id: Uuid::new_v4().to_string(),
                    values,
                    metadata: RecordMetadata {
                        text,
                        source: document_name.to_string(),
                    },
                })
                .collect();

            let batch_len = records.len();
            let accepted = self.index.upsert(records).await?;
            if accepted < batch_len {
                tracing::warn!(
                    document = document_name,
                    sent = batch_len,
                    accepted,
                    "Vector index accepted fewer records than sent"
                );
            }
            indexed += batch_len;
            tracing::debug!(
                document = document_name,
                batch = batch_len,
                indexed,
                "Fragment batch indexed"
            );
        }
        Ok(indexed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pinecone::PineconeError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct LengthEmbeddings;

    #[async_trait]
    impl EmbeddingClient for LengthEmbeddings {
        async fn generate_embeddings(
            &self,
            texts: Vec<String>,
        ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
            Ok(texts.iter().map(|text| vec![text.len() as f32]).collect())
        }
    }

    struct DroppingEmbeddings;

    #[async_trait]
    impl EmbeddingClient for DroppingEmbeddings {
        async fn generate_embeddings(
            &self,
            _texts: Vec<String>,
        ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct RecordingIndex {
        batches: Mutex<Vec<Vec<VectorRecord>>>,
    }

    #[async_trait]
    impl VectorIndex for RecordingIndex {
        async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize, PineconeError> {
            let count = records.len();
            self.batches.lock().expect("lock").push(records);
            Ok(count)
        }
    }

    fn fragments(texts: &[&str]) -> Vec<Fragment> {
        texts
            .iter()
            .map(|text| Fragment {
                text: text.to_string(),
                source: "A.pdf".into(),
            })
            .collect()
    }

    #[tokio::test]
    async fn index_batches_fragments_and_tags_source() {
        let index = Arc::new(RecordingIndex::default());
        let updater = IndexUpdater::new(Arc::new(LengthEmbeddings), index.clone(), 2);

        let count = updater
            .index(fragments(&["a", "bb", "ccc"]), "A.pdf")
            .await
            .expect("indexed");

        assert_eq!(count, 3);
        let batches = index.batches.lock().expect("lock");
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), 2);
        assert_eq!(batches[1][0].metadata.text, "ccc");
        assert_eq!(batches[1][0].values, vec![3.0]);
        assert!(
            batches
                .iter()
                .flatten()
                .all(|record| record.metadata.source == "A.pdf")
        );
    }

    #[tokio::test]
    async fn index_without_fragments_touches_nothing() {
        let index = Arc::new(RecordingIndex::default());
        let updater = IndexUpdater::new(Arc::new(LengthEmbeddings), index.clone(), 8);

        assert_eq!(updater.index(Vec::new(), "A.pdf").await.expect("ok"), 0);
        assert!(index.batches.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn missing_vectors_abort_before_upsert() {
        let index = Arc::new(RecordingIndex::default());
        let updater = IndexUpdater::new(Arc::new(DroppingEmbeddings), index.clone(), 8);

        let error = updater
            .index(fragments(&["a"]), "A.pdf")
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            IndexError::Embedding(EmbeddingClientError::CountMismatch { sent: 1, got: 0 })
        ));
        assert!(index.batches.lock().expect("lock").is_empty());
    }

    /// Accepts every call but reports nothing written.
    #[derive(Default)]
    struct ShortCountIndex {
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl VectorIndex for ShortCountIndex {
        async fn upsert(&self, _records: Vec<VectorRecord>) -> Result<usize, PineconeError> {
            *self.calls.lock().expect("lock") += 1;
            Ok(0)
        }
    }

    #[tokio::test]
    async fn short_upsert_count_does_not_stop_later_batches() {
        let index = Arc::new(ShortCountIndex::default());
        let updater = IndexUpdater::new(Arc::new(LengthEmbeddings), index.clone(), 1);

        let count = updater
            .index(fragments(&["a", "bb"]), "A.pdf")
            .await
            .expect("indexed");

        assert_eq!(count, 2);
        assert_eq!(*index.calls.lock().expect("lock"), 2);
    }
}
