//! Embedding client abstraction and the OpenAI-compatible adapter.

use crate::config::Config;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Provider rejected the API key.
    #[error("Embedding provider rejected credentials ({status}): {body}")]
    Unauthorized {
        /// HTTP status returned by the provider.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Provider returned a non-success status.
    #[error("Unexpected embedding response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the provider.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Provider returned a different number of vectors than inputs.
    #[error("Embedding count mismatch: sent {sent}, got {got}")]
    CountMismatch {
        /// Number of texts submitted.
        sent: usize,
        /// Number of vectors returned.
        got: usize,
    },
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce an embedding vector for each supplied text, in input order.
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError>;
}

/// Client for an OpenAI-compatible `/embeddings` endpoint.
pub struct OpenAiEmbeddingClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiEmbeddingClient {
    /// Construct a client for `model` at `base_url` (e.g. `https://api.openai.com/v1`).
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, EmbeddingClientError> {
        let http = Client::builder().user_agent("drive-pdf-sync/0.1").build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Construct a client from the runtime configuration.
    pub fn from_config(config: &Config) -> Result<Self, EmbeddingClientError> {
        Self::new(
            config.openai_base_url.clone(),
            config.openai_api_key.clone(),
            config.embedding_model.clone(),
        )
    }

    fn embeddings_url(&self) -> String {
        format!("{}/embeddings", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(model = %self.model, inputs = texts.len(), "Generating embeddings");
        let response = self
            .http
            .post(self.embeddings_url())
            .bearer_auth(&self.api_key)
            .json(&EmbeddingsRequest {
                model: &self.model,
                input: &texts,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                EmbeddingClientError::Unauthorized { status, body }
            } else {
                EmbeddingClientError::UnexpectedStatus { status, body }
            };
            tracing::error!(error = %error, "Embedding request failed");
            return Err(error);
        }

        let EmbeddingsResponse { mut data } = response.json().await?;
        if data.len() != texts.len() {
            return Err(EmbeddingClientError::CountMismatch {
                sent: texts.len(),
                got: data.len(),
            });
        }
        data.sort_by_key(|datum| datum.index);
        Ok(data.into_iter().map(|datum| datum.embedding).collect())
    }
}
