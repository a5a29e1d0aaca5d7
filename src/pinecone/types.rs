//! Shared types used by the Pinecone client.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned while interacting with Pinecone.
#[derive(Debug, Error)]
pub enum PineconeError {
    /// Index host failed to parse or normalize.
    #[error("Invalid Pinecone URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Pinecone rejected the API key.
    #[error("Pinecone rejected credentials ({status}): {body}")]
    Unauthorized {
        /// HTTP status returned from Pinecone.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Pinecone responded with an unexpected status code.
    #[error("Unexpected Pinecone response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from Pinecone.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
}

impl PineconeError {
    pub(crate) fn from_status(status: StatusCode, body: String) -> Self {
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            Self::Unauthorized { status, body }
        } else {
            Self::UnexpectedStatus { status, body }
        }
    }
}

/// Metadata stored alongside each vector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordMetadata {
    /// Fragment text, kept so similarity hits can be rendered without a second lookup.
    pub text: String,
    /// Name of the document the fragment came from.
    pub source: String,
}

/// Vector ready for upsert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorRecord {
    /// Record identifier.
    pub id: String,
    /// Embedding values.
    pub values: Vec<f32>,
    /// Filterable metadata.
    pub metadata: RecordMetadata,
}

#[derive(Serialize)]
pub(crate) struct UpsertRequest<'a> {
    pub(crate) vectors: &'a [VectorRecord],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) namespace: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpsertResponse {
    #[serde(default)]
    pub(crate) upserted_count: usize,
}

#[derive(Deserialize)]
pub(crate) struct DescribeIndexResponse {
    pub(crate) host: String,
}
