//! Shared types used by the Drive client and helpers.

use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Mapping from document name to Drive file identifier, ordered by name.
pub type RemoteDocumentListing = BTreeMap<String, String>;

/// Errors returned while interacting with the Drive API.
#[derive(Debug, Error)]
pub enum DriveError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid Drive URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Drive rejected the access token.
    #[error("Drive rejected credentials ({status}): {body}")]
    Unauthorized {
        /// HTTP status returned from Drive (401 or 403).
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Drive responded with an unexpected status code.
    #[error("Unexpected Drive response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from Drive.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
}

impl DriveError {
    pub(crate) fn from_status(status: StatusCode, body: String) -> Self {
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            Self::Unauthorized { status, body }
        } else {
            Self::UnexpectedStatus { status, body }
        }
    }
}

/// File entry returned by `files.list`.
#[derive(Debug, Clone, Deserialize)]
pub struct DriveFile {
    /// Drive file identifier.
    pub id: String,
    /// Display name (title) of the file.
    pub name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FileListResponse {
    #[serde(default)]
    pub(crate) files: Vec<DriveFile>,
    #[serde(default)]
    pub(crate) next_page_token: Option<String>,
}
