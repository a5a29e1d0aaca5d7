//! Durable record of documents that have been fully indexed.
//!
//! The ledger is a single pretty-printed JSON object keyed by document name. It is read once
//! at start-up and rewritten wholesale after every completed document, so the file on disk
//! only ever names documents whose fragments all reached the index.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while reading or writing the ledger file.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Filesystem access failed.
    #[error("Ledger I/O failed for {path}: {source}")]
    Io {
        /// Ledger path involved in the failing operation.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Ledger file exists but does not hold the expected JSON shape.
    #[error("Ledger {path} is not valid JSON: {source}")]
    Malformed {
        /// Ledger path that failed to parse.
        path: PathBuf,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },
}

/// Ledger entry for one fully indexed document. The document name is the map key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedDocument {
    /// Identifier of the document in the remote drive.
    #[serde(alias = "id")]
    pub remote_id: String,
    /// Number of pages reported by the PDF parser.
    #[serde(alias = "num_paginas")]
    pub page_count: u32,
}

/// Mapping from document name to its ledger entry.
pub type ProcessedSet = BTreeMap<String, ProcessedDocument>;

/// File-backed store for the [`ProcessedSet`].
#[derive(Debug, Clone)]
pub struct ProcessedSetStore {
    path: PathBuf,
}

impl ProcessedSetStore {
    /// Create a store rooted at `path`. Nothing is touched until `load` or `save`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing ledger file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the ledger, returning an empty set on first run.
    pub fn load(&self) -> Result<ProcessedSet, LedgerError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No ledger found; starting empty");
                return Ok(ProcessedSet::new());
            }
            Err(source) => return Err(self.io_error(source)),
        };

        let set: ProcessedSet =
            serde_json::from_str(&contents).map_err(|source| LedgerError::Malformed {
                path: self.path.clone(),
                source,
            })?;
        tracing::debug!(path = %self.path.display(), documents = set.len(), "Ledger loaded");
        Ok(set)
    }

    /// Overwrite the ledger with `set`.
    ///
    /// The JSON is written to a temporary file next to the target and renamed into place, so a
    /// crash mid-write leaves the previous ledger intact.
    pub fn save(&self, set: &ProcessedSet) -> Result<(), LedgerError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|source| self.io_error(source))?;

        let mut file =
            tempfile::NamedTempFile::new_in(&dir).map_err(|source| self.io_error(source))?;
        write_pretty(&mut file, set).map_err(|source| self.io_error(source))?;
        file.as_file()
            .sync_all()
            .map_err(|source| self.io_error(source))?;
        file.persist(&self.path)
            .map_err(|err| self.io_error(err.error))?;

        tracing::debug!(path = %self.path.display(), documents = set.len(), "Ledger saved");
        Ok(())
    }

    fn io_error(&self, source: io::Error) -> LedgerError {
        LedgerError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

fn write_pretty<W: Write>(writer: &mut W, set: &ProcessedSet) -> io::Result<()> {
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut *writer, formatter);
    set.serialize(&mut serializer).map_err(io::Error::other)?;
    writer.flush()
}
