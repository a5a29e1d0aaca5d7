//! Core data types and error definitions for document fragmentation.

use super::splitter::{FRAGMENT_OVERLAP, FRAGMENT_SIZE, split_text};
use crate::drive::DriveError;
use thiserror::Error;

/// Errors produced while turning a remote PDF into text fragments.
#[derive(Debug, Error)]
pub enum FragmentError {
    /// Fragmentation was configured with an impossible size.
    #[error("fragment size must be greater than zero")]
    InvalidFragmentSize,
    /// Document bytes could not be fetched.
    #[error("Failed to download document: {0}")]
    Download(#[from] DriveError),
    /// Document content could not be parsed as a PDF.
    #[error("Unreadable document {remote_id}: {reason}")]
    Unreadable {
        /// Drive identifier of the failing document.
        remote_id: String,
        /// Parser diagnostic.
        reason: String,
    },
}

/// Bounded slice of a document's text, tagged with the document it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Fragment text submitted for embedding.
    pub text: String,
    /// Name of the source document.
    pub source: String,
}

/// A downloaded and parsed document, ready to be counted and fragmented.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    /// Drive identifier the content was fetched from.
    pub remote_id: String,
    /// Extracted text, one entry per page in reading order.
    pub pages: Vec<String>,
}

impl LoadedDocument {
    /// Number of pages in the document.
    pub fn page_count(&self) -> u32 {
        u32::try_from(self.pages.len()).unwrap_or(u32::MAX)
    }

    /// Split every page with the fixed 1000/100 policy, tagging fragments with `source`.
    ///
    /// Pages are split independently, so a fragment never spans a page break.
    pub fn fragments(&self, source: &str) -> Result<Vec<Fragment>, FragmentError> {
        let mut fragments = Vec::new();
        for page in &self.pages {
            for text in split_text(page, FRAGMENT_SIZE, FRAGMENT_OVERLAP)? {
                fragments.push(Fragment {
                    text,
                    source: source.to_string(),
                });
            }
        }
        Ok(fragments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragments_follow_page_order_and_skip_blank_pages() {
        let document = LoadedDocument {
            remote_id: "id1".into(),
            pages: vec!["first page".into(), "   ".into(), "third page".into()],
        };

        let fragments = document.fragments("A.pdf").expect("fragments");

        assert_eq!(document.page_count(), 3);
        assert_eq!(
            fragments,
            vec![
                Fragment {
                    text: "first page".into(),
                    source: "A.pdf".into()
                },
                Fragment {
                    text: "third page".into(),
                    source: "A.pdf".into()
                },
            ]
        );
    }
}
