//! Page-wise text extraction from PDF bytes.

use super::types::FragmentError;

/// Turns raw document bytes into per-page text.
pub trait TextExtractor: Send + Sync {
    /// Extract the text of every page, in reading order.
    fn extract_pages(&self, remote_id: &str, bytes: &[u8]) -> Result<Vec<String>, FragmentError>;
}

/// [`TextExtractor`] backed by `pdf-extract`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract_pages(&self, remote_id: &str, bytes: &[u8]) -> Result<Vec<String>, FragmentError> {
        pdf_extract::extract_text_from_mem_by_pages(bytes).map_err(|err| {
            FragmentError::Unreadable {
                remote_id: remote_id.to_string(),
                reason: err.to_string(),
            }
        })
    }
}
