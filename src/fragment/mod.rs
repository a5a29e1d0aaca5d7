//! Document fragmentation: PDF download, page text extraction, and overlapping splits.

pub mod extract;
mod fragmenter;
pub mod splitter;
pub mod types;

pub use extract::{PdfTextExtractor, TextExtractor};
pub use fragmenter::DocumentFragmenter;
pub use splitter::{FRAGMENT_OVERLAP, FRAGMENT_SIZE, split_text};
pub use types::{Fragment, FragmentError, LoadedDocument};
