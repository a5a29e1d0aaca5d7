//! Character-budget text splitting with a fixed trailing overlap.
//!
//! Fragments are contiguous slices of the input. Each window ends at the last paragraph break
//! that fits, else the last line break, else the last space; when the window holds none of
//! these it is cut at the size limit. The next window starts `overlap` characters before the
//! previous end, so every fragment after the first repeats the tail of its predecessor and the
//! text can be rebuilt by dropping those prefixes.

use super::types::FragmentError;

/// Target fragment length, in characters.
pub const FRAGMENT_SIZE: usize = 1000;
/// Characters shared between consecutive fragments.
pub const FRAGMENT_OVERLAP: usize = 100;

const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

/// Split `text` into fragments of at most `size` characters overlapping by `overlap`.
///
/// Returns an empty vector for whitespace-only input. `overlap` is clamped to `size - 1` so
/// every window advances. Trailing whitespace that would only fill a window of repeated
/// overlap is dropped.
pub fn split_text(text: &str, size: usize, overlap: usize) -> Result<Vec<String>, FragmentError> {
    if size == 0 {
        return Err(FragmentError::InvalidFragmentSize);
    }
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let overlap = overlap.min(size - 1);
    // Byte offset of every char boundary, including the end of the text.
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(offset, _)| offset)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_count = bounds.len() - 1;

    let mut fragments = Vec::new();
    let mut start = 0;
    loop {
        // Past the overlap only whitespace is left: nothing new to index.
        if start > 0 && text[bounds[start + overlap]..].trim().is_empty() {
            break;
        }

        let limit = start + size;
        if limit >= char_count {
            fragments.push(text[bounds[start]..].to_string());
            break;
        }

        let end = find_break(text, &bounds, start, start + overlap + 1, limit);
        fragments.push(text[bounds[start]..bounds[end]].to_string());
        start = end - overlap;
    }

    Ok(fragments)
}

/// Pick the fragment end (exclusive char position) in `lowest..=limit`, preferring the
/// strongest separator and, for a given separator, the latest position.
fn find_break(text: &str, bounds: &[usize], start: usize, lowest: usize, limit: usize) -> usize {
    let window_start = bounds[start];
    for separator in SEPARATORS {
        let found = (lowest..=limit)
            .rev()
            .find(|&end| text[window_start..bounds[end]].ends_with(separator));
        if let Some(end) = found {
            return end;
        }
    }
    limit
}
