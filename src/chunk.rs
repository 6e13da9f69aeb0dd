//! Overlapping, boundary-aware text chunker.
//!
//! Splits document body text into [`Chunk`]s of at most `max_chars` bytes,
//! with consecutive windows overlapping by `overlap` bytes so no semantic
//! boundary loses context abruptly. Split points are chosen hierarchically:
//! paragraph break (`\n\n`), then sentence terminator, then word break, and
//! only then a raw character boundary. A finer boundary is rejected when it
//! would leave the window less than half full, which also guarantees forward
//! progress.
//!
//! Pure and deterministic: the same input and parameters always produce the
//! same chunks. Metadata is propagated unchanged from each source document.

use crate::config::{validate_chunking, ChunkingConfig};
use crate::error::ConfigError;
use crate::models::{Chunk, Document};

/// Split every document into overlapping chunks.
///
/// Whitespace-only documents produce no chunks. A loader unit that already
/// fits within `max_chars` (e.g. one slide) stays a single chunk.
///
/// # Errors
///
/// Fails fast with [`ConfigError`] when `overlap >= max_chars` or
/// `max_chars == 0`.
pub fn chunk_documents(
    documents: &[Document],
    max_chars: usize,
    overlap: usize,
) -> Result<Vec<Chunk>, ConfigError> {
    validate_chunking(&ChunkingConfig { max_chars, overlap })?;

    let mut chunks = Vec::new();
    for doc in documents {
        for piece in split_text(&doc.text, max_chars, overlap) {
            chunks.push(Chunk {
                text: piece,
                metadata: doc.metadata.clone(),
            });
        }
    }
    Ok(chunks)
}

/// Split one text into overlapping windows. Parameters must already be
/// validated (`0 < overlap < max_chars` is assumed by the progress argument).
fn split_text(text: &str, max_chars: usize, overlap: usize) -> Vec<String> {
    let len = text.len();
    let mut pieces = Vec::new();
    let mut start = 0usize;

    while start < len {
        let mut hard_end = floor_char_boundary(text, (start + max_chars).min(len));
        if hard_end <= start {
            // `max_chars` is smaller than the character at `start`; take
            // that character whole so the scan always advances.
            hard_end = ceil_char_boundary(text, start + 1);
        }
        let end = if hard_end < len {
            snap_end(text, start, hard_end)
        } else {
            len
        };

        let piece = text[start..end].trim();
        if !piece.is_empty() {
            pieces.push(piece.to_string());
        }

        if end >= len {
            break;
        }

        // Step back by `overlap`, but never behind the previous start.
        let mut next = floor_char_boundary(text, end.saturating_sub(overlap));
        if next <= start {
            next = end;
        }
        start = next;
    }

    pieces
}

/// Pick the best split point in `(start, hard_end]`, preferring finer
/// boundaries. A candidate is accepted only if it keeps the window at least
/// half full, so snapping can never stall the scan.
fn snap_end(text: &str, start: usize, hard_end: usize) -> usize {
    let min_end = start + (hard_end - start) / 2;
    let window = &text[start..hard_end];

    if let Some(pos) = window.rfind("\n\n") {
        let end = start + pos + 2;
        if end > min_end {
            return end;
        }
    }

    if let Some(pos) = window.rfind(['.', '!', '?', '\n']) {
        let end = start + pos + 1;
        if end > min_end {
            return end;
        }
    }

    if let Some(pos) = window.rfind(' ') {
        let end = start + pos + 1;
        if end > min_end {
            return end;
        }
    }

    hard_end
}

/// Largest char boundary `<= index`.
fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Smallest char boundary `>= index` (at most `text.len()`).
fn ceil_char_boundary(text: &str, mut index: usize) -> usize {
    let len = text.len();
    while index < len && !text.is_char_boundary(index) {
        index += 1;
    }
    index.min(len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentMetadata;

    fn doc(text: &str) -> Document {
        Document {
            text: text.to_string(),
            metadata: DocumentMetadata::for_source("test.txt"),
        }
    }

    #[test]
    fn test_small_text_single_chunk() {
        let chunks = chunk_documents(&[doc("Hello, world!")], 800, 100).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Hello, world!");
    }

    #[test]
    fn test_whitespace_only_text_produces_no_chunks() {
        let chunks = chunk_documents(&[doc("   \n\n  ")], 800, 100).unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_overlap_ge_size_is_config_error() {
        let err = chunk_documents(&[doc("text")], 100, 100).unwrap_err();
        assert!(matches!(err, ConfigError::OverlapTooLarge { .. }));
    }

    #[test]
    fn test_two_sentence_document_three_overlapping_chunks() {
        // 38 chars at max 20 / overlap 5: sentence snap, then word snap,
        // then the tail.
        let chunks =
            chunk_documents(&[doc("The quick brown fox. The fox ran fast.")], 20, 5).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text, "The quick brown fox.");
        assert_eq!(chunks[1].text, "fox. The fox ran");
        assert_eq!(chunks[2].text, "ran fast.");
        // Consecutive chunks share text from the overlap region
        assert!(chunks[0].text.ends_with("fox."));
        assert!(chunks[1].text.starts_with("fox."));
    }

    #[test]
    fn test_minimal_cover_without_boundaries() {
        // No snap candidates: pure sliding window. 2000 chars at 800/100
        // covers in exactly ceil((2000-100)/700) = 3 windows.
        let text = "a".repeat(2000);
        let chunks = chunk_documents(&[doc(&text)], 800, 100).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text.len(), 800);
        assert_eq!(chunks[1].text.len(), 800);
        assert_eq!(chunks[2].text.len(), 600);
    }

    #[test]
    fn test_paragraph_boundary_preferred() {
        let para1 = "Alpha paragraph with enough characters.";
        let para2 = "Beta paragraph with enough characters too.";
        let text = format!("{}\n\n{}", para1, para2);
        let chunks = chunk_documents(&[doc(&text)], 60, 10).unwrap();
        assert_eq!(chunks[0].text, para1);
    }

    #[test]
    fn test_metadata_propagated_to_every_chunk() {
        let document = Document {
            text: "First sentence here. Second sentence here. Third one.".to_string(),
            metadata: DocumentMetadata::for_slide("deck.pptx", 7),
        };
        let chunks = chunk_documents(&[document], 25, 5).unwrap();
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert_eq!(c.metadata.source, "deck.pptx");
            assert_eq!(c.metadata.slide, Some(7));
        }
    }

    #[test]
    fn test_deterministic() {
        let d = doc("Alpha beta gamma. Delta epsilon zeta. Eta theta iota kappa.");
        let a = chunk_documents(std::slice::from_ref(&d), 24, 6).unwrap();
        let b = chunk_documents(std::slice::from_ref(&d), 24, 6).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_window_smaller_than_one_char_still_advances() {
        // 3-byte characters with a 2-byte window: each window takes one
        // whole character, and the scan terminates.
        let chunks = chunk_documents(&[doc("日日日")], 2, 1).unwrap();
        assert_eq!(chunks.len(), 3);
        for c in &chunks {
            assert_eq!(c.text, "日");
        }
    }

    #[test]
    fn test_multibyte_text_does_not_split_inside_char() {
        let text = "日".repeat(100);
        let chunks = chunk_documents(&[doc(&text)], 100, 10).unwrap();
        assert!(!chunks.is_empty());
        for c in &chunks {
            assert!(c.text.chars().all(|ch| ch == '日'));
        }
    }
}
