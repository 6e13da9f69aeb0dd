//! Core data types flowing through the ingestion and query pipelines.

use serde::{Deserialize, Serialize};

/// Provenance for a document and every chunk derived from it.
///
/// A fixed record rather than an open string map: every entry carries the
/// originating source path, plus a page or slide number when the loader has
/// that granularity (PDF pages, PPTX slides).
///
/// Serialized into index snapshots: the encoding is positional, so absent
/// fields must still be written (no `skip_serializing_if`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub source: String,
    pub page: Option<u32>,
    pub slide: Option<u32>,
}

impl DocumentMetadata {
    pub fn for_source(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            page: None,
            slide: None,
        }
    }

    pub fn for_page(source: impl Into<String>, page: u32) -> Self {
        Self {
            source: source.into(),
            page: Some(page),
            slide: None,
        }
    }

    pub fn for_slide(source: impl Into<String>, slide: u32) -> Self {
        Self {
            source: source.into(),
            page: None,
            slide: Some(slide),
        }
    }
}

/// A loaded document: full body text plus provenance.
///
/// Loaders may emit several documents per file (one per PDF page, one per
/// PPTX slide).
#[derive(Debug, Clone)]
pub struct Document {
    pub text: String,
    pub metadata: DocumentMetadata,
}

/// A bounded-length span of document text, immutable once created.
///
/// Metadata is propagated unchanged from the source document.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub text: String,
    pub metadata: DocumentMetadata,
}

/// One ranked entry returned by [`crate::index::VectorIndex::search`].
///
/// `score` is cosine similarity in `[-1.0, 1.0]`.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub text: String,
    pub metadata: DocumentMetadata,
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_binary_roundtrip_with_absent_fields() {
        // `page`/`slide` are usually None; the snapshot codec must still
        // encode and decode them.
        for metadata in [
            DocumentMetadata::for_source("notes.txt"),
            DocumentMetadata::for_page("report.pdf", 12),
            DocumentMetadata::for_slide("deck.pptx", 3),
        ] {
            let bytes = bincode::serialize(&metadata).unwrap();
            let back: DocumentMetadata = bincode::deserialize(&bytes).unwrap();
            assert_eq!(back, metadata);
        }
    }
}
