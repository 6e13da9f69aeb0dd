//! Structured error taxonomy for the retrieval core.
//!
//! Each failure class gets a stable kind so callers (CLI, HTTP server) can
//! map it to user-visible behavior without string matching.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors. Fatal at startup or ingestion time, never retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("chunk overlap ({overlap}) must be smaller than chunk size ({max_chars})")]
    OverlapTooLarge { max_chars: usize, overlap: usize },

    #[error("chunking.max_chars must be > 0")]
    ZeroChunkSize,

    #[error("unknown {field} provider: '{value}'")]
    UnknownProvider { field: &'static str, value: String },

    #[error("{0}")]
    Invalid(String),
}

/// Embedding backend failures. Surfaced to the caller as a retrieval failure,
/// never silently swallowed.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding backend unreachable: {0}")]
    Backend(String),

    #[error("malformed embedding response: {0}")]
    Malformed(String),

    #[error("embedding model returned {actual}-dim vector, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Vector index failures.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("vector has {actual} dims, index expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error(
        "parallel sequences differ in length: {vectors} vectors, {texts} texts, {metadatas} metadatas"
    )]
    LengthMismatch {
        vectors: usize,
        texts: usize,
        metadatas: usize,
    },

    #[error("search requires k >= 1")]
    InvalidTopK,

    #[error("index file not found: {0}")]
    NotFound(PathBuf),

    #[error("corrupt index state: {0}")]
    CorruptState(String),

    #[error("index I/O error: {0}")]
    Io(#[from] std::io::Error),
}
