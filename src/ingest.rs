//! Ingestion pipeline orchestration.
//!
//! Coordinates the one-shot batch flow: discover files → load documents →
//! chunk → embed in batches → append to the index → persist. Per-file load
//! failures are logged and skipped; embedding failures abort the run before
//! the index is saved.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::chunk::chunk_documents;
use crate::config::{self, ChunkingConfig, Config};
use crate::embedding::{create_embedder, Embedder};
use crate::error::IndexError;
use crate::index::VectorIndex;
use crate::loader;
use crate::models::Document;
use crate::query;

/// Counters reported after an ingestion run.
pub struct IngestStats {
    pub documents: usize,
    pub chunks: usize,
}

/// Chunk and embed `documents`, appending everything to `index`.
///
/// Embedding runs in `batch_size`-sized batches; each batch is appended
/// atomically, so a mid-run failure leaves only whole batches behind and
/// never a torn entry.
pub async fn ingest_documents(
    embedder: &dyn Embedder,
    index: &mut VectorIndex,
    documents: &[Document],
    chunking: &ChunkingConfig,
    batch_size: usize,
) -> Result<IngestStats> {
    let chunks = chunk_documents(documents, chunking.max_chars, chunking.overlap)?;

    for batch in chunks.chunks(batch_size.max(1)) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder.embed_texts(&texts).await?;
        let metadatas = batch.iter().map(|c| c.metadata.clone()).collect();
        index.add(vectors, texts, metadatas)?;
    }

    Ok(IngestStats {
        documents: documents.len(),
        chunks: chunks.len(),
    })
}

/// CLI entry point for `ka ingest`.
#[allow(clippy::too_many_arguments)]
pub async fn run_ingest(
    cfg: &Config,
    path: &Path,
    index_override: Option<PathBuf>,
    chunk_size: Option<usize>,
    chunk_overlap: Option<usize>,
    fresh: bool,
    smoke_query: Option<String>,
    k: usize,
) -> Result<()> {
    let index_path = index_override.unwrap_or_else(|| cfg.index.path.clone());
    let chunking = ChunkingConfig {
        max_chars: chunk_size.unwrap_or(cfg.chunking.max_chars),
        overlap: chunk_overlap.unwrap_or(cfg.chunking.overlap),
    };
    // Fail fast on bad parameters before reading any file.
    config::validate_chunking(&chunking)?;

    let embedder = create_embedder(&cfg.embedding)?;

    let mut index = if fresh {
        VectorIndex::new()
    } else {
        match VectorIndex::load(&index_path) {
            Ok(index) => index,
            Err(IndexError::NotFound(_)) => VectorIndex::new(),
            Err(e) => return Err(e.into()),
        }
    };

    let files = loader::discover_files(path)?;
    let mut documents = Vec::new();
    for file in &files {
        match loader::load_documents(file) {
            Ok(mut docs) => documents.append(&mut docs),
            Err(e) => warn!(file = %file.display(), error = %e, "skipping file"),
        }
    }

    if documents.is_empty() {
        println!("No supported documents found.");
        return Ok(());
    }

    let stats = ingest_documents(
        embedder.as_ref(),
        &mut index,
        &documents,
        &chunking,
        cfg.embedding.batch_size,
    )
    .await?;

    index.save(&index_path)?;

    println!("ingest {}", path.display());
    println!("  files: {}", files.len());
    println!("  documents: {}", stats.documents);
    println!("  chunks: {}", stats.chunks);
    println!("  index entries: {}", index.len());
    println!("  index: {}", index_path.display());
    println!("ok");

    if let Some(question) = smoke_query {
        let retrieval = query::retrieve(embedder.as_ref(), &index, &question, k).await?;
        println!();
        if retrieval.results.is_empty() {
            println!("No relevant context found.");
        } else {
            println!("Query results:");
            query::print_results(&retrieval.results);
        }
    }

    Ok(())
}
