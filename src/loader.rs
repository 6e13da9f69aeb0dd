//! File discovery and per-format document loading.
//!
//! Turns a file-or-directory path into [`Document`]s with provenance
//! metadata. Supported formats: `.pdf`, `.docx`, `.pptx`, `.txt`, `.md`.
//! A PDF yields one document per page and a PPTX deck one per slide, each
//! carrying its page/slide number; `.docx`, `.txt`, and `.md` yield a
//! single document per file. Legacy `.ppt` is not parsed; decks must be
//! converted to `.pptx` first.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::extract::{self, ExtractError};
use crate::models::{Document, DocumentMetadata};

const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "docx", "pptx", "txt", "md"];

/// Collect supported files under `path`, sorted for deterministic ingestion
/// order. A single supported file is returned as-is; a missing path is an
/// error.
pub fn discover_files(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.exists() {
        bail!("path not found: {}", path.display());
    }

    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|p| is_supported(p))
        .collect();
    files.sort();
    Ok(files)
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Load one file into documents with provenance metadata.
pub fn load_documents(path: &Path) -> Result<Vec<Document>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    let source = path.display().to_string();

    match ext.as_str() {
        "txt" | "md" => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", source))?;
            Ok(vec![Document {
                text,
                metadata: DocumentMetadata::for_source(source),
            }])
        }
        "pdf" => {
            let bytes = read_bytes(path)?;
            let pages = extract::extract_pdf_pages(&bytes)?;
            Ok(pages
                .into_iter()
                .map(|(page, text)| Document {
                    text,
                    metadata: DocumentMetadata::for_page(source.clone(), page),
                })
                .collect())
        }
        "docx" => {
            let bytes = read_bytes(path)?;
            let text = extract::extract_docx(&bytes)?;
            Ok(vec![Document {
                text,
                metadata: DocumentMetadata::for_source(source),
            }])
        }
        "pptx" => {
            let bytes = read_bytes(path)?;
            let slides = extract::extract_pptx_slides(&bytes)?;
            Ok(slides
                .into_iter()
                .map(|(slide, text)| Document {
                    text,
                    metadata: DocumentMetadata::for_slide(source.clone(), slide),
                })
                .collect())
        }
        "ppt" => bail!(
            "legacy .ppt format is not supported; convert {} to .pptx",
            source
        ),
        other => Err(ExtractError::UnsupportedType(other.to_string()).into()),
    }
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}
