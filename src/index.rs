//! Append-only nearest-neighbor store.
//!
//! [`VectorIndex`] holds three parallel sequences — vectors, texts, and
//! metadata records — that always have equal length and identical ordering:
//! position `i` in the vector table corresponds exactly to `texts[i]` and
//! `metadatas[i]`. Every operation validates its inputs in full before
//! touching any sequence, so a failed call never leaves a partial write
//! behind.
//!
//! Vectors are normalized to unit L2 length on insert, which makes cosine
//! similarity a plain dot product at query time. Search is a linear scan —
//! the design scale for this system is thousands of chunks, not millions,
//! and no approximate-NN structure is used.
//!
//! Persistence is a single self-describing bincode container written to a
//! temp file and atomically renamed into place, so a reader can never
//! observe a half-written index.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

use crate::error::IndexError;
use crate::models::{DocumentMetadata, SearchResult};

/// On-disk container version. Bump when the snapshot layout changes.
const FORMAT_VERSION: u32 = 1;

/// Serialized form of the full index state.
#[derive(Serialize, Deserialize)]
struct IndexSnapshot {
    version: u32,
    /// 0 encodes "no dimensionality established yet" (empty index).
    dims: u64,
    vectors: Vec<Vec<f32>>,
    texts: Vec<String>,
    metadatas: Vec<DocumentMetadata>,
}

/// Persistent cosine-similarity index over embedded text chunks.
///
/// Lifecycle: created empty or restored via [`load`](VectorIndex::load);
/// grows only by [`add`](VectorIndex::add); never removes or mutates
/// existing entries; persisted on demand with [`save`](VectorIndex::save).
#[derive(Debug, Default)]
pub struct VectorIndex {
    dims: Option<usize>,
    vectors: Vec<Vec<f32>>,
    texts: Vec<String>,
    metadatas: Vec<DocumentMetadata>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Dimensionality established by the first `add` (or `load`).
    pub fn dims(&self) -> Option<usize> {
        self.dims
    }

    /// Append a batch of entries.
    ///
    /// All three sequences must have equal length, and every vector must
    /// match the index's established dimensionality (the first call fixes
    /// it). Validation happens before any append: on error the index is
    /// unchanged.
    pub fn add(
        &mut self,
        vectors: Vec<Vec<f32>>,
        texts: Vec<String>,
        metadatas: Vec<DocumentMetadata>,
    ) -> Result<(), IndexError> {
        if vectors.len() != texts.len() || texts.len() != metadatas.len() {
            return Err(IndexError::LengthMismatch {
                vectors: vectors.len(),
                texts: texts.len(),
                metadatas: metadatas.len(),
            });
        }

        if vectors.is_empty() {
            return Ok(());
        }

        let dims = self.dims.unwrap_or(vectors[0].len());
        for v in &vectors {
            if v.len() != dims {
                return Err(IndexError::DimensionMismatch {
                    expected: dims,
                    actual: v.len(),
                });
            }
        }

        self.dims = Some(dims);
        for mut v in vectors {
            normalize(&mut v);
            self.vectors.push(v);
        }
        self.texts.extend(texts);
        self.metadatas.extend(metadatas);

        debug_assert!(
            self.vectors.len() == self.texts.len() && self.texts.len() == self.metadatas.len()
        );
        Ok(())
    }

    /// Return the `k` highest-scoring entries for `query`, sorted by
    /// descending cosine similarity with ties broken by insertion order.
    ///
    /// Returns fewer than `k` results when the index holds fewer entries,
    /// and `Ok(vec![])` on an empty index — absence of data is not an error.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>, IndexError> {
        if k == 0 {
            return Err(IndexError::InvalidTopK);
        }
        if self.is_empty() {
            return Ok(Vec::new());
        }

        let dims = self.dims.unwrap_or(0);
        if query.len() != dims {
            return Err(IndexError::DimensionMismatch {
                expected: dims,
                actual: query.len(),
            });
        }

        let mut unit_query = query.to_vec();
        normalize(&mut unit_query);

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, dot(&unit_query, v).clamp(-1.0, 1.0)))
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| SearchResult {
                text: self.texts[i].clone(),
                metadata: self.metadatas[i].clone(),
                score,
            })
            .collect())
    }

    /// Serialize the full state to `path`, all-or-nothing.
    ///
    /// The snapshot is written to a temp file in the destination directory,
    /// fsynced, then renamed over `path`.
    pub fn save(&self, path: &Path) -> Result<(), IndexError> {
        let snapshot = IndexSnapshot {
            version: FORMAT_VERSION,
            dims: self.dims.unwrap_or(0) as u64,
            vectors: self.vectors.clone(),
            texts: self.texts.clone(),
            metadatas: self.metadatas.clone(),
        };
        let bytes = bincode::serialize(&snapshot)
            .map_err(|e| IndexError::CorruptState(format!("serialization failed: {}", e)))?;

        let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
        if let Some(dir) = dir {
            std::fs::create_dir_all(dir)?;
        }

        let mut tmp = tempfile::NamedTempFile::new_in(dir.unwrap_or_else(|| Path::new(".")))?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| IndexError::Io(e.error))?;
        Ok(())
    }

    /// Restore state produced by [`save`](VectorIndex::save).
    ///
    /// # Errors
    ///
    /// [`IndexError::NotFound`] when no artifact exists at `path`;
    /// [`IndexError::CorruptState`] when the container cannot be decoded or
    /// the parallel-sequence invariant cannot be reconstructed.
    pub fn load(path: &Path) -> Result<Self, IndexError> {
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(IndexError::NotFound(path.to_path_buf()))
            }
            Err(e) => return Err(IndexError::Io(e)),
        };

        let snapshot: IndexSnapshot = bincode::deserialize(&bytes)
            .map_err(|e| IndexError::CorruptState(format!("decode failed: {}", e)))?;

        if snapshot.version != FORMAT_VERSION {
            return Err(IndexError::CorruptState(format!(
                "unsupported format version {}",
                snapshot.version
            )));
        }

        if snapshot.vectors.len() != snapshot.texts.len()
            || snapshot.texts.len() != snapshot.metadatas.len()
        {
            return Err(IndexError::CorruptState(format!(
                "parallel sequences differ in length: {} vectors, {} texts, {} metadatas",
                snapshot.vectors.len(),
                snapshot.texts.len(),
                snapshot.metadatas.len()
            )));
        }

        let dims = if snapshot.dims == 0 {
            if !snapshot.vectors.is_empty() {
                return Err(IndexError::CorruptState(
                    "populated index with no recorded dimensionality".to_string(),
                ));
            }
            None
        } else {
            let dims = snapshot.dims as usize;
            for v in &snapshot.vectors {
                if v.len() != dims {
                    return Err(IndexError::CorruptState(format!(
                        "stored vector has {} dims, expected {}",
                        v.len(),
                        dims
                    )));
                }
            }
            Some(dims)
        };

        Ok(Self {
            dims,
            vectors: snapshot.vectors,
            texts: snapshot.texts,
            metadatas: snapshot.metadatas,
        })
    }
}

/// Scale a vector to unit L2 length. Zero vectors are left untouched
/// (their dot product with anything is 0).
fn normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
