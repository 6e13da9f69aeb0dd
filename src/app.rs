//! Process-wide application context.
//!
//! One [`AppContext`] is constructed at startup and passed by handle into
//! the query pipeline and server — no global singletons. The index is the
//! single shared mutable resource: queries take the read lock, ingestion
//! (offline, via the CLI) owns an index exclusively.

use anyhow::Result;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::Config;
use crate::embedding::{create_embedder, Embedder};
use crate::error::IndexError;
use crate::index::VectorIndex;

pub struct AppContext {
    pub config: Config,
    pub embedder: Box<dyn Embedder>,
    pub index: RwLock<VectorIndex>,
}

impl AppContext {
    /// Build the embedder and load the persisted index.
    ///
    /// A missing index file starts the process with an empty index (queries
    /// then report "no relevant context"); a corrupt one aborts startup.
    pub fn initialize(config: Config) -> Result<Self> {
        let embedder = create_embedder(&config.embedding)?;

        let index = match VectorIndex::load(&config.index.path) {
            Ok(index) => {
                info!(
                    entries = index.len(),
                    dims = ?index.dims(),
                    path = %config.index.path.display(),
                    "loaded index"
                );
                index
            }
            Err(IndexError::NotFound(path)) => {
                warn!(path = %path.display(), "index not found; starting empty");
                VectorIndex::new()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            config,
            embedder,
            index: RwLock::new(index),
        })
    }
}
