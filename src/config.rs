use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub index: IndexConfig,
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingConfig,
    pub generation: GenerationConfig,
    pub server: ServerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            index: IndexConfig::default(),
            chunking: ChunkingConfig::default(),
            embedding: EmbeddingConfig::default(),
            generation: GenerationConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IndexConfig {
    pub path: PathBuf,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/index.bin"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChunkingConfig {
    pub max_chars: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: 800,
            overlap: 100,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// `"ollama"` or `"openai"`.
    pub provider: String,
    pub model: String,
    /// Vector dimensionality. When omitted, inferred from known model names.
    pub dims: Option<usize>,
    pub url: Option<String>,
    pub batch_size: usize,
    pub max_retries: u32,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            dims: None,
            url: None,
            batch_size: 64,
            max_retries: 5,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GenerationConfig {
    /// `"ollama"` or `"disabled"`. When disabled, query commands and the
    /// server return sources without a generated answer.
    pub provider: String,
    pub model: String,
    pub url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "llama3".to_string(),
            url: None,
            timeout_secs: 120,
        }
    }
}

impl GenerationConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Default top-k when a query request omits `k`.
    pub default_k: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
            default_k: 4,
        }
    }
}

/// Load and validate configuration from a TOML file.
///
/// A missing file is not an error: every section has workable defaults, so
/// the binary runs without a config file. A present-but-invalid file fails
/// fast with a [`ConfigError`].
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return validate(Config::default());
        }
        Err(e) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    let config: Config = toml::from_str(&content)?;
    validate(config)
}

fn validate(config: Config) -> Result<Config, ConfigError> {
    validate_chunking(&config.chunking)?;

    match config.embedding.provider.as_str() {
        "ollama" | "openai" => {}
        other => {
            return Err(ConfigError::UnknownProvider {
                field: "embedding",
                value: other.to_string(),
            })
        }
    }

    if config.embedding.model.is_empty() {
        return Err(ConfigError::Invalid(
            "embedding.model must not be empty".to_string(),
        ));
    }

    if config.embedding.dims == Some(0) {
        return Err(ConfigError::Invalid(
            "embedding.dims must be > 0 when set".to_string(),
        ));
    }

    match config.generation.provider.as_str() {
        "ollama" | "disabled" => {}
        other => {
            return Err(ConfigError::UnknownProvider {
                field: "generation",
                value: other.to_string(),
            })
        }
    }

    if config.server.default_k == 0 {
        return Err(ConfigError::Invalid(
            "server.default_k must be >= 1".to_string(),
        ));
    }

    Ok(config)
}

/// Chunk parameters are also checked here so CLI overrides fail fast before
/// any file is read.
pub fn validate_chunking(chunking: &ChunkingConfig) -> Result<(), ConfigError> {
    if chunking.max_chars == 0 {
        return Err(ConfigError::ZeroChunkSize);
    }
    if chunking.overlap >= chunking.max_chars {
        return Err(ConfigError::OverlapTooLarge {
            max_chars: chunking.max_chars,
            overlap: chunking.overlap,
        });
    }
    Ok(())
}
