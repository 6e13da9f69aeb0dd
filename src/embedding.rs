//! Embedding backend abstraction and implementations.
//!
//! Defines the [`Embedder`] trait and two concrete adapters:
//! - **[`OllamaEmbedder`]** — calls a local Ollama instance's `/api/embed` endpoint.
//! - **[`OpenAiEmbedder`]** — calls the OpenAI embeddings API.
//!
//! Adapters return raw model vectors; L2 normalization is the
//! [`VectorIndex`](crate::index::VectorIndex)'s responsibility at storage and
//! query time, which keeps this boundary reusable with other similarity
//! measures.
//!
//! # Retry Strategy
//!
//! Both backends use exponential backoff for transient errors:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)
//!
//! Every request carries the configured client timeout, so an unreachable
//! backend fails rather than hangs.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::EmbeddingConfig;
use crate::error::{ConfigError, EmbeddingError};

/// Capability interface for turning text into fixed-dimension vectors.
///
/// The concrete model/service behind it is swappable; tests use a
/// deterministic in-process implementation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model identifier (e.g. `"nomic-embed-text"`).
    fn model_name(&self) -> &str;

    /// Vector dimensionality every returned embedding must have.
    fn dims(&self) -> usize;

    /// Embed a batch of texts: one vector per input, same order, all of
    /// [`dims`](Embedder::dims) length.
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Embed a single query text. Semantically `embed_texts([text])[0]`;
    /// kept separate so single-query latency can skip batching.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let batch = [text.to_string()];
        let vectors = self.embed_texts(&batch).await?;
        vectors
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::Malformed("empty embedding response".to_string()))
    }
}

/// Instantiate the adapter named by `embedding.provider`.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>, ConfigError> {
    match config.provider.as_str() {
        "ollama" => Ok(Box::new(OllamaEmbedder::new(config)?)),
        "openai" => Ok(Box::new(OpenAiEmbedder::new(config)?)),
        other => Err(ConfigError::UnknownProvider {
            field: "embedding",
            value: other.to_string(),
        }),
    }
}

/// Known model dimensionalities, used when `embedding.dims` is omitted.
/// Model names match case-insensitively (`all-MiniLM-L6-v2` and
/// `all-minilm-l6-v2` are the same model).
fn resolve_dims(config: &EmbeddingConfig) -> Result<usize, ConfigError> {
    if let Some(dims) = config.dims {
        return Ok(dims);
    }
    match config.model.to_ascii_lowercase().as_str() {
        "nomic-embed-text" | "nomic-embed-text-v1.5" => Ok(768),
        "all-minilm" | "all-minilm-l6-v2" => Ok(384),
        "mxbai-embed-large" => Ok(1024),
        "text-embedding-3-small" | "text-embedding-ada-002" => Ok(1536),
        "text-embedding-3-large" => Ok(3072),
        other => Err(ConfigError::Invalid(format!(
            "embedding.dims required for unknown model '{}'",
            other
        ))),
    }
}

fn build_client(timeout_secs: u64) -> Result<reqwest::Client, EmbeddingError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| EmbeddingError::Backend(e.to_string()))
}

/// Check that every returned vector matches the configured dimensionality.
fn check_dims(vectors: &[Vec<f32>], expected: usize) -> Result<(), EmbeddingError> {
    for v in vectors {
        if v.len() != expected {
            return Err(EmbeddingError::DimensionMismatch {
                expected,
                actual: v.len(),
            });
        }
    }
    Ok(())
}

/// POST `body` to `url` with retry/backoff, returning the parsed JSON body.
async fn post_with_retry(
    client: &reqwest::Client,
    url: &str,
    headers: &[(&str, String)],
    body: &serde_json::Value,
    max_retries: u32,
    backend: &str,
) -> Result<serde_json::Value, EmbeddingError> {
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        let mut request = client.post(url).json(body);
        for (name, value) in headers {
            request = request.header(*name, value.as_str());
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return response
                        .json()
                        .await
                        .map_err(|e| EmbeddingError::Malformed(e.to_string()));
                }

                let body_text = response.text().await.unwrap_or_default();

                // Rate limited or server error — retry
                if status.as_u16() == 429 || status.is_server_error() {
                    last_err = Some(EmbeddingError::Backend(format!(
                        "{} error {}: {}",
                        backend, status, body_text
                    )));
                    continue;
                }

                // Client error (not 429) — don't retry
                return Err(EmbeddingError::Backend(format!(
                    "{} error {}: {}",
                    backend, status, body_text
                )));
            }
            Err(e) => {
                last_err = Some(EmbeddingError::Backend(format!(
                    "{} unreachable at {}: {}",
                    backend, url, e
                )));
                continue;
            }
        }
    }

    Err(last_err
        .unwrap_or_else(|| EmbeddingError::Backend(format!("{} failed after retries", backend))))
}

// ============ Ollama ============

/// Embedding adapter for a local Ollama instance.
///
/// Calls `POST /api/embed` on the configured URL (default
/// `http://localhost:11434`). Requires an embedding model to be pulled
/// (e.g. `ollama pull nomic-embed-text`).
pub struct OllamaEmbedder {
    model: String,
    dims: usize,
    url: String,
    max_retries: u32,
    timeout_secs: u64,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            model: config.model.clone(),
            dims: resolve_dims(config)?,
            url: config
                .url
                .clone()
                .unwrap_or_else(|| "http://localhost:11434".to_string()),
            max_retries: config.max_retries,
            timeout_secs: config.timeout_secs,
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let client = build_client(self.timeout_secs)?;
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let json = post_with_retry(
            &client,
            &format!("{}/api/embed", self.url),
            &[],
            &body,
            self.max_retries,
            "Ollama",
        )
        .await?;

        let vectors = parse_ollama_response(&json)?;
        if vectors.len() != texts.len() {
            return Err(EmbeddingError::Malformed(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            )));
        }
        check_dims(&vectors, self.dims)?;
        Ok(vectors)
    }
}

fn parse_ollama_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| EmbeddingError::Malformed("missing embeddings array".to_string()))?;

    let mut result = Vec::with_capacity(embeddings.len());
    for embedding in embeddings {
        let vec: Vec<f32> = embedding
            .as_array()
            .ok_or_else(|| EmbeddingError::Malformed("embedding is not an array".to_string()))?
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();
        result.push(vec);
    }
    Ok(result)
}

// ============ OpenAI ============

/// Embedding adapter for the OpenAI embeddings API.
///
/// Calls `POST /v1/embeddings` with the configured model. Requires the
/// `OPENAI_API_KEY` environment variable.
pub struct OpenAiEmbedder {
    model: String,
    dims: usize,
    max_retries: u32,
    timeout_secs: u64,
}

impl OpenAiEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, ConfigError> {
        if std::env::var("OPENAI_API_KEY").is_err() {
            return Err(ConfigError::Invalid(
                "OPENAI_API_KEY environment variable not set".to_string(),
            ));
        }
        Ok(Self {
            model: config.model.clone(),
            dims: resolve_dims(config)?,
            max_retries: config.max_retries,
            timeout_secs: config.timeout_secs,
        })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| EmbeddingError::Backend("OPENAI_API_KEY not set".to_string()))?;

        let client = build_client(self.timeout_secs)?;
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let json = post_with_retry(
            &client,
            "https://api.openai.com/v1/embeddings",
            &[("Authorization", format!("Bearer {}", api_key))],
            &body,
            self.max_retries,
            "OpenAI",
        )
        .await?;

        let vectors = parse_openai_response(&json)?;
        if vectors.len() != texts.len() {
            return Err(EmbeddingError::Malformed(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            )));
        }
        check_dims(&vectors, self.dims)?;
        Ok(vectors)
    }
}

fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| EmbeddingError::Malformed("missing data array".to_string()))?;

    let mut embeddings = Vec::with_capacity(data.len());
    for item in data {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| EmbeddingError::Malformed("missing embedding field".to_string()))?;

        let vec: Vec<f32> = embedding
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();
        embeddings.push(vec);
    }
    Ok(embeddings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbeddingConfig;

    #[test]
    fn test_parse_ollama_response() {
        let json = serde_json::json!({
            "embeddings": [[1.0, 2.0], [3.0, 4.0]]
        });
        let vectors = parse_ollama_response(&json).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
    }

    #[test]
    fn test_parse_ollama_missing_field() {
        let json = serde_json::json!({ "model": "nomic-embed-text" });
        assert!(matches!(
            parse_ollama_response(&json),
            Err(EmbeddingError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_openai_response() {
        let json = serde_json::json!({
            "data": [
                { "embedding": [0.5, -0.5], "index": 0 },
                { "embedding": [1.5, 2.5], "index": 1 }
            ]
        });
        let vectors = parse_openai_response(&json).unwrap();
        assert_eq!(vectors, vec![vec![0.5, -0.5], vec![1.5, 2.5]]);
    }

    #[test]
    fn test_check_dims_rejects_mismatch() {
        let vectors = vec![vec![1.0, 2.0, 3.0], vec![1.0, 2.0]];
        let err = check_dims(&vectors, 3).unwrap_err();
        assert!(matches!(
            err,
            EmbeddingError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_resolve_dims_known_model() {
        let config = EmbeddingConfig::default();
        assert_eq!(resolve_dims(&config).unwrap(), 768);
    }

    #[test]
    fn test_resolve_dims_is_case_insensitive() {
        let config = EmbeddingConfig {
            model: "all-MiniLM-L6-v2".to_string(),
            dims: None,
            ..EmbeddingConfig::default()
        };
        assert_eq!(resolve_dims(&config).unwrap(), 384);
    }

    #[test]
    fn test_resolve_dims_unknown_model_requires_explicit_dims() {
        let config = EmbeddingConfig {
            model: "my-custom-model".to_string(),
            dims: None,
            ..EmbeddingConfig::default()
        };
        assert!(resolve_dims(&config).is_err());

        let config = EmbeddingConfig {
            model: "my-custom-model".to_string(),
            dims: Some(512),
            ..EmbeddingConfig::default()
        };
        assert_eq!(resolve_dims(&config).unwrap(), 512);
    }
}
