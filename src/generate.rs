//! Answer generation from retrieved context via Ollama.
//!
//! Downstream of the retrieval core: a failure here never invalidates the
//! retrieved sources, so callers can degrade to sources-only output.

use anyhow::{anyhow, bail, Result};
use std::time::Duration;

use crate::config::GenerationConfig;

const PROMPT_TEMPLATE: &str = "You are a helpful assistant.\n\
Use the context below to answer the question concisely.\n\n\
Context:\n{context}\n\n\
Question:\n{question}\n\n\
Answer:";

/// Generate an answer for `question` grounded in `context`.
///
/// Calls `POST /api/generate` on the configured Ollama instance with a
/// non-streaming request and a bounded timeout.
pub async fn generate_answer(
    config: &GenerationConfig,
    context: &str,
    question: &str,
) -> Result<String> {
    if !config.is_enabled() {
        bail!("generation provider is disabled");
    }

    let url = config
        .url
        .clone()
        .unwrap_or_else(|| "http://localhost:11434".to_string());

    let prompt = PROMPT_TEMPLATE
        .replace("{context}", context)
        .replace("{question}", question);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    let response = client
        .post(format!("{}/api/generate", url))
        .json(&serde_json::json!({
            "model": config.model,
            "prompt": prompt,
            "stream": false,
        }))
        .send()
        .await
        .map_err(|e| anyhow!("Ollama unreachable at {}: {}", url, e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        bail!("Ollama generate error {}: {}", status, body);
    }

    let json: serde_json::Value = response.json().await?;
    json.get("response")
        .and_then(|r| r.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow!("malformed generate response: missing response field"))
}
