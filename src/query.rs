//! Query pipeline: embed the question, search the index, assemble context.
//!
//! Pure composition with no state of its own. An empty search result is a
//! substantive "no relevant context" outcome, not an error.

use anyhow::{bail, Result};

use crate::app::AppContext;
use crate::embedding::Embedder;
use crate::generate;
use crate::index::VectorIndex;
use crate::models::SearchResult;

/// Outcome of the retrieval step. `context` is the `\n\n`-joined top-k
/// chunk texts, `None` when nothing was retrieved.
pub struct Retrieval {
    pub results: Vec<SearchResult>,
    pub context: Option<String>,
}

/// Embed `question` and return the top-`k` passages with assembled context.
pub async fn retrieve(
    embedder: &dyn Embedder,
    index: &VectorIndex,
    question: &str,
    k: usize,
) -> Result<Retrieval> {
    if question.trim().is_empty() {
        bail!("question must not be empty");
    }

    let query_vec = embedder.embed_query(question).await?;
    let results = index.search(&query_vec, k)?;

    let context = if results.is_empty() {
        None
    } else {
        Some(
            results
                .iter()
                .map(|r| r.text.as_str())
                .collect::<Vec<_>>()
                .join("\n\n"),
        )
    };

    Ok(Retrieval { results, context })
}

/// CLI entry point for `ka query`.
pub async fn run_query(ctx: &AppContext, question: &str, k: usize) -> Result<()> {
    let index = ctx.index.read().await;
    let retrieval = retrieve(ctx.embedder.as_ref(), &index, question, k).await?;
    drop(index);

    if retrieval.results.is_empty() {
        println!("No relevant context found.");
        return Ok(());
    }

    if ctx.config.generation.is_enabled() {
        let context = retrieval.context.as_deref().unwrap_or_default();
        match generate::generate_answer(&ctx.config.generation, context, question).await {
            Ok(answer) => {
                println!("{}", answer.trim());
                println!();
            }
            Err(e) => {
                // Retrieval succeeded; degrade to sources-only output.
                eprintln!("Warning: answer generation failed: {}", e);
            }
        }
    }

    println!("Sources:");
    print_results(&retrieval.results);
    Ok(())
}

/// Print ranked results in the shared CLI format.
pub fn print_results(results: &[SearchResult]) {
    for (i, r) in results.iter().enumerate() {
        let location = match (r.metadata.page, r.metadata.slide) {
            (Some(page), _) => format!(" (page {})", page),
            (None, Some(slide)) => format!(" (slide {})", slide),
            (None, None) => String::new(),
        };
        let preview: String = r.text.chars().take(300).collect();
        println!(
            "{}. score={:.4} | {}{}\n   {}",
            i + 1,
            r.score,
            r.metadata.source,
            location,
            preview
        );
    }
}
