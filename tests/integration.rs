//! End-to-end tests of the ingestion and query pipelines against a
//! deterministic in-process embedder.

use async_trait::async_trait;
use tempfile::TempDir;

use knowledge_assistant::chunk::chunk_documents;
use knowledge_assistant::config::ChunkingConfig;
use knowledge_assistant::embedding::Embedder;
use knowledge_assistant::error::EmbeddingError;
use knowledge_assistant::index::VectorIndex;
use knowledge_assistant::ingest::ingest_documents;
use knowledge_assistant::models::{Document, DocumentMetadata};
use knowledge_assistant::query::retrieve;

const DIMS: usize = 16;

/// Deterministic embedder: folds byte values into a fixed-size vector.
/// Identical text always maps to the identical vector, so an exact-match
/// query must come back with cosine similarity 1.0.
struct MockEmbedder;

#[async_trait]
impl Embedder for MockEmbedder {
    fn model_name(&self) -> &str {
        "mock"
    }

    fn dims(&self) -> usize {
        DIMS
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| mock_vector(t)).collect())
    }
}

fn mock_vector(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; DIMS];
    for (i, b) in text.bytes().enumerate() {
        v[(i + b as usize) % DIMS] += (b as f32) / 255.0;
    }
    v
}

fn doc(text: &str, source: &str) -> Document {
    Document {
        text: text.to_string(),
        metadata: DocumentMetadata::for_source(source),
    }
}

fn chunking(max_chars: usize, overlap: usize) -> ChunkingConfig {
    ChunkingConfig { max_chars, overlap }
}

#[tokio::test]
async fn test_ingest_then_exact_match_query() {
    let document = doc("The quick brown fox. The fox ran fast.", "fox.txt");

    // 38 chars at max 20 / overlap 5 → three overlapping chunks
    let chunks = chunk_documents(std::slice::from_ref(&document), 20, 5).unwrap();
    assert_eq!(chunks.len(), 3);

    let mut index = VectorIndex::new();
    let stats = ingest_documents(
        &MockEmbedder,
        &mut index,
        std::slice::from_ref(&document),
        &chunking(20, 5),
        64,
    )
    .await
    .unwrap();

    assert_eq!(stats.chunks, 3);
    assert_eq!(index.len(), 3);
    assert_eq!(index.dims(), Some(DIMS));

    // Querying with a stored chunk's exact text returns that chunk at
    // rank 1 with score ~1.0
    let target = &chunks[1].text;
    let retrieval = retrieve(&MockEmbedder, &index, target, 1).await.unwrap();
    assert_eq!(retrieval.results.len(), 1);
    assert_eq!(&retrieval.results[0].text, target);
    assert!((retrieval.results[0].score - 1.0).abs() < 1e-5);
    assert_eq!(retrieval.results[0].metadata.source, "fox.txt");
    assert_eq!(retrieval.context.as_deref(), Some(target.as_str()));
}

#[tokio::test]
async fn test_empty_index_query_returns_no_context() {
    let index = VectorIndex::new();
    let retrieval = retrieve(&MockEmbedder, &index, "anything at all", 5)
        .await
        .unwrap();
    assert!(retrieval.results.is_empty());
    assert!(retrieval.context.is_none());
}

#[tokio::test]
async fn test_blank_question_is_an_error() {
    let index = VectorIndex::new();
    assert!(retrieve(&MockEmbedder, &index, "   ", 5).await.is_err());
}

#[tokio::test]
async fn test_ingest_save_load_preserves_query_results() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("index.bin");

    let documents = vec![
        doc(
            "Rust ownership rules prevent data races at compile time. \
             The borrow checker enforces aliasing rules.",
            "rust.md",
        ),
        doc(
            "Kubernetes schedules containers across a cluster of nodes. \
             Deployments manage replica sets.",
            "k8s.md",
        ),
    ];

    let mut index = VectorIndex::new();
    ingest_documents(&MockEmbedder, &mut index, &documents, &chunking(60, 10), 2)
        .await
        .unwrap();
    index.save(&path).unwrap();

    let restored = VectorIndex::load(&path).unwrap();
    assert_eq!(restored.len(), index.len());
    assert_eq!(restored.dims(), index.dims());

    let question = "how does the borrow checker work";
    let before = retrieve(&MockEmbedder, &index, question, 3).await.unwrap();
    let after = retrieve(&MockEmbedder, &restored, question, 3)
        .await
        .unwrap();

    assert_eq!(before.results.len(), after.results.len());
    for (a, b) in before.results.iter().zip(after.results.iter()) {
        assert_eq!(a.text, b.text);
        assert_eq!(a.metadata, b.metadata);
        assert!((a.score - b.score).abs() < 1e-6);
    }
}

#[tokio::test]
async fn test_results_sorted_and_bounded() {
    let documents = vec![
        doc("Alpha section one. Alpha section two. Alpha section three.", "a.txt"),
        doc("Beta section one. Beta section two. Beta section three.", "b.txt"),
    ];

    let mut index = VectorIndex::new();
    ingest_documents(&MockEmbedder, &mut index, &documents, &chunking(25, 5), 64)
        .await
        .unwrap();
    assert!(index.len() > 3);

    let retrieval = retrieve(&MockEmbedder, &index, "Alpha section", 3)
        .await
        .unwrap();
    assert_eq!(retrieval.results.len(), 3);
    for pair in retrieval.results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    for r in &retrieval.results {
        assert!(r.score >= -1.0 && r.score <= 1.0);
    }

    // k larger than the index returns everything, still sorted
    let all = retrieve(&MockEmbedder, &index, "Alpha section", 100)
        .await
        .unwrap();
    assert_eq!(all.results.len(), index.len());
}

#[tokio::test]
async fn test_small_batches_preserve_insertion_order() {
    let documents = vec![doc(
        "One sentence here. Two sentences here. Three sentences here. \
         Four sentences here. Five sentences here.",
        "batched.txt",
    )];

    let mut batched = VectorIndex::new();
    ingest_documents(&MockEmbedder, &mut batched, &documents, &chunking(30, 5), 2)
        .await
        .unwrap();

    let mut single = VectorIndex::new();
    ingest_documents(&MockEmbedder, &mut single, &documents, &chunking(30, 5), 64)
        .await
        .unwrap();

    assert_eq!(batched.len(), single.len());
    let a = retrieve(&MockEmbedder, &batched, "Three sentences", 5)
        .await
        .unwrap();
    let b = retrieve(&MockEmbedder, &single, "Three sentences", 5)
        .await
        .unwrap();
    for (x, y) in a.results.iter().zip(b.results.iter()) {
        assert_eq!(x.text, y.text);
        assert!((x.score - y.score).abs() < 1e-6);
    }
}

#[tokio::test]
async fn test_context_joins_top_k_texts() {
    let documents = vec![doc(
        "First passage about storage. Second passage about networking.",
        "ops.txt",
    )];

    let mut index = VectorIndex::new();
    ingest_documents(&MockEmbedder, &mut index, &documents, &chunking(30, 5), 64)
        .await
        .unwrap();

    let retrieval = retrieve(&MockEmbedder, &index, "storage passage", 2)
        .await
        .unwrap();
    assert_eq!(retrieval.results.len(), 2);
    let context = retrieval.context.unwrap();
    let expected = format!(
        "{}\n\n{}",
        retrieval.results[0].text, retrieval.results[1].text
    );
    assert_eq!(context, expected);
}
