//! # Knowledge Assistant
//!
//! A local retrieval pipeline for personal document collections: chunk,
//! embed, index, and query.
//!
//! Documents (PDF, DOCX, PPTX, TXT, MD) are split into overlapping chunks,
//! embedded via an external model, and stored in a persistent cosine
//! similarity index alongside their source text and provenance metadata.
//! Queries embed the question and return the top-k nearest passages, which
//! feed an optional answer-generation step.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────┐   ┌─────────────┐
//! │ Loaders  │──▶│   Pipeline     │──▶│ VectorIndex │
//! │ PDF/PPTX │   │ Chunk + Embed │   │  (on disk)  │
//! └──────────┘   └───────────────┘   └──────┬──────┘
//!                                           │
//!                          ┌────────────────┤
//!                          ▼                ▼
//!                     ┌─────────┐     ┌──────────┐
//!                     │   CLI   │     │   HTTP   │
//!                     │  (ka)   │     │ /query   │
//!                     └─────────┘     └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! ka ingest --path ./docs            # chunk, embed, and index
//! ka query "how do deployments work" # retrieve + generate an answer
//! ka serve                           # start the HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`chunk`] | Overlapping text chunking |
//! | [`embedding`] | Embedding backend abstraction |
//! | [`index`] | Persistent nearest-neighbor store |
//! | [`loader`] | File discovery and document loading |
//! | [`ingest`] | Ingestion pipeline |
//! | [`query`] | Query pipeline |
//! | [`generate`] | Answer generation |
//! | [`server`] | HTTP server |

pub mod app;
pub mod chunk;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod generate;
pub mod index;
pub mod ingest;
pub mod loader;
pub mod models;
pub mod query;
pub mod server;
