//! HTTP server exposing the query surface.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/query` | Retrieve passages and generate an answer |
//! | `GET`  | `/health` | Liveness check, independent of index state |
//!
//! # Error Contract
//!
//! Failures are structured JSON with a stable code:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "question must not be empty" } }
//! ```
//!
//! Codes: `bad_request` (400), `embedding_failed` (502), `internal` (500).
//! A successful query always has a well-formed body; an empty retrieval is
//! a 200 with `"No relevant context found."` and empty sources, and a
//! generation failure after successful retrieval is a 200 carrying the
//! sources plus a `generation_error` string.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::app::AppContext;
use crate::config::Config;
use crate::generate;
use crate::models::SearchResult;

/// Start the server on `[server].bind`. Runs until the process terminates.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let ctx = Arc::new(AppContext::initialize(config.clone())?);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/query", post(handle_query))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(ctx);

    println!("server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn embedding_failed(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_GATEWAY,
        code: "embedding_failed",
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: message.into(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /query ============

#[derive(Deserialize)]
struct QueryRequest {
    question: String,
    k: Option<usize>,
}

#[derive(Serialize)]
struct QueryResponse {
    /// `None` when generation is disabled or failed; sources still carry
    /// the retrieved passages.
    answer: Option<String>,
    sources: Vec<SearchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_error: Option<String>,
}

async fn handle_query(
    State(ctx): State<Arc<AppContext>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, AppError> {
    if request.question.trim().is_empty() {
        return Err(bad_request("question must not be empty"));
    }
    let k = request.k.unwrap_or(ctx.config.server.default_k);
    if k == 0 {
        return Err(bad_request("k must be >= 1"));
    }

    let query_vec = ctx
        .embedder
        .embed_query(&request.question)
        .await
        .map_err(|e| embedding_failed(e.to_string()))?;

    let index = ctx.index.read().await;
    let results = index
        .search(&query_vec, k)
        .map_err(|e| internal(e.to_string()))?;
    drop(index);

    if results.is_empty() {
        return Ok(Json(QueryResponse {
            answer: Some("No relevant context found.".to_string()),
            sources: Vec::new(),
            generation_error: None,
        }));
    }

    let context = results
        .iter()
        .map(|r| r.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    let (answer, generation_error) = if ctx.config.generation.is_enabled() {
        match generate::generate_answer(&ctx.config.generation, &context, &request.question).await
        {
            Ok(answer) => (Some(answer), None),
            Err(e) => {
                // Retrieval succeeded; surface the sources anyway.
                info!(error = %e, "answer generation failed; returning sources only");
                (None, Some(e.to_string()))
            }
        }
    } else {
        (None, None)
    };

    Ok(Json(QueryResponse {
        answer,
        sources: results,
        generation_error,
    }))
}
