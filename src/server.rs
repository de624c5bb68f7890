//! JSON HTTP API over a shared [`Index`].
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version and corpus size) |
//! | `GET`  | `/documents` | List ingested documents |
//! | `GET`  | `/documents/{id}` | One document with its stored chunks |
//! | `POST` | `/documents` | Ingest a document, returns the ingest report |
//! | `POST` | `/retrieve` | Top-k chunks and formatted context for a query |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "invalid_configuration", "message": "k must be >= 1" } }
//! ```
//!
//! Codes: `bad_request` and `invalid_configuration` (400), `not_found` (404),
//! `embedding_failure` (502); anything else is a 500 carrying the core error
//! code.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use lexindex_core::models::{DocumentMetadata, DocumentResponse};
use lexindex_core::search::format_context;
use lexindex_core::{Index, IngestReport, NewDocument, SearchResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::Config;
use crate::loader::ingest_directory;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    index: Arc<Index>,
    /// `k` used when a retrieve request omits it.
    default_k: usize,
}

impl AppState {
    pub fn new(index: Arc<Index>, default_k: usize) -> Self {
        Self { index, default_k }
    }
}

/// Assemble the router with all routes and the CORS layer.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route(
            "/documents",
            get(handle_list_documents).post(handle_ingest),
        )
        .route("/documents/{id}", get(handle_get_document))
        .route("/retrieve", post(handle_retrieve))
        .layer(cors)
        .with_state(state)
}

/// Serve on an already-bound listener until the process is terminated.
pub async fn serve(listener: tokio::net::TcpListener, state: AppState) -> anyhow::Result<()> {
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}

/// Build the index from `config`, optionally preload a directory, then bind
/// `[server].bind` and serve.
pub async fn run_server(config: &Config, preload: Option<&std::path::Path>) -> anyhow::Result<()> {
    let index = Arc::new(config.build_index()?);

    if let Some(dir) = preload {
        let reports = ingest_directory(&index, dir, config.default_doc_type()).await?;
        info!(
            dir = %dir.display(),
            documents = reports.len(),
            chunks = index.len(),
            "preloaded documents"
        );
    }

    let bind_addr = config.server.bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(bind = %bind_addr, model = index.model_name(), "lexindex server listening");
    println!("lexindex server listening on http://{}", bind_addr);

    serve(listener, AppState::new(index, config.retrieval.default_k)).await
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"bad_request"`, `"embedding_failure"`).
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

/// Malformed bodies, unknown doc types and bad dates share the JSON error
/// contract instead of axum's plain-text rejection.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        bad_request(rejection.body_text())
    }
}

impl From<lexindex_core::Error> for AppError {
    fn from(err: lexindex_core::Error) -> Self {
        use lexindex_core::Error;
        let status = match &err {
            Error::InvalidConfiguration { .. } => StatusCode::BAD_REQUEST,
            Error::EmbeddingFailure { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        AppError {
            status,
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

// ============ Handlers ============

async fn handle_health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "model": state.index.model_name(),
        "documents": state.index.document_count(),
        "chunks": state.index.len(),
    }))
}

async fn handle_list_documents(State(state): State<AppState>) -> Json<Vec<DocumentMetadata>> {
    Json(state.index.list_documents())
}

async fn handle_get_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DocumentResponse>, AppError> {
    state
        .index
        .get_document(&id)
        .map(Json)
        .ok_or_else(|| not_found(format!("document not found: {}", id)))
}

async fn handle_ingest(
    State(state): State<AppState>,
    body: Result<Json<NewDocument>, JsonRejection>,
) -> Result<Json<IngestReport>, AppError> {
    let Json(doc) = body?;
    let report = state.index.ingest(doc).await?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
struct RetrieveRequest {
    query: String,
    #[serde(default)]
    k: Option<usize>,
    #[serde(default)]
    threshold: Option<f32>,
}

#[derive(Debug, Serialize)]
struct RetrieveResponse {
    results: Vec<SearchResult>,
    /// Results rendered as a prompt-ready context block.
    context: String,
}

async fn handle_retrieve(
    State(state): State<AppState>,
    body: Result<Json<RetrieveRequest>, JsonRejection>,
) -> Result<Json<RetrieveResponse>, AppError> {
    let Json(req) = body?;
    if req.query.trim().is_empty() {
        return Err(bad_request("query must not be empty"));
    }

    let k = req.k.unwrap_or(state.default_k);
    let threshold = req
        .threshold
        .unwrap_or(state.index.config().relevance_threshold);
    let results = state
        .index
        .retrieve_with_threshold(&req.query, k, threshold)
        .await?;
    let context = format_context(&results);
    Ok(Json(RetrieveResponse { results, context }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexindex_core::Error;

    #[test]
    fn test_core_error_status_mapping() {
        let invalid: AppError = Error::invalid_config("k must be >= 1").into();
        assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
        assert_eq!(invalid.code, "invalid_configuration");

        let failed: AppError = Error::EmbeddingFailure {
            attempts: 4,
            source: Box::new(Error::transient("429")),
        }
        .into();
        assert_eq!(failed.status, StatusCode::BAD_GATEWAY);
        assert_eq!(failed.code, "embedding_failure");

        let mismatch: AppError = Error::DimensionMismatch {
            expected: 3,
            actual: 2,
        }
        .into();
        assert_eq!(mismatch.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(mismatch.code, "dimension_mismatch");
    }
}
