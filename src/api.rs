//! HTTP surface for physicsbot.
//!
//! - `POST /upload` – Multipart upload (field `files`, repeatable) of PDF/DOCX study material.
//!   Each file is partitioned, summarized, chunked, embedded, and indexed in Pinecone. Returns
//!   `{ files_received, documents, chunks_indexed, skipped }`.
//! - `POST /query` – `{ "question": "..." }` answered through the study tool graph. Returns
//!   `{ "answer": "..." }`.
//! - `GET /health` – Liveness probe.
//! - `GET /metrics` – Upload and question counters.
//! - `GET /commands` – Machine-readable command catalog.
//!
//! Failures are reported as `{ "error": "..." }`.

use crate::agent::{AgentError, QueryApi};
use crate::ingestion::{IngestionApi, IngestionError, UploadedFile};
use crate::metrics::{MetricsSnapshot, ServiceMetrics};
use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, State, multipart::MultipartError, rejection::JsonRejection,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Largest accepted upload request body.
pub const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Shared handles available to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Upload pipeline.
    pub ingestion: Arc<dyn IngestionApi>,
    /// Question answering.
    pub query: Arc<dyn QueryApi>,
    /// Process-wide counters.
    pub metrics: Arc<ServiceMetrics>,
}

/// Build the HTTP router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/upload", post(upload_files))
        .route("/query", post(query))
        .route("/health", get(health))
        .route("/metrics", get(get_metrics))
        .route("/commands", get(get_commands))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

/// Success response for `POST /upload`.
#[derive(Debug, Serialize)]
struct UploadResponse {
    /// Non-empty files received in the request.
    files_received: usize,
    /// Documents (summaries and DOCX bodies) produced.
    documents: usize,
    /// Chunks written to the index.
    chunks_indexed: usize,
    /// Filenames skipped because their type is unsupported.
    skipped: Vec<String>,
}

/// Run the ingestion pipeline over every non-empty `files` part.
async fn upload_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("files") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let bytes = field.bytes().await?;
        if bytes.is_empty() {
            tracing::debug!(file = %filename, "Skipping empty upload part");
            continue;
        }
        files.push(UploadedFile::new(filename, bytes.to_vec()));
    }

    if files.is_empty() {
        return Err(AppError::BadRequest("No files were uploaded".into()));
    }

    let files_received = files.len();
    let outcome = state.ingestion.run_pipeline(files).await?;
    state
        .metrics
        .record_upload(outcome.documents as u64, outcome.chunks_indexed as u64);
    tracing::info!(
        files = files_received,
        documents = outcome.documents,
        chunks = outcome.chunks_indexed,
        duplicates = outcome.duplicate_chunks,
        skipped = outcome.skipped_files.len(),
        "Upload request completed"
    );

    Ok(Json(UploadResponse {
        files_received,
        documents: outcome.documents,
        chunks_indexed: outcome.chunks_indexed,
        skipped: outcome.skipped_files,
    }))
}

/// Request body for `POST /query`.
#[derive(Deserialize)]
struct QueryRequest {
    question: String,
}

/// Response body for `POST /query`.
#[derive(Serialize)]
struct QueryResponse {
    answer: String,
}

async fn query(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, AppError> {
    let Json(request) = payload.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let answer = state.query.answer(request.question).await?;
    state.metrics.record_question();
    Ok(Json(QueryResponse { answer }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn get_metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "upload",
                method: "POST",
                path: "/upload",
                description: "Upload PDF or DOCX files as multipart field `files`; they are summarized, chunked, embedded, and indexed.",
                request_example: None,
            },
            CommandDescriptor {
                name: "query",
                method: "POST",
                path: "/query",
                description: "Ask a physics question; the model may answer from the textbook, generate exam questions, or summarize a chapter.",
                request_example: Some(json!({ "question": "State Newton's second law." })),
            },
            CommandDescriptor {
                name: "health",
                method: "GET",
                path: "/health",
                description: "Liveness probe.",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return upload and question counters.",
                request_example: None,
            },
        ],
    })
}

/// Error rendered as `{ "error": message }`.
enum AppError {
    BadRequest(String),
    Ingestion(IngestionError),
    Agent(AgentError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            AppError::Agent(AgentError::EmptyQuestion) => (
                StatusCode::BAD_REQUEST,
                AgentError::EmptyQuestion.to_string(),
            ),
            AppError::Ingestion(error) => {
                tracing::error!(error = %error, "Upload failed");
                (StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
            }
            AppError::Agent(error) => {
                tracing::error!(error = %error, "Query failed");
                (StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<IngestionError> for AppError {
    fn from(inner: IngestionError) -> Self {
        Self::Ingestion(inner)
    }
}

impl From<AgentError> for AppError {
    fn from(inner: AgentError) -> Self {
        Self::Agent(inner)
    }
}

impl From<MultipartError> for AppError {
    fn from(inner: MultipartError) -> Self {
        Self::BadRequest(inner.body_text())
    }
}
