//! JSON HTTP API.
//!
//! Exposes document upload, question answering, source search, the query
//! audit trail, and chat-session transcripts.
//!
//! # Error Contract
//!
//! All error responses share one schema:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "question must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `ingest_failed` (422),
//! `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! clients.

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::blob::BlobStore;
use crate::config::Config;
use crate::models::{ChatMessage, ChatSession, CorpusStats, QueryResult, SourceScore};
use crate::service::{IngestError, RagService};
use crate::store::Store;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    service: Arc<RagService>,
    store: Arc<dyn Store>,
    blobs: Arc<dyn BlobStore>,
}

/// Starts the HTTP server on the address configured in `[server].bind`.
pub async fn run_server(
    config: &Config,
    service: Arc<RagService>,
    store: Arc<dyn Store>,
    blobs: Arc<dyn BlobStore>,
) -> anyhow::Result<()> {
    let state = AppState {
        service,
        store,
        blobs,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(handle_health))
        .route("/documents", post(handle_upload).get(handle_list_documents))
        .route(
            "/documents/{id}",
            get(handle_get_document).delete(handle_delete_document),
        )
        .route("/documents/{id}/download", get(handle_download))
        .route("/query", post(handle_query))
        .route("/search", post(handle_search))
        .route("/queries", get(handle_list_queries))
        .route("/stats", get(handle_stats))
        .route("/flush", post(handle_flush))
        .route("/sessions", post(handle_create_session).get(handle_list_sessions))
        .route(
            "/sessions/{id}",
            get(handle_get_session)
                .put(handle_rename_session)
                .delete(handle_delete_session),
        )
        .route(
            "/sessions/{id}/messages",
            get(handle_list_messages).post(handle_session_ask),
        )
        .layer(cors)
        .with_state(state);

    let bind_addr = config.server.bind.clone();
    tracing::info!(bind = %bind_addr, "HTTP server listening");

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

/// Internal error type that converts into an HTTP response.
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

fn ingest_failed(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::UNPROCESSABLE_ENTITY,
        code: "ingest_failed".to_string(),
        message: message.into(),
    }
}

fn internal(err: anyhow::Error) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: err.to_string(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    model: String,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        model: state.service.model_name().to_string(),
    })
}

// ============ Documents ============

async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") && field.file_name().is_none() {
            continue;
        }
        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "upload.pdf".to_string());
        let bytes = field
            .bytes()
            .await
            .map_err(|e| bad_request(format!("failed to read upload: {}", e)))?;
        if bytes.is_empty() {
            return Err(bad_request("uploaded file is empty"));
        }

        let doc = state
            .service
            .ingest(&filename, &bytes)
            .await
            .map_err(|e| match e {
                IngestError::Extract(_) | IngestError::NoChunks => ingest_failed(e.to_string()),
                IngestError::Other(err) => internal(err),
            })?;
        return Ok(Json(serde_json::json!({ "document": doc })));
    }

    Err(bad_request("multipart field 'file' is required"))
}

async fn handle_list_documents(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let documents = state.store.list_documents().await.map_err(internal)?;
    Ok(Json(serde_json::json!({ "documents": documents })))
}

async fn handle_get_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let doc = state
        .store
        .get_document(&id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(format!("no document with id: {}", id)))?;
    let chunks = state
        .store
        .chunks_for_document(&id)
        .await
        .map_err(internal)?;
    Ok(Json(serde_json::json!({ "document": doc, "chunks": chunks })))
}

async fn handle_delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let deleted = state
        .service
        .delete_document(&id)
        .await
        .map_err(internal)?;
    if !deleted {
        return Err(not_found(format!("no document with id: {}", id)));
    }
    Ok(Json(serde_json::json!({ "deleted": id })))
}

async fn handle_download(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let doc = state
        .store
        .get_document(&id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(format!("no document with id: {}", id)))?;
    let bytes = state
        .blobs
        .get(&doc.stored_name)
        .await
        .map_err(|e| not_found(format!("stored file unavailable: {}", e)))?;

    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", doc.original_filename),
        ),
    ];
    Ok((headers, bytes).into_response())
}

// ============ Query & search ============

#[derive(Deserialize)]
struct QueryRequest {
    question: String,
}

async fn handle_query(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResult>, AppError> {
    if req.question.trim().is_empty() {
        return Err(bad_request("question must not be empty"));
    }
    let result = state
        .service
        .query(&req.question)
        .await
        .map_err(internal)?;
    Ok(Json(result))
}

#[derive(Serialize)]
struct SearchResponse {
    sources: Vec<SourceScore>,
}

async fn handle_search(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    if req.question.trim().is_empty() {
        return Err(bad_request("question must not be empty"));
    }
    let sources = state
        .service
        .search_sources(&req.question)
        .await
        .map_err(internal)?;
    Ok(Json(SearchResponse { sources }))
}

async fn handle_list_queries(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let queries = state.store.list_queries(100).await.map_err(internal)?;
    Ok(Json(serde_json::json!({ "queries": queries })))
}

async fn handle_stats(State(state): State<AppState>) -> Result<Json<CorpusStats>, AppError> {
    let stats = state.service.stats().await.map_err(internal)?;
    Ok(Json(stats))
}

async fn handle_flush(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    state.service.flush().await.map_err(internal)?;
    Ok(Json(serde_json::json!({ "flushed": true })))
}

// ============ Chat sessions ============

#[derive(Deserialize)]
struct CreateSessionRequest {
    #[serde(default)]
    title: Option<String>,
}

async fn handle_create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<Json<ChatSession>, AppError> {
    let now = chrono::Utc::now().timestamp();
    let session = ChatSession {
        id: Uuid::new_v4().to_string(),
        title: req.title.unwrap_or_else(|| "New chat".to_string()),
        created_at: now,
        updated_at: now,
    };
    state
        .store
        .create_session(&session)
        .await
        .map_err(internal)?;
    Ok(Json(session))
}

async fn handle_list_sessions(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let sessions = state.store.list_sessions().await.map_err(internal)?;
    Ok(Json(serde_json::json!({ "sessions": sessions })))
}

async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ChatSession>, AppError> {
    let session = state
        .store
        .get_session(&id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(format!("no session with id: {}", id)))?;
    Ok(Json(session))
}

#[derive(Deserialize)]
struct RenameSessionRequest {
    title: String,
}

async fn handle_rename_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RenameSessionRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if req.title.trim().is_empty() {
        return Err(bad_request("title must not be empty"));
    }
    let renamed = state
        .store
        .rename_session(&id, &req.title)
        .await
        .map_err(internal)?;
    if !renamed {
        return Err(not_found(format!("no session with id: {}", id)));
    }
    Ok(Json(serde_json::json!({ "renamed": id })))
}

async fn handle_delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let deleted = state
        .store
        .delete_session(&id)
        .await
        .map_err(internal)?;
    if !deleted {
        return Err(not_found(format!("no session with id: {}", id)));
    }
    Ok(Json(serde_json::json!({ "deleted": id })))
}

async fn handle_list_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    state
        .store
        .get_session(&id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(format!("no session with id: {}", id)))?;
    let messages = state
        .store
        .messages_for_session(&id)
        .await
        .map_err(internal)?;
    Ok(Json(serde_json::json!({ "messages": messages })))
}

/// Runs a query inside a session, storing the user question and assistant
/// answer as transcript messages.
async fn handle_session_ask(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResult>, AppError> {
    if req.question.trim().is_empty() {
        return Err(bad_request("question must not be empty"));
    }
    state
        .store
        .get_session(&id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(format!("no session with id: {}", id)))?;

    let result = state
        .service
        .query(&req.question)
        .await
        .map_err(internal)?;

    let now = chrono::Utc::now().timestamp();
    let user_message = ChatMessage {
        id: Uuid::new_v4().to_string(),
        session_id: id.clone(),
        role: "user".to_string(),
        content: req.question.clone(),
        sources: "[]".to_string(),
        confidence: 0.0,
        created_at: now,
    };
    let assistant_message = ChatMessage {
        id: Uuid::new_v4().to_string(),
        session_id: id,
        role: "assistant".to_string(),
        content: result.answer.clone(),
        sources: serde_json::to_string(&result.sources).unwrap_or_else(|_| "[]".to_string()),
        confidence: result.confidence,
        created_at: now,
    };
    state
        .store
        .insert_message(&user_message)
        .await
        .map_err(internal)?;
    state
        .store
        .insert_message(&assistant_message)
        .await
        .map_err(internal)?;

    Ok(Json(result))
}
