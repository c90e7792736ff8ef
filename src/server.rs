//! HTTP server exposing the response engine.
//!
//! A thin JSON layer: every handler validates its body, delegates to the
//! engine or the ingestion path, and maps failures onto the error contract
//! below.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/chat` | Generate a cited response (`ChatResult`) |
//! | `POST` | `/api/chat/upsert-message` | Embed and index one message |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "search_error", "message": "similarity search failed: ..." } }
//! ```
//!
//! Error codes: `bad_request` (400), `embedding_error` (502),
//! `search_error` (502), `generation_error` (502), `upsert_error` (502).
//! Bodies that are not JSON or do not match the request shape are
//! `bad_request` too.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser chat clients
//! can call the API directly.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chat_recall_core::engine::{GenerateRequest, ResponseEngine};
use chat_recall_core::error::RecallError;
use chat_recall_core::models::ChatResult;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::backends::Backends;
use crate::config::{Config, RetrievalConfig};
use crate::ingest::{message_id_of, upsert_message};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    engine: ResponseEngine,
    backends: Backends,
    /// Defaults applied when a chat request omits `top_k` or `threshold`.
    retrieval: RetrievalConfig,
}

/// Starts the HTTP server on `[server].bind` with the configured backends.
///
/// Runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let backends = Backends::from_config(config)?;
    let listener = TcpListener::bind(&config.server.bind).await?;
    info!(bind = %config.server.bind, "chat recall server listening");
    serve(listener, backends, config.retrieval.clone()).await
}

/// Serve on an already-bound listener. Used by tests with port 0.
pub async fn serve(
    listener: TcpListener,
    backends: Backends,
    retrieval: RetrievalConfig,
) -> anyhow::Result<()> {
    axum::serve(listener, router(backends, retrieval)).await?;
    Ok(())
}

/// Build the application router.
pub fn router(backends: Backends, retrieval: RetrievalConfig) -> Router {
    let state = AppState {
        engine: backends.engine(),
        backends,
        retrieval,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/chat", post(handle_chat))
        .route("/api/chat/upsert-message", post(handle_upsert_message))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
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

/// Unwrap a JSON body, reporting malformed or mistyped bodies as
/// `bad_request` instead of axum's plain-text rejection.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| bad_request(rejection.body_text()))
}

impl From<RecallError> for AppError {
    fn from(err: RecallError) -> Self {
        let status = match err {
            RecallError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RecallError::Embedding(_) | RecallError::Search(_) | RecallError::Generation(_) => {
                StatusCode::BAD_GATEWAY
            }
        };
        AppError {
            status,
            code: err.kind().to_string(),
            message: err.to_string(),
        }
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

// ============ POST /api/chat ============

/// Request body for `POST /api/chat`.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub threshold: Option<f64>,
    /// Persona or extra instructions appended to the system instruction.
    #[serde(default)]
    pub persona: Option<String>,
}

/// Handler for `POST /api/chat`.
///
/// Returns the engine's [`ChatResult`] as-is.
async fn handle_chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResult>, AppError> {
    let body = json_body(payload)?;
    let req = GenerateRequest {
        message: body.message,
        top_k: body.top_k.unwrap_or(state.retrieval.top_k),
        threshold: body
            .threshold
            .unwrap_or(state.retrieval.similarity_threshold),
        persona: body.persona,
    };

    let span = info_span!("chat", request_id = %Uuid::new_v4());
    let result = state.engine.generate(&req).instrument(span).await;

    match result {
        Ok(result) => Ok(Json(result)),
        Err(e) => {
            warn!(code = e.kind(), error = %e, "chat request failed");
            Err(e.into())
        }
    }
}

// ============ POST /api/chat/upsert-message ============

/// Request body for `POST /api/chat/upsert-message`.
#[derive(Debug, Deserialize)]
pub struct UpsertRequest {
    pub message: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

#[derive(Serialize)]
struct UpsertResponse {
    status: String,
    id: String,
}

/// Handler for `POST /api/chat/upsert-message`.
async fn handle_upsert_message(
    State(state): State<AppState>,
    payload: Result<Json<UpsertRequest>, JsonRejection>,
) -> Result<Json<UpsertResponse>, AppError> {
    let body = json_body(payload)?;
    if body.message.trim().is_empty() {
        return Err(bad_request("message must not be empty"));
    }
    if message_id_of(&body.metadata).is_none() {
        return Err(bad_request(
            "metadata.message_id must be a non-empty string or a number",
        ));
    }

    let span = info_span!("upsert", request_id = %Uuid::new_v4());
    let id = upsert_message(
        state.backends.embedder.as_ref(),
        state.backends.index.as_ref(),
        &state.backends.namespace,
        &body.message,
        body.metadata,
    )
    .instrument(span)
    .await
    .map_err(|e| AppError {
        status: StatusCode::BAD_GATEWAY,
        code: "upsert_error".to_string(),
        message: format!("{:#}", e),
    })?;

    Ok(Json(UpsertResponse {
        status: "success".to_string(),
        id,
    }))
}
