//! HTTP request handlers

use super::assets::{get_index_html, serve_static};
use super::types::{
    visible_transcript, ChatRequest, ChatResponse, ErrorResponse, HealthResponse,
    SessionResponse, SuccessResponse, TranscriptEntry,
};
use super::AppState;
use crate::runtime::{SessionError, ENGINE_FALLBACK_MESSAGE};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Root serves the chat widget
        .route("/", get(serve_widget))
        .route("/assets/*path", get(serve_static))
        // Session lifecycle
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session).delete(end_session))
        .route("/api/sessions/:id/chat", post(send_chat))
        .route("/api/health", get(health))
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Widget
// ============================================================

async fn serve_widget() -> impl IntoResponse {
    match get_index_html() {
        Some(content) => Html(content).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Html("<h1>404 - chat widget not found</h1>".to_string()),
        )
            .into_response(),
    }
}

// ============================================================
// Sessions
// ============================================================

async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<SessionResponse>) {
    let session = state.runtime.create().await;
    (
        StatusCode::CREATED,
        Json(SessionResponse {
            session_id: session.id().to_string(),
            created_at: session.created_at(),
            transcript: Vec::new(),
        }),
    )
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = state.runtime.get(&id).await?;
    let turns = session.snapshot();
    Ok(Json(SessionResponse {
        session_id: id,
        created_at: session.created_at(),
        transcript: visible_transcript(&turns),
    }))
}

async fn end_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.runtime.end(&id).await?;
    Ok(Json(SuccessResponse { success: true }))
}

// ============================================================
// Chat
// ============================================================

async fn send_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    if req.text.trim().is_empty() {
        return Err(AppError::BadRequest("Message text is empty".to_string()));
    }

    let outcome = state.runtime.submit(&id, &req.text).await?;

    let mut transcript = visible_transcript(&outcome.transcript);
    let error = outcome.engine_error.map(|_| {
        transcript.push(TranscriptEntry::fallback());
        ENGINE_FALLBACK_MESSAGE.to_string()
    });

    Ok(Json(ChatResponse {
        session_id: id,
        transcript,
        error,
    }))
}

// ============================================================
// Health & Version
// ============================================================

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.runtime.alert_stats();
    Json(HealthResponse {
        status: "ok",
        sessions: state.runtime.session_count().await,
        alerts_sent: stats.alerts_sent,
        alerts_failed: stats.alerts_failed,
        classifier_failures: state.runtime.classifier_failures(),
    })
}

async fn get_version() -> &'static str {
    concat!("crisis-chat ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(_) => AppError::NotFound(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
