//! HTTP route handlers for the API

use super::AppState;
use crate::error::CoreError;
use crate::handlers::{CreateSessionRequest, UpdateSessionRequest};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

// ============================================================================
// Health Check
// ============================================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// ============================================================================
// Errors
// ============================================================================

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

fn core_error_response(err: CoreError) -> Response {
    match err {
        CoreError::Validation(msg) => error_response(StatusCode::BAD_REQUEST, msg),
        CoreError::NotFound(kind, _) => {
            error_response(StatusCode::NOT_FOUND, format!("{} not found", kind))
        }
        other => {
            tracing::error!("Request failed: {}", other);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
        }
    }
}

/// Malformed, incomplete or over-specified bodies are all client errors
fn rejection_response(rejection: JsonRejection) -> Response {
    error_response(StatusCode::BAD_REQUEST, rejection.body_text())
}

// ============================================================================
// Sessions
// ============================================================================

pub async fn create_session(
    State(state): State<AppState>,
    payload: Result<Json<CreateSessionRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(json) => json,
        Err(rejection) => return rejection_response(rejection),
    };

    let validated = match req.validate() {
        Ok(validated) => validated,
        Err(e) => return core_error_response(e),
    };

    match state.sessions.create(validated).await {
        Ok(session) => (StatusCode::CREATED, Json(session)).into_response(),
        Err(e) => core_error_response(e),
    }
}

pub async fn update_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateSessionRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(json) => json,
        Err(rejection) => return rejection_response(rejection),
    };

    let validated = match req.validate() {
        Ok(validated) => validated,
        Err(e) => return core_error_response(e),
    };

    match state.sessions.extend_or_close(&id, validated).await {
        Ok(session) => Json(session).into_response(),
        Err(e) => core_error_response(e),
    }
}

// ============================================================================
// Statistics
// ============================================================================

pub async fn get_user_stats(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Response {
    match state.sessions.user_stats(&user_id, chrono::Utc::now()).await {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => core_error_response(e),
    }
}

pub async fn get_user_insights(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Response {
    match state.sessions.user_insights(&user_id, chrono::Utc::now()).await {
        Ok(insights) => Json(insights).into_response(),
        Err(e) => core_error_response(e),
    }
}
