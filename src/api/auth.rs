//! Authentication middleware for API key validation

use super::AppState;
use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

/// Extract the key from an `Authorization: Bearer <key>` header value
fn bearer_token(header: &str) -> Option<&str> {
    header.strip_prefix("Bearer ")
}

/// Authentication middleware
///
/// If `api_key` is configured in AppState, validates the Authorization header.
/// If no `api_key` is configured, all requests are allowed (local mode).
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected_key) = &state.api_key else {
        return next.run(request).await;
    };

    // Preflight requests never carry credentials
    if request.method() == axum::http::Method::OPTIONS {
        return next.run(request).await;
    }

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let message = match auth_header.map(bearer_token) {
        Some(Some(provided_key)) if provided_key == expected_key => {
            return next.run(request).await;
        }
        Some(Some(_)) => "Invalid API key",
        Some(None) => "Invalid Authorization header format. Expected: Bearer <api_key>",
        None => "API key required. Set Authorization: Bearer <api_key>",
    };

    tracing::debug!("Rejected {} {}: {}", request.method(), request.uri(), message);
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}
