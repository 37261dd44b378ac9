//! HTTP API module for Meetime
//!
//! Exposes session create/extend and per-user statistics as REST endpoints.

mod auth;
pub mod routes;

use crate::config::Config;
use crate::error::{CoreError, Result};
use crate::handlers::SessionHandler;
use crate::shutdown::shutdown_signal;

use axum::{
    http::{header, request::Parts, HeaderValue, Method},
    middleware,
    routing::{get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Session business logic (store + aggregation)
    pub sessions: Arc<SessionHandler>,
    pub api_key: Option<String>,
}

/// Start the HTTP API server
pub async fn serve(addr: SocketAddr, sessions: Arc<SessionHandler>, config: &Config) -> Result<()> {
    let state = AppState {
        sessions,
        api_key: config.server.api_key.clone(),
    };

    let app = create_router(state, config.server.cors_origins.clone());

    // Check if port is already in use (another meetime instance running)
    if tokio::net::TcpStream::connect(addr).await.is_ok() {
        tracing::error!(
            "Port {} is already in use, another meetime instance may be running. \
             Use `curl http://{}/health` to check.",
            addr.port(),
            addr
        );
        return Err(CoreError::Api(format!("Port {} already in use", addr.port())));
    }

    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| CoreError::Api(e.to_string()))?;

    Ok(())
}

/// CORS: configured dashboard origins plus any browser extension origin
fn cors_layer(allowed_origins: Vec<String>) -> CorsLayer {
    let allow_origin = AllowOrigin::predicate(move |origin: &HeaderValue, _: &Parts| {
        origin
            .to_str()
            .map(|origin| {
                origin.starts_with("chrome-extension://")
                    || allowed_origins.iter().any(|allowed| allowed == origin)
            })
            .unwrap_or(false)
    });

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::PUT,
            Method::PATCH,
            Method::POST,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Create the API router with all routes
pub fn create_router(state: AppState, cors_origins: Vec<String>) -> Router {
    let session_routes = Router::new()
        .route("/sessions", post(routes::create_session))
        .route("/sessions/:id", put(routes::update_session))
        .route("/sessions/user/:user_id", get(routes::get_user_stats))
        .route(
            "/sessions/user/:user_id/insights",
            get(routes::get_user_insights),
        )
        // Apply auth middleware to all session routes
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    Router::new()
        // Health check (public, no auth required)
        .route("/health", get(routes::health))
        .merge(session_routes)
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
        .with_state(state)
}
