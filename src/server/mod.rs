pub mod events;
pub mod webhook;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::config::types::Settings;
use crate::error::BotError;

/// Shared state handed to every request handler.
///
/// Settings are loaded once at startup and immutable afterwards.
pub struct AppState {
    pub settings: Arc<Settings>,
}

/// Build the application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/webhook", post(webhook::handle_webhook))
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024)) // 2 MB
        .with_state(state)
}

/// Start the webhook server.
pub async fn start_server(settings: Arc<Settings>) -> Result<(), BotError> {
    let port = settings.server.port;
    let state = Arc::new(AppState { settings });
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "starting webhook server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| BotError::Other(format!("failed to bind to {addr}: {e}")))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| BotError::Other(format!("server error: {e}")))?;

    Ok(())
}

/// Health check endpoint: GET /
async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        axum::Json(serde_json::json!({"status": "ok"})),
    )
}
