//! HTTP server setup and configuration.

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use reqwest::Client;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::config::Config;
use crate::provider::ProviderRegistry;

/// Directory holding the built frontend assets.
const FRONTEND_DIR: &str = "chat/dist";

/// Shared application state.
///
/// Built once at startup; every field is read-only across requests.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ProviderRegistry>,
}

/// Create the axum router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", get(handlers::chat))
        .route("/api/hello", get(handlers::hello))
        .route("/api/events", get(handlers::events))
        .fallback_service(ServeDir::new(FRONTEND_DIR))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server.
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let listen_addr = config.server.listen.clone();

    // Connect timeout only: responses are long-lived streams, so an
    // overall request timeout would cut generations short.
    let http_client = Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()?;

    let registry = ProviderRegistry::new(http_client, &config.providers);

    let state = AppState {
        registry: Arc::new(registry),
    };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!(address = %listen_addr, "Starting prism relay server");

    axum::serve(listener, app).await?;

    Ok(())
}
