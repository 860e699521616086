//! Weft Server — HTTP adapter for the Weft orchestration engine.
//!
//! This crate provides the REST layer (via axum) on top of `weft-core`:
//! asynchronous workflow submission, job status polling, and the read-only
//! discovery catalog.
//!
//! # Architecture
//!
//! ```text
//! weft-core    (domain: registry, engine, jobs, dispatcher)
//!      ↑
//! weft-server  (adapter: HTTP/axum, this crate)
//! ```

pub mod api;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use weft_core::state::{AppState, AppStateInner};

/// Configuration for the Weft backend server.
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Base directory holding `agents/` and `workflows/` subtrees.
    pub base_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            base_path: "genai".to_string(),
        }
    }
}

/// Build the shared `AppState` from a base path.
///
/// Useful when the state must be shared between the HTTP server and other
/// consumers (the CLI's one-shot runner, tests with injected models).
pub fn create_app_state(base_path: &str) -> AppState {
    Arc::new(AppStateInner::new(Path::new(base_path)))
}

/// Start the backend server. Returns the actual address it listens on.
pub async fn start_server(config: ServerConfig) -> Result<SocketAddr, String> {
    // Initialize tracing (ignore if already initialized)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weft_core=info,weft_server=info,tower_http=info".into()),
        )
        .try_init();

    tracing::info!(
        "Starting Weft backend server on {}:{} (base path: {})",
        config.host,
        config.port,
        config.base_path
    );

    let state = create_app_state(&config.base_path);
    start_server_with_state(config, state).await
}

/// Start the HTTP server with a pre-built `AppState`.
pub async fn start_server_with_state(
    config: ServerConfig,
    state: AppState,
) -> Result<SocketAddr, String> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(api::api_router())
        .route("/api/health", axum::routing::get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| format!("Invalid address: {}", e))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", addr, e))?;

    let local_addr = listener
        .local_addr()
        .map_err(|e| format!("Failed to get local address: {}", e))?;

    tracing::info!("Weft backend server listening on {}", local_addr);

    // Spawn the server in a background task
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok(local_addr)
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "server": "weft-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
