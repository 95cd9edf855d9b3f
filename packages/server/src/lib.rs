//! NodeTree HTTP Server
//!
//! REST API over [`TreeService`]. Handlers only decode requests and map
//! errors; every tree rule lives in `nodetree-core`.
//!
//! # Usage
//!
//! ```bash
//! # Default settings (port 5000, ~/.nodetree/database/nodetree.db)
//! cargo run --bin nodetree-server
//!
//! # Custom port and database
//! PORT=8080 NODETREE_DB_PATH=/tmp/tree.db cargo run --bin nodetree-server
//! ```
//!
//! # Environment Variables
//!
//! - `PORT`: Server port (default: 5000)
//! - `HOST`: Bind address (default: 127.0.0.1)
//! - `CORS_ALLOW_ORIGIN`: Single allowed origin (default: any origin)
//! - `RUST_LOG`: Logging level (e.g., "info", "debug", "trace")
//! - `NODETREE_*`: see [`nodetree_core::config`]

use axum::{
    http::{header::HeaderValue, Method},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use nodetree_core::services::TreeService;

mod http_error;
mod node_endpoints;

pub use http_error::HttpError;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Application state shared across all endpoints
#[derive(Clone)]
pub struct AppState {
    pub tree: Arc<TreeService>,
}

impl AppState {
    pub fn new(tree: TreeService) -> Self {
        Self {
            tree: Arc::new(tree),
        }
    }
}

/// Listener and CORS settings
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// `None` allows any origin
    pub cors_allow_origin: Option<HeaderValue>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            cors_allow_origin: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("HOST") {
            config.host = host;
        }
        if let Ok(port) = std::env::var("PORT") {
            config.port = port
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid PORT '{}'", port))?;
        }
        if let Ok(origin) = std::env::var("CORS_ALLOW_ORIGIN") {
            config.cors_allow_origin = Some(origin.parse().map_err(|_| {
                anyhow::anyhow!("Invalid CORS_ALLOW_ORIGIN '{}' - must be valid HTTP origin", origin)
            })?);
        }

        Ok(config)
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Create the application router with all endpoint modules
pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    Router::new()
        .merge(node_endpoints::routes(state))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(config.cors_allow_origin.clone()))
}

fn cors_layer(origin: Option<HeaderValue>) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    match origin {
        Some(origin) => layer.allow_origin(origin),
        None => layer.allow_origin(Any),
    }
}

/// Start the HTTP server
///
/// Runs until Ctrl+C; in-flight requests finish before it returns.
///
/// # Errors
///
/// Returns error if server fails to bind or start.
pub async fn start_server(tree: TreeService, config: ServerConfig) -> anyhow::Result<()> {
    let app = create_router(AppState::new(tree), &config);

    let addr = config.addr();
    tracing::info!("🚀 HTTP server starting on http://{}", addr);
    match &config.cors_allow_origin {
        Some(origin) => tracing::info!("📡 CORS enabled for {:?}", origin),
        None => tracing::info!("📡 CORS enabled for any origin"),
    }

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("👋 HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
