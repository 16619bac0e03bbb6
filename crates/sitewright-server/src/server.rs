//! HTTP server setup.

use std::net::SocketAddr;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::{AppState, StoragePaths};
use crate::{admin, sites};

/// Configuration for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Public origin used in preview links; derived from host and port if unset
    pub public_url: Option<String>,

    /// Open browser on start
    pub open: bool,

    /// Storage locations
    pub paths: StoragePaths,

    /// Largest accepted request body in bytes
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            public_url: None,
            open: false,
            paths: StoragePaths::default(),
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// Origin that generated sites are reachable at.
    pub fn base_url(&self) -> String {
        match &self.public_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}:{}", self.host, self.port),
        }
    }
}

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid address {0}")]
    InvalidAddress(String),

    #[error("Failed to bind to {0}: {1}")]
    BindError(SocketAddr, String),

    #[error("Failed to open storage: {0}")]
    Storage(String),
}

/// Build the application router.
pub fn router(state: AppState, config: &ServerConfig) -> Router {
    let api = Router::new()
        .merge(sites::routes())
        .nest("/admin", admin::routes());

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest("/api", api)
        .nest_service("/public/sites", ServeDir::new(&config.paths.sites_dir))
        .nest_service("/public/uploads", ServeDir::new(&config.paths.uploads_dir))
        .nest_service("/templates", ServeDir::new(&config.paths.templates_dir))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The sitewright HTTP server.
pub struct SiteServer {
    config: ServerConfig,
}

impl SiteServer {
    /// Create a new server.
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Open storage and serve until the process is stopped.
    pub async fn start(self) -> Result<(), ServerError> {
        let address = format!("{}:{}", self.config.host, self.config.port);
        let addr: SocketAddr = address
            .parse()
            .map_err(|_| ServerError::InvalidAddress(address.clone()))?;

        let state = AppState::open(&self.config.paths, &self.config.base_url())?;
        let app = router(state, &self.config);

        tracing::info!("Starting server at http://{}", addr);
        tracing::info!(
            "Templates in {}, sites in {}",
            self.config.paths.templates_dir.display(),
            self.config.paths.sites_dir.display()
        );

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(addr, e.to_string()))?;

        if self.config.open {
            let url = format!("{}/api/admin/templates", self.config.base_url());
            if let Err(e) = open::that(&url) {
                tracing::warn!("Failed to open browser: {}", e);
            }
        }

        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::BindError(addr, e.to_string()))?;

        Ok(())
    }
}
