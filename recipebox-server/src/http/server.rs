//! Axum server setup
//!
//! Server skeleton with:
//! - Allow-listed CORS origins by default
//! - Tracing middleware
//! - Graceful shutdown on SIGTERM/Ctrl+C

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use axum::Router;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::routes;
use crate::auth::PasswordHasher;
use crate::config::{ServerSettings, SessionSettings};
use crate::db::{FileRepo, RecipeRepo, SessionRepo, TagRepo, UserRepo, DEFAULT_OPERATION_TIMEOUT};
use crate::storage::{ObjectStore, UrlSigner};

/// Upload body limit (bytes)
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (default: 127.0.0.1:3030)
    pub bind_addr: SocketAddr,

    /// Allow permissive CORS (default: false = allow-list only)
    ///
    /// WARNING: Setting this to true allows any origin.
    pub cors_permissive: bool,

    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerSettings::default().into()
    }
}

impl From<ServerSettings> for ServerConfig {
    fn from(s: ServerSettings) -> Self {
        Self {
            bind_addr: s.bind,
            cors_permissive: s.cors_permissive,
            cors_origins: s.cors_origins,
        }
    }
}

/// Shared application state
pub struct AppState {
    pub pool: PgPool,
    pub store: Arc<dyn ObjectStore>,
    pub signer: UrlSigner,
    pub hasher: PasswordHasher,
    pub sessions: SessionSettings,
    /// Deadline applied to every repository operation
    pub operation_timeout: Duration,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        store: Arc<dyn ObjectStore>,
        signer: UrlSigner,
        hasher: PasswordHasher,
        sessions: SessionSettings,
    ) -> Self {
        Self {
            pool,
            store,
            signer,
            hasher,
            sessions,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    pub fn recipes(&self) -> RecipeRepo<'_> {
        RecipeRepo::new(&self.pool).with_timeout(self.operation_timeout)
    }

    pub fn tags(&self) -> TagRepo<'_> {
        TagRepo::new(&self.pool).with_timeout(self.operation_timeout)
    }

    pub fn users(&self) -> UserRepo<'_> {
        UserRepo::new(&self.pool).with_timeout(self.operation_timeout)
    }

    pub fn session_store(&self) -> SessionRepo<'_> {
        SessionRepo::new(&self.pool).with_timeout(self.operation_timeout)
    }

    pub fn files(&self) -> FileRepo<'_> {
        FileRepo::new(&self.pool).with_timeout(self.operation_timeout)
    }
}

/// Build the application router with all routes.
pub fn build_router(state: Arc<AppState>, config: &ServerConfig) -> Router {
    let cors = if config.cors_permissive {
        tracing::warn!("CORS: Permissive mode enabled - all origins allowed");
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|origin| match origin.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .merge(routes::health::router())
        .nest(
            "/api",
            Router::new()
                .merge(routes::auth::router())
                .merge(routes::recipes::router())
                .merge(routes::tags::router())
                .merge(routes::users::router())
                .merge(routes::files::router()),
        )
        .merge(routes::objects::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server until Ctrl+C or SIGTERM.
///
/// # Example
///
/// ```ignore
/// let state = AppState::new(pool, store, signer, hasher, sessions);
/// run_server(Arc::new(state), ServerConfig::default()).await?;
/// ```
pub async fn run_server(state: Arc<AppState>, config: ServerConfig) -> Result<(), ServerError> {
    let app = build_router(state, &config);

    // Bind listener
    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    // Run with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting shutdown");
        }
    }
}

/// Server error type
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 3030);
        assert!(!config.cors_permissive);
        assert!(!config.cors_origins.is_empty());
    }
}
