//! HTTP server command
//!
//! Connects the pool, applies migrations, starts the session pruner and
//! runs the API until Ctrl+C or SIGTERM.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tokio::sync::watch;

use recipebox_server::auth::{generate_token, PasswordHasher, SessionPruner};
use recipebox_server::config::StorageSettings;
use recipebox_server::db::migrations;
use recipebox_server::storage::{LocalObjectStore, UrlSigner};
use recipebox_server::{run_server, AppState, ServerConfig, Settings};

/// Length of the generated signing key when none is configured
const EPHEMERAL_SECRET_LEN: usize = 48;

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind to (overrides config)
    #[arg(long, short = 'b')]
    pub bind: Option<SocketAddr>,

    /// Allow permissive CORS (all origins) - use with caution
    #[arg(long)]
    pub cors_permissive: bool,

    /// Database URL (overrides config and DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Directory for uploaded objects (overrides config)
    #[arg(long)]
    pub storage_root: Option<std::path::PathBuf>,
}

impl ServeArgs {
    fn apply(self, settings: &mut Settings) {
        if let Some(bind) = self.bind {
            settings.server.bind = bind;
        }
        if self.cors_permissive {
            settings.server.cors_permissive = true;
        }
        if let Some(url) = self.database_url {
            settings.database.url = url;
        }
        if let Some(root) = self.storage_root {
            settings.storage.root = root;
        }
    }
}

/// Run the HTTP server
pub async fn run_serve(args: ServeArgs, mut settings: Settings) -> Result<()> {
    args.apply(&mut settings);

    tracing::info!("Starting recipebox server on {}", settings.server.bind);

    let pool = super::connect(&settings.database).await?;
    migrations::run(&pool)
        .await
        .context("Failed to apply migrations")?;

    tokio::fs::create_dir_all(&settings.storage.root)
        .await
        .with_context(|| format!("Failed to create {}", settings.storage.root.display()))?;
    let store = Arc::new(LocalObjectStore::new(&settings.storage.root));
    let signer = build_signer(&settings.storage)?;
    let hasher = PasswordHasher::new(settings.auth.hash_iterations);

    let state = AppState::new(pool.clone(), store, signer, hasher, settings.sessions.clone())
        .with_operation_timeout(settings.database.operation_timeout());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let pruner = SessionPruner::new(Arc::new(pool), settings.sessions.prune_interval())
        .spawn(shutdown_rx);

    // Run server (blocks until shutdown)
    let served = run_server(Arc::new(state), ServerConfig::from(settings.server)).await;

    let _ = shutdown_tx.send(true);
    if let Err(e) = pruner.await {
        tracing::warn!(error = %e, "session pruner did not stop cleanly");
    }

    served.context("Server error")
}

fn build_signer(storage: &StorageSettings) -> Result<UrlSigner> {
    let secret = if storage.signing_secret.is_empty() {
        tracing::warn!(
            "no storage signing secret configured; object URLs will not survive a restart"
        );
        generate_token(EPHEMERAL_SECRET_LEN)
    } else {
        storage.signing_secret.clone()
    };

    let ttl = i64::try_from(storage.url_ttl_secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .context("storage.url_ttl_secs is out of range")?;
    UrlSigner::new(secret.as_bytes(), &storage.public_url, ttl)
        .map_err(|e| anyhow!("invalid signing secret: {}", e))
}
