//! Command implementations for the recipebox CLI

pub mod config;
pub mod migrate;
pub mod prune;
pub mod serve;

use anyhow::{bail, Context, Result};
use recipebox_server::config::DatabaseSettings;
use recipebox_server::db::create_pool_with_options;
use recipebox_server::db::PgPool;

pub use config::run_config;
pub use migrate::run_migrate;
pub use prune::run_prune;
pub use serve::run_serve;

/// Connect to the configured database.
pub(crate) async fn connect(database: &DatabaseSettings) -> Result<PgPool> {
    if database.url.is_empty() {
        bail!("database URL not set. Set DATABASE_URL, [database].url in the config file, or --database-url");
    }

    create_pool_with_options(&database.url, database.max_connections)
        .await
        .context("Failed to create database pool")
}
