//! Schema migration command

use anyhow::{Context, Result};
use recipebox_server::db::migrations;
use recipebox_server::Settings;

/// Apply migrations and exit
pub async fn run_migrate(settings: Settings) -> Result<()> {
    let pool = super::connect(&settings.database).await?;
    migrations::run(&pool)
        .await
        .context("Failed to apply migrations")?;

    println!("Migrations applied");
    pool.close().await;
    Ok(())
}
