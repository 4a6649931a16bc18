//! One-shot session pruning

use anyhow::{Context, Result};
use recipebox_server::db::SessionRepo;
use recipebox_server::Settings;

pub async fn run_prune(settings: Settings) -> Result<()> {
    let pool = super::connect(&settings.database).await?;
    let removed = SessionRepo::new(&pool)
        .with_timeout(settings.database.operation_timeout())
        .prune()
        .await
        .context("Failed to prune sessions")?;

    println!("Removed {} expired session(s)", removed);
    pool.close().await;
    Ok(())
}
