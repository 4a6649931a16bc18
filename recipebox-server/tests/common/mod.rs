#![allow(dead_code)]

//! Shared setup for database-backed tests.
//!
//! Tests using this module are `#[ignore]`d and need `DATABASE_URL`
//! pointing at a disposable Postgres database.

use recipebox_server::db::{create_pool_with_options, migrations, User, UserRepo};
use recipebox_server::models::Username;
use sqlx::PgPool;
use tracing_subscriber::EnvFilter;

/// Route library logs to the test harness; `RUST_LOG` picks the level.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub async fn pool() -> PgPool {
    init_logging();
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for database tests");
    let pool = create_pool_with_options(&url, 5).await.unwrap();
    migrations::run(&pool).await.unwrap();
    pool
}

/// Create a user with a unique name; credentials are placeholders.
pub async fn user(pool: &PgPool, prefix: &str) -> User {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    let name = format!("{}_{}", prefix, &suffix[..12]);
    UserRepo::new(pool)
        .create(&Username::new(&name).unwrap(), "hash", "salt")
        .await
        .unwrap()
}

pub fn unique_label(prefix: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", prefix, &suffix[..8])
}
