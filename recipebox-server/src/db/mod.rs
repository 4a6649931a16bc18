//! Database layer - connection pool, schema, and repositories
//!
//! # Design Principles
//!
//! - Connection pool with explicit limits, shared via `PgPool`
//! - List operations batch-load children with `= ANY($1)` (no N+1)
//! - Rely on DB constraints and map violations to conflicts
//! - Every multi-step mutation runs in one transaction under a deadline

pub mod deadline;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repos;

pub use deadline::{bounded, DEFAULT_OPERATION_TIMEOUT};
pub use error::DbError;
pub use pool::{create_pool, create_pool_with_options};
pub use repos::*;
pub use sqlx::PgPool;
