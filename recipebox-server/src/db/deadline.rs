//! Bounded units of work
//!
//! Every repository operation runs under a deadline. When the deadline
//! passes the operation's future is dropped; any open transaction it held
//! is dropped with it and sqlx rolls it back before the connection returns
//! to the pool.

use std::future::Future;
use std::time::Duration;

use super::DbError;

/// Default per-operation deadline.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Run `work` to completion or fail with [`DbError::Timeout`] after `limit`.
pub async fn bounded<T, F>(operation: &'static str, limit: Duration, work: F) -> Result<T, DbError>
where
    F: Future<Output = Result<T, DbError>>,
{
    match tokio::time::timeout(limit, work).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(
                operation,
                timeout_ms = limit.as_millis() as u64,
                "operation deadline exceeded, rolling back"
            );
            Err(DbError::Timeout {
                operation,
                after: limit,
            })
        }
    }
}
