//! Session repository
//!
//! Sessions are opaque tokens with an expiry. An expired session is
//! deleted the first time it is presented.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use crate::db::{bounded, DbError, DEFAULT_OPERATION_TIMEOUT};

/// Session record from database
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: i64,
    pub user_id: i64,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// Outcome of presenting a token
#[derive(Debug, Clone)]
pub enum SessionStatus {
    Active(Session),
    Expired,
    Missing,
}

/// Session repository
pub struct SessionRepo<'a> {
    pool: &'a PgPool,
    timeout: Duration,
}

impl<'a> SessionRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn create(
        &self,
        user_id: i64,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Session, DbError> {
        bounded(
            "create_session",
            self.timeout,
            self.create_inner(user_id, token, expires_at),
        )
        .await
    }

    async fn create_inner(
        &self,
        user_id: i64,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Session, DbError> {
        let session = sqlx::query_as(
            r#"
            INSERT INTO sessions (user_id, token, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, token, expires_at, created_at
            "#,
        )
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .fetch_one(self.pool)
        .await?;

        tracing::debug!(user_id, %expires_at, "session created");
        Ok(session)
    }

    /// Look a token up; an expired session is removed on the way.
    pub async fn check(&self, token: &str) -> Result<SessionStatus, DbError> {
        bounded("check_session", self.timeout, self.check_inner(token)).await
    }

    async fn check_inner(&self, token: &str) -> Result<SessionStatus, DbError> {
        let session: Option<Session> = sqlx::query_as(
            "SELECT id, user_id, token, expires_at, created_at FROM sessions WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        match session {
            None => Ok(SessionStatus::Missing),
            Some(session) if session.is_expired_at(Utc::now()) => {
                self.delete_inner(token).await?;
                tracing::debug!(user_id = session.user_id, "expired session removed");
                Ok(SessionStatus::Expired)
            }
            Some(session) => Ok(SessionStatus::Active(session)),
        }
    }

    /// Delete by token. Returns whether a session existed.
    pub async fn delete(&self, token: &str) -> Result<bool, DbError> {
        bounded("delete_session", self.timeout, self.delete_inner(token)).await
    }

    async fn delete_inner(&self, token: &str) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete every session past its expiry. Returns how many went.
    pub async fn prune(&self) -> Result<u64, DbError> {
        bounded("prune_sessions", self.timeout, self.prune_inner()).await
    }

    async fn prune_inner(&self) -> Result<u64, DbError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < NOW()")
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn expiry_is_strictly_after() {
        let now = Utc::now();
        let session = Session {
            id: 1,
            user_id: 1,
            token: "t".into(),
            expires_at: now,
            created_at: now - Duration::hours(24),
        };
        assert!(!session.is_expired_at(now));
        assert!(session.is_expired_at(now + Duration::seconds(1)));
    }
}
