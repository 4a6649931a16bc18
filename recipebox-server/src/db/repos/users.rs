//! User repository

use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use crate::db::error::is_unique_violation;
use crate::db::{bounded, DbError, DEFAULT_OPERATION_TIMEOUT};
use crate::models::Username;

/// User record without credentials
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// Stored credentials for login
#[derive(Debug, Clone, FromRow)]
pub struct Credentials {
    pub id: i64,
    pub password_hash: String,
    pub salt: String,
}

/// Public profile with recipe count
#[derive(Debug, Clone, FromRow)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub recipe_count: i64,
    pub created_at: DateTime<Utc>,
}

/// User repository
pub struct UserRepo<'a> {
    pool: &'a PgPool,
    timeout: Duration,
}

impl<'a> UserRepo<'a> {
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

    /// Insert a new user. A taken username is a conflict.
    pub async fn create(
        &self,
        username: &Username,
        password_hash: &str,
        salt: &str,
    ) -> Result<User, DbError> {
        bounded(
            "create_user",
            self.timeout,
            self.create_inner(username, password_hash, salt),
        )
        .await
    }

    async fn create_inner(
        &self,
        username: &Username,
        password_hash: &str,
        salt: &str,
    ) -> Result<User, DbError> {
        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash, salt)
            VALUES ($1, $2, $3)
            RETURNING id, username, created_at
            "#,
        )
        .bind(username.as_str())
        .bind(password_hash)
        .bind(salt)
        .fetch_one(self.pool)
        .await;

        match created {
            Ok(user) => {
                tracing::info!(user_id = user.id, username = %user.username, "user registered");
                Ok(user)
            }
            Err(e) if is_unique_violation(&e) => Err(DbError::Conflict(format!(
                "username '{}' is taken",
                username.as_str()
            ))),
            Err(e) => Err(e.into()),
        }
    }

    /// Credentials for `username`, if the user exists.
    pub async fn find_credentials(&self, username: &str) -> Result<Option<Credentials>, DbError> {
        bounded("find_credentials", self.timeout, self.find_credentials_inner(username)).await
    }

    async fn find_credentials_inner(&self, username: &str) -> Result<Option<Credentials>, DbError> {
        let creds = sqlx::query_as(
            "SELECT id, password_hash, salt FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        Ok(creds)
    }

    pub async fn get(&self, id: i64) -> Result<User, DbError> {
        bounded("get_user", self.timeout, self.get_inner(id)).await
    }

    async fn get_inner(&self, id: i64) -> Result<User, DbError> {
        sqlx::query_as("SELECT id, username, created_at FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("user", id))
    }

    /// Public profile by username.
    pub async fn profile(&self, username: &str) -> Result<UserProfile, DbError> {
        bounded("get_user_profile", self.timeout, self.profile_inner(username)).await
    }

    async fn profile_inner(&self, username: &str) -> Result<UserProfile, DbError> {
        sqlx::query_as(
            r#"
            SELECT u.id, u.username, u.created_at, COUNT(r.id) AS recipe_count
            FROM users u
            LEFT JOIN recipes r ON r.user_id = u.id
            WHERE u.username = $1
            GROUP BY u.id, u.username, u.created_at
            "#,
        )
        .bind(username)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("user", username))
    }

    /// Resolve a username to its id.
    pub async fn id_for(&self, username: &str) -> Result<i64, DbError> {
        bounded("resolve_username", self.timeout, self.id_for_inner(username)).await
    }

    async fn id_for_inner(&self, username: &str) -> Result<i64, DbError> {
        sqlx::query_scalar("SELECT id FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("user", username))
    }
}
