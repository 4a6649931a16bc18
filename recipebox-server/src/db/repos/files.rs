//! File repository - rows describing uploaded objects

use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use crate::db::{bounded, DbError, DEFAULT_OPERATION_TIMEOUT};
use crate::models::{Paginated, Pagination};

/// File record from database
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct FileRecord {
    pub id: i64,
    pub user_id: i64,
    /// Object key in storage
    pub name: String,
    pub url: String,
    pub url_expiry: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// File repository
pub struct FileRepo<'a> {
    pool: &'a PgPool,
    timeout: Duration,
}

impl<'a> FileRepo<'a> {
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
        name: &str,
        url: &str,
        url_expiry: DateTime<Utc>,
    ) -> Result<FileRecord, DbError> {
        bounded(
            "create_file",
            self.timeout,
            self.create_inner(user_id, name, url, url_expiry),
        )
        .await
    }

    async fn create_inner(
        &self,
        user_id: i64,
        name: &str,
        url: &str,
        url_expiry: DateTime<Utc>,
    ) -> Result<FileRecord, DbError> {
        let file = sqlx::query_as(
            r#"
            INSERT INTO files (user_id, name, url, url_expiry)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, name, url, url_expiry, created_at
            "#,
        )
        .bind(user_id)
        .bind(name)
        .bind(url)
        .bind(url_expiry)
        .fetch_one(self.pool)
        .await?;

        Ok(file)
    }

    pub async fn get(&self, id: i64) -> Result<FileRecord, DbError> {
        bounded("get_file", self.timeout, self.get_inner(id)).await
    }

    async fn get_inner(&self, id: i64) -> Result<FileRecord, DbError> {
        sqlx::query_as(
            "SELECT id, user_id, name, url, url_expiry, created_at FROM files WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("file", id))
    }

    /// Persist a freshly signed URL.
    pub async fn update_url(
        &self,
        id: i64,
        url: &str,
        url_expiry: DateTime<Utc>,
    ) -> Result<FileRecord, DbError> {
        bounded(
            "refresh_file_url",
            self.timeout,
            self.update_url_inner(id, url, url_expiry),
        )
        .await
    }

    async fn update_url_inner(
        &self,
        id: i64,
        url: &str,
        url_expiry: DateTime<Utc>,
    ) -> Result<FileRecord, DbError> {
        sqlx::query_as(
            r#"
            UPDATE files SET url = $2, url_expiry = $3
            WHERE id = $1
            RETURNING id, user_id, name, url, url_expiry, created_at
            "#,
        )
        .bind(id)
        .bind(url)
        .bind(url_expiry)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("file", id))
    }

    /// A user's files, newest first.
    pub async fn list_for_user(
        &self,
        user_id: i64,
        page: Pagination,
    ) -> Result<Paginated<FileRecord>, DbError> {
        bounded(
            "list_user_files",
            self.timeout,
            self.list_for_user_inner(user_id, page),
        )
        .await
    }

    async fn list_for_user_inner(
        &self,
        user_id: i64,
        page: Pagination,
    ) -> Result<Paginated<FileRecord>, DbError> {
        let mut conn = self.pool.acquire().await?;

        // Counted separately so a page past the end still reports the total
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&mut *conn)
            .await?;

        let items: Vec<FileRecord> = sqlx::query_as(
            r#"
            SELECT id, user_id, name, url, url_expiry, created_at
            FROM files
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&mut *conn)
        .await?;

        Ok(Paginated::new(items, total, page))
    }
}
