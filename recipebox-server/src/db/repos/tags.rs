//! Tag repository
//!
//! Tags are global labels. Their recipes are read through the same
//! `recipe_tags` rows the recipe side writes.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Row};

use crate::db::error::is_unique_violation;
use crate::db::{bounded, DbError, DEFAULT_OPERATION_TIMEOUT};
use crate::models::TagLabel;

/// Tag record from database
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Tag {
    pub id: i64,
    pub tag: String,
    pub created_at: DateTime<Utc>,
}

/// Recipe summary shown under a tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedRecipe {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Tag with the recipes carrying it
#[derive(Debug, Clone)]
pub struct TagWithRecipes {
    pub tag: Tag,
    pub recipes: Vec<TaggedRecipe>,
}

/// Tag repository
pub struct TagRepo<'a> {
    pool: &'a PgPool,
    timeout: Duration,
}

impl<'a> TagRepo<'a> {
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

    /// All tags, alphabetical, each with its recipes.
    pub async fn list(&self) -> Result<Vec<TagWithRecipes>, DbError> {
        bounded("list_tags", self.timeout, self.list_inner(None)).await
    }

    /// One tag with its recipes.
    pub async fn get(&self, id: i64) -> Result<TagWithRecipes, DbError> {
        bounded("get_tag", self.timeout, self.get_inner(id)).await
    }

    async fn get_inner(&self, id: i64) -> Result<TagWithRecipes, DbError> {
        let mut tags = self.list_inner(Some(id)).await?;
        tags.pop().ok_or_else(|| DbError::not_found("tag", id))
    }

    async fn list_inner(&self, only: Option<i64>) -> Result<Vec<TagWithRecipes>, DbError> {
        let tags: Vec<Tag> = sqlx::query_as(
            r#"
            SELECT id, tag, created_at
            FROM tags
            WHERE $1::BIGINT IS NULL OR id = $1
            ORDER BY tag
            "#,
        )
        .bind(only)
        .fetch_all(self.pool)
        .await?;

        if tags.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = tags.iter().map(|t| t.id).collect();

        // Single query for every tag's recipes (no N+1)
        let rows = sqlx::query(
            r#"
            SELECT rt.tag_id, r.id, r.name, r.description, r.created_at
            FROM recipe_tags rt
            JOIN recipes r ON r.id = rt.recipe_id
            WHERE rt.tag_id = ANY($1)
            ORDER BY r.created_at DESC, r.id DESC
            "#,
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut by_tag: HashMap<i64, Vec<TaggedRecipe>> = HashMap::new();
        for row in rows {
            by_tag
                .entry(row.get("tag_id"))
                .or_default()
                .push(TaggedRecipe {
                    id: row.get("id"),
                    name: row.get("name"),
                    description: row.get("description"),
                    created_at: row.get("created_at"),
                });
        }

        Ok(tags
            .into_iter()
            .map(|tag| TagWithRecipes {
                recipes: by_tag.remove(&tag.id).unwrap_or_default(),
                tag,
            })
            .collect())
    }

    /// Create a tag. A label that already exists is a conflict.
    pub async fn create(&self, label: TagLabel) -> Result<Tag, DbError> {
        bounded("create_tag", self.timeout, async move {
            let created = sqlx::query_as::<_, Tag>(
                "INSERT INTO tags (tag) VALUES ($1) RETURNING id, tag, created_at",
            )
            .bind(label.as_str())
            .fetch_one(self.pool)
            .await;

            match created {
                Ok(tag) => {
                    tracing::info!(tag_id = tag.id, tag = %tag.tag, "tag created");
                    Ok(tag)
                }
                Err(e) if is_unique_violation(&e) => {
                    tracing::warn!(tag = label.as_str(), "duplicate tag");
                    Err(DbError::Conflict(format!("tag '{}' already exists", label.as_str())))
                }
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    /// Delete a tag and every association to it (atomic).
    pub async fn delete(&self, id: i64) -> Result<(), DbError> {
        bounded("delete_tag", self.timeout, self.delete_tx(id)).await
    }

    async fn delete_tx(&self, id: i64) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM tags WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if found.is_none() {
            return Err(DbError::not_found("tag", id));
        }

        let unlinked = sqlx::query("DELETE FROM recipe_tags WHERE tag_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM tags WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(tag_id = id, unlinked, "tag deleted");
        Ok(())
    }
}
