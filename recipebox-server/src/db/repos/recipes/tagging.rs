//! Tag associations on a recipe
//!
//! Links live only in `recipe_tags`, which both the recipe view and the
//! tag view read from.

use super::ingredients::touch;
use super::{load_detail, lock_owned, RecipeDetail, RecipeRepo};
use crate::db::{bounded, DbError};

impl RecipeRepo<'_> {
    /// Link an existing tag to a recipe.
    pub async fn add_tag(
        &self,
        actor_id: i64,
        recipe_id: i64,
        tag_id: i64,
    ) -> Result<RecipeDetail, DbError> {
        bounded("add_recipe_tag", self.timeout, self.add_tag_tx(actor_id, recipe_id, tag_id)).await
    }

    async fn add_tag_tx(
        &self,
        actor_id: i64,
        recipe_id: i64,
        tag_id: i64,
    ) -> Result<RecipeDetail, DbError> {
        let mut tx = self.pool.begin().await?;
        lock_owned(&mut tx, recipe_id, actor_id).await?;

        let tag: Option<i64> = sqlx::query_scalar("SELECT id FROM tags WHERE id = $1 FOR SHARE")
            .bind(tag_id)
            .fetch_optional(&mut *tx)
            .await?;
        if tag.is_none() {
            return Err(DbError::not_found("tag", tag_id));
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO recipe_tags (recipe_id, tag_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(recipe_id)
        .bind(tag_id)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            tracing::warn!(recipe_id, tag_id, "tag already on recipe");
            return Err(DbError::Conflict(format!(
                "tag {} is already on recipe {}",
                tag_id, recipe_id
            )));
        }

        touch(&mut tx, recipe_id).await?;
        let detail = load_detail(&mut tx, recipe_id).await?;
        tx.commit().await?;

        tracing::debug!(recipe_id, tag_id, "tag linked");
        Ok(detail)
    }

    /// Unlink a tag from a recipe. The tag itself is kept.
    pub async fn remove_tag(
        &self,
        actor_id: i64,
        recipe_id: i64,
        tag_id: i64,
    ) -> Result<RecipeDetail, DbError> {
        bounded(
            "remove_recipe_tag",
            self.timeout,
            self.remove_tag_tx(actor_id, recipe_id, tag_id),
        )
        .await
    }

    async fn remove_tag_tx(
        &self,
        actor_id: i64,
        recipe_id: i64,
        tag_id: i64,
    ) -> Result<RecipeDetail, DbError> {
        let mut tx = self.pool.begin().await?;
        lock_owned(&mut tx, recipe_id, actor_id).await?;

        let removed = sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1 AND tag_id = $2")
            .bind(recipe_id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await?;

        if removed.rows_affected() == 0 {
            return Err(DbError::not_found("recipe tag", tag_id));
        }

        touch(&mut tx, recipe_id).await?;
        let detail = load_detail(&mut tx, recipe_id).await?;
        tx.commit().await?;

        tracing::debug!(recipe_id, tag_id, "tag unlinked");
        Ok(detail)
    }
}
