//! Ingredient mutations under a recipe

use sqlx::PgConnection;

use super::{check_membership, load_detail, lock_owned, Ingredient, RecipeDetail, RecipeRepo};
use crate::db::{bounded, DbError};
use crate::models::{IngredientDraft, IngredientPatch};

impl RecipeRepo<'_> {
    /// Append an ingredient to a recipe the actor owns.
    pub async fn add_ingredient(
        &self,
        actor_id: i64,
        recipe_id: i64,
        draft: IngredientDraft,
    ) -> Result<RecipeDetail, DbError> {
        bounded(
            "add_ingredient",
            self.timeout,
            self.add_ingredient_tx(actor_id, recipe_id, draft),
        )
        .await
    }

    async fn add_ingredient_tx(
        &self,
        actor_id: i64,
        recipe_id: i64,
        draft: IngredientDraft,
    ) -> Result<RecipeDetail, DbError> {
        let mut tx = self.pool.begin().await?;
        lock_owned(&mut tx, recipe_id, actor_id).await?;

        let ingredient_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO ingredients (recipe_id, name, quantity, unit)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(recipe_id)
        .bind(&draft.name)
        .bind(&draft.quantity)
        .bind(&draft.unit)
        .fetch_one(&mut *tx)
        .await?;

        touch(&mut tx, recipe_id).await?;
        let detail = load_detail(&mut tx, recipe_id).await?;
        tx.commit().await?;

        tracing::debug!(recipe_id, ingredient_id, "ingredient added");
        Ok(detail)
    }

    /// Overwrite the non-blank fields of an ingredient.
    pub async fn update_ingredient(
        &self,
        actor_id: i64,
        recipe_id: i64,
        ingredient_id: i64,
        patch: IngredientPatch,
    ) -> Result<RecipeDetail, DbError> {
        bounded(
            "update_ingredient",
            self.timeout,
            self.update_ingredient_tx(actor_id, recipe_id, ingredient_id, patch),
        )
        .await
    }

    async fn update_ingredient_tx(
        &self,
        actor_id: i64,
        recipe_id: i64,
        ingredient_id: i64,
        patch: IngredientPatch,
    ) -> Result<RecipeDetail, DbError> {
        let mut tx = self.pool.begin().await?;
        lock_owned(&mut tx, recipe_id, actor_id).await?;
        let current = lock_ingredient(&mut tx, recipe_id, ingredient_id).await?;

        let (name, quantity, unit) = patch.merge(&current.name, &current.quantity, &current.unit);
        sqlx::query("UPDATE ingredients SET name = $2, quantity = $3, unit = $4 WHERE id = $1")
            .bind(ingredient_id)
            .bind(name)
            .bind(quantity)
            .bind(unit)
            .execute(&mut *tx)
            .await?;

        touch(&mut tx, recipe_id).await?;
        let detail = load_detail(&mut tx, recipe_id).await?;
        tx.commit().await?;

        tracing::debug!(recipe_id, ingredient_id, "ingredient updated");
        Ok(detail)
    }

    /// Remove an ingredient from a recipe.
    pub async fn delete_ingredient(
        &self,
        actor_id: i64,
        recipe_id: i64,
        ingredient_id: i64,
    ) -> Result<RecipeDetail, DbError> {
        bounded(
            "delete_ingredient",
            self.timeout,
            self.delete_ingredient_tx(actor_id, recipe_id, ingredient_id),
        )
        .await
    }

    async fn delete_ingredient_tx(
        &self,
        actor_id: i64,
        recipe_id: i64,
        ingredient_id: i64,
    ) -> Result<RecipeDetail, DbError> {
        let mut tx = self.pool.begin().await?;
        lock_owned(&mut tx, recipe_id, actor_id).await?;
        lock_ingredient(&mut tx, recipe_id, ingredient_id).await?;

        sqlx::query("DELETE FROM ingredients WHERE id = $1")
            .bind(ingredient_id)
            .execute(&mut *tx)
            .await?;

        touch(&mut tx, recipe_id).await?;
        let detail = load_detail(&mut tx, recipe_id).await?;
        tx.commit().await?;

        tracing::debug!(recipe_id, ingredient_id, "ingredient deleted");
        Ok(detail)
    }
}

async fn lock_ingredient(
    conn: &mut PgConnection,
    recipe_id: i64,
    ingredient_id: i64,
) -> Result<Ingredient, DbError> {
    let row: Option<Ingredient> = sqlx::query_as(
        r#"
        SELECT id, recipe_id, name, quantity, unit
        FROM ingredients
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(ingredient_id)
    .fetch_optional(&mut *conn)
    .await?;

    check_membership("ingredient", ingredient_id, row.as_ref().map(|i| i.recipe_id), recipe_id)?;
    row.ok_or_else(|| DbError::not_found("ingredient", ingredient_id))
}

/// Bump the recipe's `updated_at` after a nested change.
pub(super) async fn touch(conn: &mut PgConnection, recipe_id: i64) -> Result<(), DbError> {
    sqlx::query("UPDATE recipes SET updated_at = NOW() WHERE id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
