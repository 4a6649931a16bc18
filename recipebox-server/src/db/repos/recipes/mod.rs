//! Recipe repository - the recipe mutation core
//!
//! Every mutation follows the same shape:
//! - one transaction, run under the repository deadline
//! - the recipe row is locked (`FOR UPDATE`) and its owner checked first
//! - nested rows are checked to belong to the addressed recipe
//! - the recipe is reloaded inside the transaction, then committed
//!
//! Any early return drops the transaction, which rolls it back.

mod ingredients;
mod instructions;
mod tagging;

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};

use crate::db::{bounded, DbError, DEFAULT_OPERATION_TIMEOUT};
use crate::models::{number_steps, NewRecipe, Paginated, Pagination, RecipePatch};

/// Recipe record from database
#[derive(Debug, Clone, FromRow)]
pub struct Recipe {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Ingredient record from database
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Ingredient {
    pub id: i64,
    pub recipe_id: i64,
    pub name: String,
    pub quantity: String,
    pub unit: String,
}

/// Instruction record from database
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Instruction {
    pub id: i64,
    pub recipe_id: i64,
    pub step: i32,
    pub contents: String,
}

/// Tag as seen from a recipe
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct RecipeTag {
    pub id: i64,
    pub tag: String,
}

/// A recipe with all of its nested rows.
///
/// Ingredients are in insertion order, instructions in step order,
/// tags alphabetical.
#[derive(Debug, Clone)]
pub struct RecipeDetail {
    pub recipe: Recipe,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<Instruction>,
    pub tags: Vec<RecipeTag>,
}

/// Recipe repository
pub struct RecipeRepo<'a> {
    pool: &'a PgPool,
    timeout: Duration,
}

impl<'a> RecipeRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    /// Override the per-operation deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Create a recipe with its ingredients and instructions (atomic).
    ///
    /// Instruction steps are renumbered `1..=n` in submitted step order.
    pub async fn create(&self, owner_id: i64, new: NewRecipe) -> Result<RecipeDetail, DbError> {
        bounded("create_recipe", self.timeout, self.create_tx(owner_id, new)).await
    }

    async fn create_tx(&self, owner_id: i64, new: NewRecipe) -> Result<RecipeDetail, DbError> {
        let mut tx = self.pool.begin().await?;

        let recipe_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO recipes (user_id, name, description)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(owner_id)
        .bind(new.name.as_str())
        .bind(&new.description)
        .fetch_one(&mut *tx)
        .await?;

        if !new.ingredients.is_empty() {
            let mut names = Vec::with_capacity(new.ingredients.len());
            let mut quantities = Vec::with_capacity(new.ingredients.len());
            let mut units = Vec::with_capacity(new.ingredients.len());
            for ingredient in new.ingredients {
                names.push(ingredient.name);
                quantities.push(ingredient.quantity);
                units.push(ingredient.unit);
            }

            sqlx::query(
                r#"
                INSERT INTO ingredients (recipe_id, name, quantity, unit)
                SELECT $1, * FROM UNNEST($2::text[], $3::text[], $4::text[])
                "#,
            )
            .bind(recipe_id)
            .bind(&names)
            .bind(&quantities)
            .bind(&units)
            .execute(&mut *tx)
            .await?;
        }

        let numbered = number_steps(new.instructions);
        if !numbered.is_empty() {
            let (steps, contents): (Vec<i32>, Vec<String>) = numbered
                .into_iter()
                .map(|(step, text)| (step, text.as_str().to_owned()))
                .unzip();

            sqlx::query(
                r#"
                INSERT INTO instructions (recipe_id, step, contents)
                SELECT $1, * FROM UNNEST($2::int4[], $3::text[])
                "#,
            )
            .bind(recipe_id)
            .bind(&steps)
            .bind(&contents)
            .execute(&mut *tx)
            .await?;
        }

        let detail = load_detail(&mut tx, recipe_id).await?;
        tx.commit().await?;

        tracing::info!(recipe_id, user_id = owner_id, "recipe created");
        Ok(detail)
    }

    /// Get a recipe with ingredients, ordered instructions, and tags.
    pub async fn get(&self, id: i64) -> Result<RecipeDetail, DbError> {
        bounded("get_recipe", self.timeout, self.get_inner(id)).await
    }

    async fn get_inner(&self, id: i64) -> Result<RecipeDetail, DbError> {
        let mut conn = self.pool.acquire().await?;
        load_detail(&mut conn, id).await
    }

    /// Page through a user's recipes, newest first.
    pub async fn list_for_user(
        &self,
        user_id: i64,
        page: Pagination,
    ) -> Result<Paginated<RecipeDetail>, DbError> {
        bounded("list_user_recipes", self.timeout, self.list_for_user_inner(user_id, page)).await
    }

    async fn list_for_user_inner(
        &self,
        user_id: i64,
        page: Pagination,
    ) -> Result<Paginated<RecipeDetail>, DbError> {
        let mut conn = self.pool.acquire().await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM recipes WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&mut *conn)
            .await?;

        let recipes: Vec<Recipe> = sqlx::query_as(
            r#"
            SELECT id, user_id, name, description, created_at, updated_at
            FROM recipes
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

        let items = load_details(&mut conn, recipes).await?;
        Ok(Paginated::new(items, total, page))
    }

    /// Update name and/or description. Blank patch fields are left alone.
    pub async fn update(
        &self,
        actor_id: i64,
        recipe_id: i64,
        patch: RecipePatch,
    ) -> Result<RecipeDetail, DbError> {
        bounded("update_recipe", self.timeout, self.update_tx(actor_id, recipe_id, patch)).await
    }

    async fn update_tx(
        &self,
        actor_id: i64,
        recipe_id: i64,
        patch: RecipePatch,
    ) -> Result<RecipeDetail, DbError> {
        let mut tx = self.pool.begin().await?;
        lock_owned(&mut tx, recipe_id, actor_id).await?;

        sqlx::query(
            r#"
            UPDATE recipes
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(recipe_id)
        .bind(patch.name.as_ref().map(|n| n.as_str()))
        .bind(patch.description.as_deref())
        .execute(&mut *tx)
        .await?;

        let detail = load_detail(&mut tx, recipe_id).await?;
        tx.commit().await?;

        tracing::info!(recipe_id, user_id = actor_id, "recipe updated");
        Ok(detail)
    }

    /// Delete a recipe together with its ingredients, instructions and tag links.
    pub async fn delete(&self, actor_id: i64, recipe_id: i64) -> Result<(), DbError> {
        bounded("delete_recipe", self.timeout, self.delete_tx(actor_id, recipe_id)).await
    }

    async fn delete_tx(&self, actor_id: i64, recipe_id: i64) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;
        lock_owned(&mut tx, recipe_id, actor_id).await?;

        for sql in [
            "DELETE FROM recipe_tags WHERE recipe_id = $1",
            "DELETE FROM ingredients WHERE recipe_id = $1",
            "DELETE FROM instructions WHERE recipe_id = $1",
            "DELETE FROM recipes WHERE id = $1",
        ] {
            sqlx::query(sql).bind(recipe_id).execute(&mut *tx).await?;
        }

        tx.commit().await?;

        tracing::info!(recipe_id, user_id = actor_id, "recipe deleted");
        Ok(())
    }
}

/// Lock the recipe row and check that `actor_id` owns it.
async fn lock_owned(conn: &mut PgConnection, recipe_id: i64, actor_id: i64) -> Result<(), DbError> {
    let owner: Option<i64> =
        sqlx::query_scalar("SELECT user_id FROM recipes WHERE id = $1 FOR UPDATE")
            .bind(recipe_id)
            .fetch_optional(&mut *conn)
            .await?;

    check_owner(recipe_id, owner, actor_id)
}

fn check_owner(recipe_id: i64, owner: Option<i64>, actor_id: i64) -> Result<(), DbError> {
    match owner {
        None => Err(DbError::not_found("recipe", recipe_id)),
        Some(owner_id) if owner_id != actor_id => {
            tracing::warn!(recipe_id, owner_id, actor_id, "mutation rejected: not the owner");
            Err(DbError::Forbidden(format!(
                "recipe {} belongs to another user",
                recipe_id
            )))
        }
        Some(_) => Ok(()),
    }
}

/// Check that a child row exists and hangs off `recipe_id`.
///
/// `parent` is the child's stored recipe id, `None` if the child is missing.
fn check_membership(
    resource: &'static str,
    child_id: i64,
    parent: Option<i64>,
    recipe_id: i64,
) -> Result<(), DbError> {
    match parent {
        None => Err(DbError::not_found(resource, child_id)),
        Some(parent_id) if parent_id != recipe_id => {
            tracing::warn!(resource, child_id, parent_id, recipe_id, "child belongs to another recipe");
            Err(DbError::Conflict(format!(
                "{} {} does not belong to recipe {}",
                resource, child_id, recipe_id
            )))
        }
        Some(_) => Ok(()),
    }
}

/// Load one recipe with its nested rows.
async fn load_detail(conn: &mut PgConnection, recipe_id: i64) -> Result<RecipeDetail, DbError> {
    let recipe: Recipe = sqlx::query_as(
        r#"
        SELECT id, user_id, name, description, created_at, updated_at
        FROM recipes
        WHERE id = $1
        "#,
    )
    .bind(recipe_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DbError::not_found("recipe", recipe_id))?;

    load_details(conn, vec![recipe])
        .await?
        .pop()
        .ok_or_else(|| DbError::not_found("recipe", recipe_id))
}

/// Batch-load nested rows for many recipes: three queries regardless of count.
async fn load_details(
    conn: &mut PgConnection,
    recipes: Vec<Recipe>,
) -> Result<Vec<RecipeDetail>, DbError> {
    if recipes.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i64> = recipes.iter().map(|r| r.id).collect();

    let ingredients: Vec<Ingredient> = sqlx::query_as(
        r#"
        SELECT id, recipe_id, name, quantity, unit
        FROM ingredients
        WHERE recipe_id = ANY($1)
        ORDER BY recipe_id, id
        "#,
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    let instructions: Vec<Instruction> = sqlx::query_as(
        r#"
        SELECT id, recipe_id, step, contents
        FROM instructions
        WHERE recipe_id = ANY($1)
        ORDER BY recipe_id, step ASC, id
        "#,
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    let tags: Vec<(i64, i64, String)> = sqlx::query_as(
        r#"
        SELECT rt.recipe_id, t.id, t.tag
        FROM recipe_tags rt
        JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = ANY($1)
        ORDER BY t.tag
        "#,
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    Ok(assemble(
        recipes,
        group_by_recipe(ingredients.into_iter().map(|i| (i.recipe_id, i))),
        group_by_recipe(instructions.into_iter().map(|i| (i.recipe_id, i))),
        group_by_recipe(
            tags.into_iter()
                .map(|(recipe_id, id, tag)| (recipe_id, RecipeTag { id, tag })),
        ),
    ))
}

/// Group rows by recipe id, preserving row order within each group.
fn group_by_recipe<T>(rows: impl IntoIterator<Item = (i64, T)>) -> HashMap<i64, Vec<T>> {
    let mut grouped: HashMap<i64, Vec<T>> = HashMap::new();
    for (recipe_id, row) in rows {
        grouped.entry(recipe_id).or_default().push(row);
    }
    grouped
}

/// Attach grouped children to recipes, keeping the recipes' order.
fn assemble(
    recipes: Vec<Recipe>,
    mut ingredients: HashMap<i64, Vec<Ingredient>>,
    mut instructions: HashMap<i64, Vec<Instruction>>,
    mut tags: HashMap<i64, Vec<RecipeTag>>,
) -> Vec<RecipeDetail> {
    recipes
        .into_iter()
        .map(|recipe| RecipeDetail {
            ingredients: ingredients.remove(&recipe.id).unwrap_or_default(),
            instructions: instructions.remove(&recipe.id).unwrap_or_default(),
            tags: tags.remove(&recipe.id).unwrap_or_default(),
            recipe,
        })
        .collect()
}
