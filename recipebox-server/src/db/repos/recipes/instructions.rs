//! Instruction mutations under a recipe
//!
//! Steps stay contiguous from 1. Inserts shift later steps up, deletes
//! shift them down. The `(recipe_id, step)` unique constraint is deferred,
//! so intermediate duplicates inside a transaction are fine as long as the
//! committed state is clean.

use sqlx::PgConnection;

use super::ingredients::touch;
use super::{check_membership, load_detail, lock_owned, Instruction, RecipeDetail, RecipeRepo};
use crate::db::{bounded, DbError};
use crate::models::{insertion_step, InstructionContents, StepSwap};

impl RecipeRepo<'_> {
    /// Insert an instruction at `step`, or append when the step is absent
    /// or out of range.
    pub async fn add_instruction(
        &self,
        actor_id: i64,
        recipe_id: i64,
        step: Option<i32>,
        contents: InstructionContents,
    ) -> Result<RecipeDetail, DbError> {
        bounded(
            "add_instruction",
            self.timeout,
            self.add_instruction_tx(actor_id, recipe_id, step, contents),
        )
        .await
    }

    async fn add_instruction_tx(
        &self,
        actor_id: i64,
        recipe_id: i64,
        step: Option<i32>,
        contents: InstructionContents,
    ) -> Result<RecipeDetail, DbError> {
        let mut tx = self.pool.begin().await?;
        lock_owned(&mut tx, recipe_id, actor_id).await?;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM instructions WHERE recipe_id = $1")
            .bind(recipe_id)
            .fetch_one(&mut *tx)
            .await?;
        let step = insertion_step(step, count);

        sqlx::query(
            "UPDATE instructions SET step = step + 1 WHERE recipe_id = $1 AND step >= $2",
        )
        .bind(recipe_id)
        .bind(step)
        .execute(&mut *tx)
        .await?;

        let instruction_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO instructions (recipe_id, step, contents)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(recipe_id)
        .bind(step)
        .bind(contents.as_str())
        .fetch_one(&mut *tx)
        .await?;

        touch(&mut tx, recipe_id).await?;
        let detail = load_detail(&mut tx, recipe_id).await?;
        tx.commit().await?;

        tracing::debug!(recipe_id, instruction_id, step, "instruction added");
        Ok(detail)
    }

    /// Replace the text of an instruction. Its step is unchanged.
    pub async fn update_instruction(
        &self,
        actor_id: i64,
        recipe_id: i64,
        instruction_id: i64,
        contents: InstructionContents,
    ) -> Result<RecipeDetail, DbError> {
        bounded(
            "update_instruction",
            self.timeout,
            self.update_instruction_tx(actor_id, recipe_id, instruction_id, contents),
        )
        .await
    }

    async fn update_instruction_tx(
        &self,
        actor_id: i64,
        recipe_id: i64,
        instruction_id: i64,
        contents: InstructionContents,
    ) -> Result<RecipeDetail, DbError> {
        let mut tx = self.pool.begin().await?;
        lock_owned(&mut tx, recipe_id, actor_id).await?;
        lock_instruction(&mut tx, recipe_id, instruction_id).await?;

        sqlx::query("UPDATE instructions SET contents = $2, updated_at = NOW() WHERE id = $1")
            .bind(instruction_id)
            .bind(contents.as_str())
            .execute(&mut *tx)
            .await?;

        touch(&mut tx, recipe_id).await?;
        let detail = load_detail(&mut tx, recipe_id).await?;
        tx.commit().await?;

        tracing::debug!(recipe_id, instruction_id, "instruction updated");
        Ok(detail)
    }

    /// Exchange the steps of two instructions of the same recipe.
    pub async fn swap_instructions(
        &self,
        actor_id: i64,
        recipe_id: i64,
        swap: StepSwap,
    ) -> Result<RecipeDetail, DbError> {
        bounded(
            "swap_instructions",
            self.timeout,
            self.swap_instructions_tx(actor_id, recipe_id, swap),
        )
        .await
    }

    async fn swap_instructions_tx(
        &self,
        actor_id: i64,
        recipe_id: i64,
        swap: StepSwap,
    ) -> Result<RecipeDetail, DbError> {
        let mut tx = self.pool.begin().await?;
        lock_owned(&mut tx, recipe_id, actor_id).await?;

        let rows: Vec<Instruction> = sqlx::query_as(
            r#"
            SELECT id, recipe_id, step, contents
            FROM instructions
            WHERE id = ANY($1)
            FOR UPDATE
            "#,
        )
        .bind(vec![swap.first(), swap.second()])
        .fetch_all(&mut *tx)
        .await?;

        let find = |id: i64| rows.iter().find(|row| row.id == id);
        let (one, two) = match (find(swap.first()), find(swap.second())) {
            (Some(one), Some(two)) => (one, two),
            (None, _) => return Err(DbError::not_found("instruction", swap.first())),
            (_, None) => return Err(DbError::not_found("instruction", swap.second())),
        };
        check_membership("instruction", one.id, Some(one.recipe_id), recipe_id)?;
        check_membership("instruction", two.id, Some(two.recipe_id), recipe_id)?;

        sqlx::query(
            r#"
            UPDATE instructions
            SET step = CASE id WHEN $1 THEN $4 ELSE $3 END,
                updated_at = NOW()
            WHERE id IN ($1, $2)
            "#,
        )
        .bind(one.id)
        .bind(two.id)
        .bind(one.step)
        .bind(two.step)
        .execute(&mut *tx)
        .await?;

        touch(&mut tx, recipe_id).await?;
        let detail = load_detail(&mut tx, recipe_id).await?;
        tx.commit().await?;

        tracing::debug!(
            recipe_id,
            first = swap.first(),
            second = swap.second(),
            "instructions swapped"
        );
        Ok(detail)
    }

    /// Remove an instruction and close the gap it leaves.
    pub async fn delete_instruction(
        &self,
        actor_id: i64,
        recipe_id: i64,
        instruction_id: i64,
    ) -> Result<RecipeDetail, DbError> {
        bounded(
            "delete_instruction",
            self.timeout,
            self.delete_instruction_tx(actor_id, recipe_id, instruction_id),
        )
        .await
    }

    async fn delete_instruction_tx(
        &self,
        actor_id: i64,
        recipe_id: i64,
        instruction_id: i64,
    ) -> Result<RecipeDetail, DbError> {
        let mut tx = self.pool.begin().await?;
        lock_owned(&mut tx, recipe_id, actor_id).await?;
        let removed = lock_instruction(&mut tx, recipe_id, instruction_id).await?;

        sqlx::query("DELETE FROM instructions WHERE id = $1")
            .bind(instruction_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE instructions SET step = step - 1 WHERE recipe_id = $1 AND step > $2")
            .bind(recipe_id)
            .bind(removed.step)
            .execute(&mut *tx)
            .await?;

        touch(&mut tx, recipe_id).await?;
        let detail = load_detail(&mut tx, recipe_id).await?;
        tx.commit().await?;

        tracing::debug!(recipe_id, instruction_id, "instruction deleted");
        Ok(detail)
    }
}

async fn lock_instruction(
    conn: &mut PgConnection,
    recipe_id: i64,
    instruction_id: i64,
) -> Result<Instruction, DbError> {
    let row: Option<Instruction> = sqlx::query_as(
        r#"
        SELECT id, recipe_id, step, contents
        FROM instructions
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(instruction_id)
    .fetch_optional(&mut *conn)
    .await?;

    check_membership("instruction", instruction_id, row.as_ref().map(|i| i.recipe_id), recipe_id)?;
    row.ok_or_else(|| DbError::not_found("instruction", instruction_id))
}
