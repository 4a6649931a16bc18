//! Schema migrations
//!
//! Idempotent `CREATE ... IF NOT EXISTS` statements applied in order at
//! startup (and by `recipebox migrate`).

use sqlx::PgPool;

use super::DbError;

/// Ordered schema statements.
const MIGRATIONS: &[(&str, &str)] = &[
    (
        "users",
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id BIGSERIAL PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            salt TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "sessions",
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            token TEXT NOT NULL UNIQUE,
            expires_at TIMESTAMPTZ NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "sessions_expires_at_idx",
        "CREATE INDEX IF NOT EXISTS sessions_expires_at_idx ON sessions (expires_at)",
    ),
    (
        "recipes",
        r#"
        CREATE TABLE IF NOT EXISTS recipes (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            name TEXT NOT NULL CHECK (name <> ''),
            description TEXT NOT NULL DEFAULT '',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "recipes_user_id_idx",
        "CREATE INDEX IF NOT EXISTS recipes_user_id_idx ON recipes (user_id, created_at DESC)",
    ),
    (
        "ingredients",
        r#"
        CREATE TABLE IF NOT EXISTS ingredients (
            id BIGSERIAL PRIMARY KEY,
            recipe_id BIGINT NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            quantity TEXT NOT NULL DEFAULT '',
            unit TEXT NOT NULL DEFAULT '',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "ingredients_recipe_id_idx",
        "CREATE INDEX IF NOT EXISTS ingredients_recipe_id_idx ON ingredients (recipe_id)",
    ),
    (
        // Steps are renumbered inside transactions; the uniqueness check
        // runs at commit so intermediate states may collide.
        "instructions",
        r#"
        CREATE TABLE IF NOT EXISTS instructions (
            id BIGSERIAL PRIMARY KEY,
            recipe_id BIGINT NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
            step INTEGER NOT NULL CHECK (step > 0),
            contents TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            CONSTRAINT instructions_recipe_step_key
                UNIQUE (recipe_id, step) DEFERRABLE INITIALLY DEFERRED
        )
        "#,
    ),
    (
        "tags",
        r#"
        CREATE TABLE IF NOT EXISTS tags (
            id BIGSERIAL PRIMARY KEY,
            tag TEXT NOT NULL UNIQUE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "recipe_tags",
        r#"
        CREATE TABLE IF NOT EXISTS recipe_tags (
            recipe_id BIGINT NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
            tag_id BIGINT NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            PRIMARY KEY (recipe_id, tag_id)
        )
        "#,
    ),
    (
        "recipe_tags_tag_id_idx",
        "CREATE INDEX IF NOT EXISTS recipe_tags_tag_id_idx ON recipe_tags (tag_id)",
    ),
    (
        "files",
        r#"
        CREATE TABLE IF NOT EXISTS files (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            name TEXT NOT NULL UNIQUE,
            url TEXT NOT NULL,
            url_expiry TIMESTAMPTZ NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
];

/// Advisory lock key held while migrating; concurrent `IF NOT EXISTS`
/// DDL can otherwise race on the catalog.
const MIGRATION_LOCK_KEY: i64 = 0x7265_6369_7065;

/// Apply all migrations in one transaction.
pub async fn run(pool: &PgPool) -> Result<(), DbError> {
    tracing::info!(count = MIGRATIONS.len(), "running schema migrations");

    let mut tx = pool.begin().await?;
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(MIGRATION_LOCK_KEY)
        .execute(&mut *tx)
        .await?;

    for (name, sql) in MIGRATIONS {
        tracing::debug!(migration = name, "applying");
        sqlx::query(sql).execute(&mut *tx).await?;
    }
    tx.commit().await?;

    tracing::info!("schema migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migration_names_are_unique() {
        let mut names: Vec<_> = MIGRATIONS.iter().map(|(n, _)| *n).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), MIGRATIONS.len());
    }

    #[test]
    fn tables_precede_their_dependents() {
        let position = |name: &str| {
            MIGRATIONS
                .iter()
                .position(|(n, _)| *n == name)
                .unwrap_or_else(|| panic!("missing migration {name}"))
        };
        assert!(position("users") < position("sessions"));
        assert!(position("users") < position("recipes"));
        assert!(position("recipes") < position("ingredients"));
        assert!(position("recipes") < position("instructions"));
        assert!(position("tags") < position("recipe_tags"));
        assert!(position("users") < position("files"));
    }
}
