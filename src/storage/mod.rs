//! SQLite-backed collaborators for the auth kernel.
//!
//! The schema mirrors the application's `users`, `roles` and `roleuser` tables
//! and adds a `sessions` table keyed by the SHA-256 of the session token.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::time::Duration;
use tracing::debug;

mod credentials;
mod sessions;

pub use credentials::SqliteCredentialStore;
pub use sessions::SqliteSessionSink;

pub const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

/// Open a pool for `dsn` and make sure the schema exists.
///
/// In-memory databases live per connection, so `sqlite::memory:` callers should
/// pass `max_connections = 1`.
///
/// # Errors
/// Returns an error if the database cannot be opened or the schema fails to apply.
pub async fn connect(dsn: &str, max_connections: u32) -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .min_connections(1)
        .max_connections(max_connections)
        .idle_timeout(None)
        .max_lifetime(None)
        .acquire_timeout(Duration::from_secs(5))
        .connect(dsn)
        .await
        .context("Failed to connect to database")?;

    apply_schema(&pool).await?;

    Ok(pool)
}

/// Apply the bundled schema; every statement is idempotent.
///
/// # Errors
/// Returns an error if any statement fails.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::raw_sql(SCHEMA_SQL)
        .execute(pool)
        .await
        .context("failed to apply schema")?;
    debug!("schema applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Row;

    #[tokio::test]
    async fn connect_applies_schema_and_seeds_admin_role() -> Result<()> {
        let pool = connect("sqlite::memory:", 1).await?;
        let row = sqlx::query("SELECT name FROM roles WHERE id = 1")
            .fetch_one(&pool)
            .await?;
        let name: String = row.try_get("name")?;
        assert_eq!(name, "Admin");

        // Re-applying is harmless.
        apply_schema(&pool).await?;
        Ok(())
    }

    #[tokio::test]
    async fn schema_rejects_hash_without_salt() -> Result<()> {
        let pool = connect("sqlite::memory:", 1).await?;
        let result = sqlx::query("INSERT INTO users (name, email, password) VALUES ('x', 'x@x.com', 'h')")
            .execute(&pool)
            .await;
        assert!(result.is_err());
        Ok(())
    }
}
