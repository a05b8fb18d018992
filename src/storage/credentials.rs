//! Credential and role lookups.

use anyhow::{Context, Result};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::Instrument;

use crate::auth::{CredentialRecord, CredentialStore, Role};

#[derive(Clone, Debug)]
pub struct SqliteCredentialStore {
    pool: SqlitePool,
}

impl SqliteCredentialStore {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl CredentialStore for SqliteCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<CredentialRecord>> {
        let query = r"
            SELECT id, name, phone, email, password, salt, isactive
            FROM users
            WHERE email = ?1 COLLATE NOCASE
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "sqlite",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup credential record")?;

        row.map(|row| credential_from_row(&row)).transpose()
    }

    async fn find_roles_for_user(&self, user_id: i64) -> Result<Vec<Role>> {
        let query = r"
            SELECT r.id, r.name
            FROM roleuser ru
            JOIN roles r ON r.id = ru.rolesid
            WHERE ru.usersid = ?1
            ORDER BY r.id
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "sqlite",
            db.operation = "SELECT",
            db.statement = query
        );
        let rows = sqlx::query(query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup roles")?;

        rows.iter()
            .map(|row| -> Result<Role> {
                Ok(Role {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                })
            })
            .collect()
    }
}

fn credential_from_row(row: &SqliteRow) -> Result<CredentialRecord> {
    Ok(CredentialRecord {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        phone: row.try_get("phone")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password")?,
        salt: row.try_get("salt")?,
        is_active: row.try_get("isactive")?,
    })
}
