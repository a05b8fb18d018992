//! Server-side session rows keyed by token hash.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::Instrument;

use crate::auth::{
    session::{generate_session_token, hash_session_token},
    ClaimSet, Session, SessionSink,
};

#[derive(Clone, Debug)]
pub struct SqliteSessionSink {
    pool: SqlitePool,
}

impl SqliteSessionSink {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Delete sessions whose expiry has passed. Returns the number removed.
    ///
    /// # Errors
    /// Returns an error if the delete fails.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let query = "DELETE FROM sessions WHERE expires_at <= ?1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "sqlite",
            db.operation = "DELETE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(now.timestamp())
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to purge expired sessions")?;
        Ok(result.rows_affected())
    }
}

impl SessionSink for SqliteSessionSink {
    async fn establish(
        &self,
        principal: &ClaimSet,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<String> {
        let user_id = principal
            .user_id()
            .context("principal is missing its id claim")?;
        let principal_json =
            serde_json::to_string(principal).context("failed to encode principal")?;

        // Expired rows are never read again; drop them while we are writing anyway.
        self.purge_expired(issued_at).await?;

        let token = generate_session_token()?;
        let token_hash = hash_session_token(&token);

        let query = r"
            INSERT INTO sessions (token_hash, user_id, principal, issued_at, expires_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "sqlite",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(token_hash)
            .bind(user_id)
            .bind(principal_json)
            .bind(issued_at.timestamp())
            .bind(expires_at.timestamp())
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to insert session")?;

        Ok(token)
    }

    async fn revoke(&self, token: &str) -> Result<()> {
        let query = "DELETE FROM sessions WHERE token_hash = ?1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "sqlite",
            db.operation = "DELETE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(hash_session_token(token))
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete session")?;
        Ok(())
    }

    async fn resolve(&self, token: &str) -> Result<Option<Session>> {
        let query = r"
            SELECT principal, issued_at, expires_at
            FROM sessions
            WHERE token_hash = ?1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "sqlite",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(hash_session_token(token))
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup session")?;

        let Some(row) = row else {
            return Ok(None);
        };
        let principal: String = row.try_get("principal")?;
        let principal: ClaimSet =
            serde_json::from_str(&principal).context("stored principal is not valid JSON")?;
        Ok(Some(Session {
            principal,
            issued_at: from_unix(row.try_get("issued_at")?)?,
            expires_at: from_unix(row.try_get("expires_at")?)?,
        }))
    }
}

fn from_unix(seconds: i64) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(seconds, 0)
        .ok_or_else(|| anyhow!("timestamp out of range: {seconds}"))
}
