//! Sessions and the sink that persists them.
//!
//! Security boundaries: the raw session token only ever lives in the cookie.
//! Sinks key sessions by [`hash_session_token`], so a leaked table cannot be
//! replayed as cookies.

use anyhow::{Context, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use std::future::Future;

use super::claims::ClaimSet;

/// Absolute session lifetime in seconds. Sessions never slide.
pub const SESSION_TTL_SECONDS: i64 = 24 * 60 * 60;

#[must_use]
pub fn session_ttl() -> Duration {
    Duration::seconds(SESSION_TTL_SECONDS)
}

/// A stored session as seen by a consumer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub principal: ClaimSet,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Result of establishing a session: the raw token for the cookie and its window.
#[derive(Clone, Debug)]
pub struct IssuedSession {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl IssuedSession {
    /// Cookie `Max-Age` matching the session expiry.
    #[must_use]
    pub fn max_age_seconds(&self) -> i64 {
        (self.expires_at - self.issued_at).num_seconds()
    }
}

pub trait SessionSink: Send + Sync {
    /// Persist `principal` and return the opaque token that identifies it.
    fn establish(
        &self,
        principal: &ClaimSet,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Forget the session behind `token`. Unknown tokens are not an error.
    fn revoke(&self, token: &str) -> impl Future<Output = Result<()>> + Send;

    /// Load the session behind `token` without judging its expiry.
    fn resolve(&self, token: &str) -> impl Future<Output = Result<Option<Session>>> + Send;
}

/// Create a new session token for the auth cookie.
///
/// # Errors
/// Returns an error if the OS random source fails.
pub fn generate_session_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate session token")?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

/// Hash a session token so raw values never touch the database.
#[must_use]
pub fn hash_session_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}
