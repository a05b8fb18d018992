//! Anti-forgery token pairs for the credential form.
//!
//! Flow Overview:
//! - Rendering the form issues a pair: a random cookie token (set as a cookie)
//!   and a request token embedded in the form.
//! - The request token is `<issued>.<mac>` where `mac` is HMAC-SHA256 over the
//!   cookie token and the issue time, keyed with a server secret.
//! - A submission is accepted only if the posted request token was minted for
//!   the presented cookie token and is still inside the validity window.

use anyhow::{anyhow, Context, Result};
use base64ct::{Base64, Base64UrlUnpadded, Encoding};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use tracing::debug;

use super::error::AuthError;

type HmacSha256 = Hmac<Sha256>;

pub const KEY_LEN: usize = 32;
const COOKIE_TOKEN_LEN: usize = 32;
pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 2 * 60 * 60;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenPair {
    /// Goes into the anti-forgery cookie.
    pub cookie_token: String,
    /// Goes into the rendered form.
    pub request_token: String,
}

#[derive(Clone)]
pub struct AntiforgeryGate {
    key: [u8; KEY_LEN],
    ttl: Duration,
}

impl std::fmt::Debug for AntiforgeryGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AntiforgeryGate")
            .field("key", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl AntiforgeryGate {
    #[must_use]
    pub fn new(key: [u8; KEY_LEN], ttl: Duration) -> Self {
        Self { key, ttl }
    }

    /// Gate with a random key; tokens do not survive a restart.
    ///
    /// # Errors
    /// Returns `AuthError::Entropy` if the OS random source fails.
    pub fn generate(ttl: Duration) -> Result<Self, AuthError> {
        let mut key = [0u8; KEY_LEN];
        OsRng.try_fill_bytes(&mut key)?;
        Ok(Self::new(key, ttl))
    }

    /// Gate keyed by a base64-encoded 32-byte secret.
    ///
    /// # Errors
    /// Returns an error if the secret is not base64 or has the wrong length.
    pub fn from_base64_key(key: &SecretString, ttl: Duration) -> Result<Self> {
        let bytes = Base64::decode_vec(key.expose_secret().trim())
            .map_err(|err| anyhow!("anti-forgery key is not valid base64: {err}"))?;
        let key = <[u8; KEY_LEN]>::try_from(bytes.as_slice())
            .with_context(|| format!("anti-forgery key must be {KEY_LEN} bytes"))?;
        Ok(Self::new(key, ttl))
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a pair with a fresh cookie token.
    ///
    /// # Errors
    /// Returns `AuthError::Entropy` if the OS random source fails.
    pub fn issue(&self) -> Result<TokenPair, AuthError> {
        self.issue_at(None, Utc::now())
    }

    /// Issue a pair bound to `existing_cookie` when it is well formed.
    ///
    /// # Errors
    /// Returns `AuthError::Entropy` if a new cookie token is needed and the OS
    /// random source fails.
    pub fn issue_for(&self, existing_cookie: Option<&str>) -> Result<TokenPair, AuthError> {
        self.issue_at(existing_cookie, Utc::now())
    }

    pub(crate) fn issue_at(
        &self,
        existing_cookie: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<TokenPair, AuthError> {
        let cookie_token = match existing_cookie.filter(|token| well_formed_cookie_token(token)) {
            Some(token) => token.to_string(),
            None => {
                let mut bytes = [0u8; COOKIE_TOKEN_LEN];
                OsRng.try_fill_bytes(&mut bytes)?;
                Base64UrlUnpadded::encode_string(&bytes)
            }
        };
        let issued = now.timestamp();
        let mac = self
            .mac(&cookie_token, issued)
            .ok_or_else(|| AuthError::MalformedInput("anti-forgery key rejected".to_string()))?;
        let tag = Base64UrlUnpadded::encode_string(&mac.finalize().into_bytes());
        Ok(TokenPair {
            request_token: format!("{issued}.{tag}"),
            cookie_token,
        })
    }

    /// Check that `request_token` was issued for `cookie_token` and has not expired.
    #[must_use]
    pub fn validate(&self, cookie_token: &str, request_token: &str) -> bool {
        self.validate_at(cookie_token, request_token, Utc::now())
    }

    pub(crate) fn validate_at(
        &self,
        cookie_token: &str,
        request_token: &str,
        now: DateTime<Utc>,
    ) -> bool {
        if !well_formed_cookie_token(cookie_token) {
            debug!("anti-forgery cookie token malformed");
            return false;
        }
        let Some((issued, tag)) = request_token.split_once('.') else {
            debug!("anti-forgery request token malformed");
            return false;
        };
        let Ok(issued) = issued.parse::<i64>() else {
            return false;
        };
        let Ok(tag) = Base64UrlUnpadded::decode_vec(tag) else {
            return false;
        };

        let Some(age) = now.timestamp().checked_sub(issued) else {
            debug!("anti-forgery request token timestamp out of range");
            return false;
        };
        if age < 0 || age >= self.ttl.num_seconds() {
            debug!(age, "anti-forgery request token outside validity window");
            return false;
        }

        self.mac(cookie_token, issued)
            .is_some_and(|mac| mac.verify_slice(&tag).is_ok())
    }

    fn mac(&self, cookie_token: &str, issued: i64) -> Option<HmacSha256> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.key).ok()?;
        mac.update(cookie_token.as_bytes());
        mac.update(b".");
        mac.update(issued.to_string().as_bytes());
        Some(mac)
    }
}

fn well_formed_cookie_token(token: &str) -> bool {
    Base64UrlUnpadded::decode_vec(token).is_ok_and(|bytes| bytes.len() == COOKIE_TOKEN_LEN)
}
