//! # Credence (cookie session authentication)
//!
//! `credence` authenticates users against stored salted-hash credentials,
//! issues a cookie-backed session carrying role claims, and authorizes later
//! requests by role membership.
//!
//! ## Credentials
//!
//! Passwords are stretched with PBKDF2 (HMAC-SHA1, 10,000 iterations) over a
//! 128-bit random salt into a 256-bit key. Both salt and key are stored as
//! base64, so rows written by earlier deployments keep verifying.
//!
//! ## Sessions
//!
//! A successful sign-in projects the user and their roles into a [`auth::ClaimSet`]
//! and stores it server-side behind an opaque cookie token. Only the SHA-256 of
//! the token is persisted. Sessions expire 24 hours after issuance; expiry is
//! checked lazily on every request, there is no eviction timer.
//!
//! ## Anti-forgery
//!
//! The credential form carries a request token that must match the
//! anti-forgery cookie before any credential lookup happens.
//!
//! ## Authorization
//!
//! Role id `1` is reserved for administrators. Non-admin access to admin pages
//! returns `404 Not Found` rather than `403 Forbidden` to avoid advertising
//! which pages exist.

pub mod api;
pub mod auth;
pub mod cli;
pub mod storage;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
