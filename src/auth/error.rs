//! Error taxonomy for the credential and session kernel.
//!
//! [`Rejection`] covers every user-facing failure. All of them collapse to the
//! same external outcome: the challenge page is shown again with a fresh
//! anti-forgery pair. [`AuthError`] covers internal failures that surface as a
//! server error and are never shown to the user.

use thiserror::Error;

/// Why a sign-in attempt was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("anti-forgery token missing or invalid")]
    ForgeryTokenInvalid,
    #[error("no credential record for the submitted email")]
    LookupMiss,
    #[error("password verification failed")]
    VerificationFailure,
    #[error("account is not active")]
    InactiveAccount,
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// Stored credential data that cannot be parsed (bad base64, wrong salt length,
    /// hash without salt). The kernel performs no repair.
    #[error("malformed stored credential: {0}")]
    MalformedInput(String),
    #[error("credential store failure: {0:#}")]
    Store(anyhow::Error),
    #[error("session store failure: {0:#}")]
    Session(anyhow::Error),
    #[error("secure random source unavailable: {0}")]
    Entropy(#[from] rand::Error),
}
