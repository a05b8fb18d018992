//! Shared handler state: the authenticator wired to SQLite plus cookie settings.

use crate::{
    auth::Authenticator,
    storage::{SqliteCredentialStore, SqliteSessionSink},
};

pub type SqliteAuthenticator = Authenticator<SqliteCredentialStore, SqliteSessionSink>;

#[derive(Clone, Debug, Default)]
pub struct AuthConfig {
    cookie_secure: bool,
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark cookies `Secure`; only do this when the site is served over HTTPS.
    #[must_use]
    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.cookie_secure
    }
}

pub struct AuthState {
    authenticator: SqliteAuthenticator,
    config: AuthConfig,
}

impl AuthState {
    #[must_use]
    pub fn new(authenticator: SqliteAuthenticator, config: AuthConfig) -> Self {
        Self {
            authenticator,
            config,
        }
    }

    #[must_use]
    pub fn authenticator(&self) -> &SqliteAuthenticator {
        &self.authenticator
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }
}
