//! Sign-in orchestration.
//!
//! Flow Overview:
//! 1) `challenge` hands out an anti-forgery pair for the credential form.
//! 2) `sign_in` checks the pair first, then looks the email up, verifies the
//!    password, loads roles, projects claims and establishes a 24 hour session.
//!    Every rejection re-issues a pair so the form can be shown again.
//! 3) `sign_out` revokes whatever session the caller presents and always
//!    redirects to the application root.
//!
//! Security boundaries: lookup misses, inactive accounts and wrong passwords
//! produce the same outcome shape, so callers cannot tell whether an email
//! exists. No session is written until every check has passed.

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, error, info, instrument, warn};

use super::{
    antiforgery::{AntiforgeryGate, TokenPair},
    claims::{project, ClaimSet, VerifiedIdentity},
    error::{AuthError, Rejection},
    hasher::CredentialHasher,
    redirect::{safe_return_url, APPLICATION_ROOT},
    session::{session_ttl, IssuedSession, Session, SessionSink},
    store::CredentialStore,
    utils::{normalize_email, valid_email},
};

/// A submitted credential form.
#[derive(Debug)]
pub struct SignInRequest<'a> {
    pub email: &'a str,
    pub password: &'a SecretString,
    pub return_url: Option<&'a str>,
    /// Token from the anti-forgery cookie.
    pub cookie_token: Option<&'a str>,
    /// Token posted with the form.
    pub request_token: Option<&'a str>,
}

#[derive(Debug)]
pub enum SignInOutcome {
    Authenticated {
        session: IssuedSession,
        principal: ClaimSet,
        redirect_to: String,
    },
    /// Show the challenge again with `challenge`.
    Rejected {
        reason: Rejection,
        challenge: TokenPair,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignOut {
    pub redirect_to: String,
}

pub struct Authenticator<S, K> {
    store: S,
    sessions: K,
    hasher: CredentialHasher,
    gate: AntiforgeryGate,
}

impl<S, K> Authenticator<S, K>
where
    S: CredentialStore,
    K: SessionSink,
{
    pub fn new(store: S, sessions: K, hasher: CredentialHasher, gate: AntiforgeryGate) -> Self {
        Self {
            store,
            sessions,
            hasher,
            gate,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn sessions(&self) -> &K {
        &self.sessions
    }

    pub fn gate(&self) -> &AntiforgeryGate {
        &self.gate
    }

    /// Issue the anti-forgery pair for a credential form.
    ///
    /// # Errors
    /// Returns `AuthError::Entropy` if the OS random source fails.
    #[instrument(skip_all)]
    pub fn challenge(&self, existing_cookie: Option<&str>) -> Result<TokenPair, AuthError> {
        self.gate.issue_for(existing_cookie)
    }

    /// Attempt a sign-in.
    ///
    /// # Errors
    /// Returns an `AuthError` for internal failures only (unreadable stored
    /// credentials, store or session sink failures). User-facing failures are
    /// reported as `SignInOutcome::Rejected`.
    #[instrument(skip_all, fields(return_url = request.return_url))]
    pub async fn sign_in(&self, request: SignInRequest<'_>) -> Result<SignInOutcome, AuthError> {
        // Cheapest check first; nothing touches the store without a valid pair.
        let forgery_ok = match (request.cookie_token, request.request_token) {
            (Some(cookie_token), Some(request_token)) => {
                self.gate.validate(cookie_token, request_token)
            }
            _ => false,
        };
        if !forgery_ok {
            return self.reject(Rejection::ForgeryTokenInvalid, request.cookie_token);
        }

        let email = normalize_email(request.email);
        if !valid_email(&email) {
            debug!("submitted email is not well formed");
            return self.reject(Rejection::LookupMiss, request.cookie_token);
        }

        let Some(record) = self
            .store
            .find_by_email(&email)
            .await
            .map_err(AuthError::Store)?
        else {
            return self.reject(Rejection::LookupMiss, request.cookie_token);
        };

        if !record.is_active {
            debug!(user_id = record.id, "inactive account");
            return self.reject(Rejection::InactiveAccount, request.cookie_token);
        }

        let Some((hash, salt)) = record.credentials()? else {
            debug!(user_id = record.id, "account has no password");
            return self.reject(Rejection::VerificationFailure, request.cookie_token);
        };
        if !self
            .hasher
            .verify(request.password.expose_secret(), hash, salt)?
        {
            return self.reject(Rejection::VerificationFailure, request.cookie_token);
        }

        let roles = self
            .store
            .find_roles_for_user(record.id)
            .await
            .map_err(AuthError::Store)?;
        let identity = VerifiedIdentity {
            id: record.id,
            name: record.name,
            email: record.email,
            phone: record.phone,
            roles,
        };
        let principal = project(&identity);

        let issued_at = Utc::now();
        let expires_at = issued_at + session_ttl();
        let token = self
            .sessions
            .establish(&principal, issued_at, expires_at)
            .await
            .map_err(AuthError::Session)?;

        let redirect_to = safe_return_url(request.return_url);
        if request.return_url.is_some_and(|url| url != redirect_to) {
            warn!(user_id = identity.id, "unsafe return url replaced with application root");
        }
        info!(user_id = identity.id, "signed in");

        Ok(SignInOutcome::Authenticated {
            session: IssuedSession {
                token,
                issued_at,
                expires_at,
            },
            principal,
            redirect_to,
        })
    }

    /// Revoke the presented session, if any. Never fails: revocation errors are
    /// logged and the caller is still sent to the application root.
    #[instrument(skip_all)]
    pub async fn sign_out(&self, token: Option<&str>) -> SignOut {
        match token {
            Some(token) => {
                if let Err(err) = self.sessions.revoke(token).await {
                    error!("Failed to revoke session: {err:#}");
                } else {
                    info!("signed out");
                }
            }
            None => debug!("sign-out without a session"),
        }
        SignOut {
            redirect_to: APPLICATION_ROOT.to_string(),
        }
    }

    /// Resolve a session token into a live session; expired sessions resolve to `None`.
    ///
    /// # Errors
    /// Returns `AuthError::Session` if the session sink fails.
    pub async fn resolve(&self, token: &str) -> Result<Option<Session>, AuthError> {
        let session = self
            .sessions
            .resolve(token)
            .await
            .map_err(AuthError::Session)?;
        Ok(session.filter(|session| {
            let active = session.is_active_at(Utc::now());
            if !active {
                debug!(expired_at = %session.expires_at, "session expired");
            }
            active
        }))
    }

    fn reject(
        &self,
        reason: Rejection,
        cookie_token: Option<&str>,
    ) -> Result<SignInOutcome, AuthError> {
        warn!(%reason, "sign-in rejected");
        let challenge = self.gate.issue_for(cookie_token)?;
        Ok(SignInOutcome::Rejected { reason, challenge })
    }
}
