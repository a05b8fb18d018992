//! Session resolution and authorization helpers.
//!
//! Flow Overview: read the session cookie, resolve it through the
//! authenticator (expired sessions resolve to nothing), and hand the principal
//! to the handler. Admin-only resources answer 404 to everyone else so their
//! existence is not revealed.

use axum::http::{HeaderMap, StatusCode};
use tracing::{debug, error};

use super::{cookies::extract_session_token, state::AuthState};
use crate::auth::{is_admin, ClaimSet};

/// Resolve the session cookie into a principal, if there is a live session.
pub(crate) async fn current_principal(
    headers: &HeaderMap,
    state: &AuthState,
) -> Result<Option<ClaimSet>, StatusCode> {
    let Some(token) = extract_session_token(headers) else {
        return Ok(None);
    };
    match state.authenticator().resolve(&token).await {
        Ok(session) => Ok(session.map(|session| session.principal)),
        Err(err) => {
            error!("Failed to resolve session: {err}");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Resolve a principal or return 401 for missing sessions.
pub async fn require_auth(headers: &HeaderMap, state: &AuthState) -> Result<ClaimSet, StatusCode> {
    current_principal(headers, state)
        .await?
        .ok_or(StatusCode::UNAUTHORIZED)
}

/// Resolve an admin principal; anything else is 404.
pub async fn require_admin(headers: &HeaderMap, state: &AuthState) -> Result<ClaimSet, StatusCode> {
    match require_auth(headers, state).await {
        Ok(principal) if is_admin(&principal) => Ok(principal),
        Ok(principal) => {
            debug!(user_id = principal.user_id(), "admin resource denied");
            Err(StatusCode::NOT_FOUND)
        }
        Err(StatusCode::UNAUTHORIZED) => Err(StatusCode::NOT_FOUND),
        Err(status) => Err(status),
    }
}
