//! Credential challenge, sign-in and sign-out endpoints.
//!
//! Flow Overview:
//! 1) `GET /users/auth` issues an anti-forgery pair: the cookie token goes into
//!    `credence_antiforgery`, the request token into the rendered form.
//! 2) `POST /users/auth` hands the form and both tokens to the authenticator.
//!    Success sets `credence_session` and redirects (303) to the sanitized
//!    `returnUrl`; every rejection renders the same challenge page again.
//! 3) `GET /users/logout` revokes the session, clears the cookie and always
//!    redirects to `/`.

use axum::{
    extract::{Extension, Form, Query},
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
};
use secrecy::SecretString;
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

use super::{
    cookies::{
        antiforgery_cookie, clear_session_cookie, extract_antiforgery_token,
        extract_session_token, session_cookie,
    },
    state::AuthState,
};
use crate::{
    api::pages,
    auth::{SignInOutcome, SignInRequest, TokenPair},
};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReturnQuery {
    /// Local path to continue to after signing in.
    #[serde(rename = "returnUrl")]
    pub return_url: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct SignInForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    #[schema(format = Password)]
    pub password: String,
    pub antiforgery_token: Option<String>,
}

impl std::fmt::Debug for SignInForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignInForm")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

#[utoipa::path(
    get,
    path = "/users/auth",
    params(ReturnQuery),
    responses(
        (status = 200, description = "Credential form with a fresh anti-forgery token", content_type = "text/html", body = String),
        (status = 500, description = "Token generation failed")
    ),
    tag = "auth"
)]
pub async fn sign_in_form(
    headers: HeaderMap,
    Query(query): Query<ReturnQuery>,
    Extension(state): Extension<Arc<AuthState>>,
) -> Response {
    let existing = extract_antiforgery_token(&headers);
    match state.authenticator().challenge(existing.as_deref()) {
        Ok(pair) => challenge_response(
            &state,
            &pair,
            pages::Challenge {
                request_token: &pair.request_token,
                return_url: query.return_url.as_deref(),
                ..pages::Challenge::default()
            },
        ),
        Err(err) => {
            error!("Failed to issue anti-forgery token: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/users/auth",
    params(ReturnQuery),
    request_body(content = SignInForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Signed in; session cookie set, redirect to the return URL"),
        (status = 200, description = "Rejected; challenge rendered again", content_type = "text/html", body = String),
        (status = 500, description = "Internal failure")
    ),
    tag = "auth"
)]
pub async fn sign_in(
    headers: HeaderMap,
    Query(query): Query<ReturnQuery>,
    Extension(state): Extension<Arc<AuthState>>,
    Form(form): Form<SignInForm>,
) -> Response {
    let cookie_token = extract_antiforgery_token(&headers);
    let password = SecretString::from(form.password);
    let request = SignInRequest {
        email: &form.email,
        password: &password,
        return_url: query.return_url.as_deref(),
        cookie_token: cookie_token.as_deref(),
        request_token: form.antiforgery_token.as_deref(),
    };

    match state.authenticator().sign_in(request).await {
        Ok(SignInOutcome::Authenticated {
            session,
            redirect_to,
            ..
        }) => {
            let cookie =
                match session_cookie(state.config(), &session.token, session.max_age_seconds()) {
                    Ok(cookie) => cookie,
                    Err(err) => {
                        error!("Failed to build session cookie: {err}");
                        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
                    }
                };
            let mut response_headers = HeaderMap::new();
            response_headers.insert(SET_COOKIE, cookie);
            (response_headers, Redirect::to(&redirect_to)).into_response()
        }
        Ok(SignInOutcome::Rejected { challenge, .. }) => challenge_response(
            &state,
            &challenge,
            pages::Challenge {
                request_token: &challenge.request_token,
                return_url: query.return_url.as_deref(),
                email: Some(form.email.trim()),
                failed: true,
            },
        ),
        Err(err) => {
            error!("Failed to sign in: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/users/logout",
    responses(
        (status = 303, description = "Session cleared; redirect to /")
    ),
    tag = "auth"
)]
pub async fn logout(
    headers: HeaderMap,
    Extension(state): Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let token = extract_session_token(&headers);
    let sign_out = state.authenticator().sign_out(token.as_deref()).await;

    // Always clear the cookie, even if the session record was missing.
    let mut response_headers = HeaderMap::new();
    match clear_session_cookie(state.config()) {
        Ok(cookie) => {
            response_headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => error!("Failed to build session cookie: {err}"),
    }
    (response_headers, Redirect::to(&sign_out.redirect_to))
}

fn challenge_response(state: &AuthState, pair: &TokenPair, view: pages::Challenge<'_>) -> Response {
    let cookie = match antiforgery_cookie(state.config(), &pair.cookie_token) {
        Ok(cookie) => cookie,
        Err(err) => {
            error!("Failed to build anti-forgery cookie: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    let mut response_headers = HeaderMap::new();
    response_headers.insert(SET_COOKIE, cookie);
    (StatusCode::OK, response_headers, Html(pages::challenge(&view))).into_response()
}
