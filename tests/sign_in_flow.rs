//! End-to-end sign-in flow against an in-memory database.

use anyhow::{anyhow, Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{
        header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
        Request, Response, StatusCode,
    },
    Router,
};
use chrono::Duration;
use credence::{
    api::{self, AuthConfig, AuthState},
    auth::{AntiforgeryGate, Authenticator, CredentialHasher},
    storage::{self, SqliteCredentialStore, SqliteSessionSink},
};
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use tower::ServiceExt;
use url::form_urlencoded;

const PASSWORD: &str = "correct horse battery staple";

struct TestApp {
    router: Router,
    pool: SqlitePool,
}

impl TestApp {
    async fn new() -> Result<Self> {
        Self::with_config(AuthConfig::new()).await
    }

    async fn with_config(config: AuthConfig) -> Result<Self> {
        let pool = storage::connect("sqlite::memory:", 1).await?;
        let authenticator = Authenticator::new(
            SqliteCredentialStore::new(pool.clone()),
            SqliteSessionSink::new(pool.clone()),
            CredentialHasher::new(),
            AntiforgeryGate::new([7u8; 32], Duration::hours(2)),
        );
        let state = Arc::new(AuthState::new(authenticator, config));
        Ok(Self {
            router: api::router(state, pool.clone()),
            pool,
        })
    }

    async fn insert_user(&self, name: &str, email: &str, admin: bool) -> Result<i64> {
        let derived = CredentialHasher::new().derive(PASSWORD, None)?;
        let row = sqlx::query(
            "INSERT INTO users (name, email, phone, password, salt) VALUES (?1, ?2, '555-0100', ?3, ?4) RETURNING id",
        )
        .bind(name)
        .bind(email)
        .bind(derived.hash)
        .bind(derived.salt)
        .fetch_one(&self.pool)
        .await?;
        let id: i64 = row.try_get("id")?;
        if admin {
            sqlx::query("INSERT INTO roleuser (rolesid, usersid) VALUES (1, ?1)")
                .bind(id)
                .execute(&self.pool)
                .await?;
        }
        Ok(id)
    }

    async fn session_count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM sessions")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("count")?)
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> Result<Response<Body>> {
        let mut request = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }
        Ok(self
            .router
            .clone()
            .oneshot(request.body(Body::empty())?)
            .await?)
    }

    async fn post_form(
        &self,
        uri: &str,
        cookie: Option<&str>,
        fields: &[(&str, &str)],
    ) -> Result<Response<Body>> {
        let body = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let mut request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }
        Ok(self
            .router
            .clone()
            .oneshot(request.body(Body::from(body))?)
            .await?)
    }

    /// Render the challenge and return `(cookie header, request token)`.
    async fn challenge(&self, uri: &str) -> Result<(String, String)> {
        let response = self.get(uri, None).await?;
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = cookie_pair(&response, "credence_antiforgery")?;
        let page = body_text(response).await?;
        Ok((cookie, request_token(&page)?))
    }

    /// Sign in and return the session cookie pair.
    async fn sign_in(&self, email: &str) -> Result<String> {
        let (cookie, token) = self.challenge("/users/auth").await?;
        let response = self
            .post_form(
                "/users/auth",
                Some(&cookie),
                &[
                    ("email", email),
                    ("password", PASSWORD),
                    ("antiforgery_token", &token),
                ],
            )
            .await?;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        cookie_pair(&response, "credence_session")
    }
}

fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .map(str::to_string)
        .collect()
}

/// `name=value` from the response's `Set-Cookie` for `name`.
fn cookie_pair(response: &Response<Body>, name: &str) -> Result<String> {
    set_cookies(response)
        .into_iter()
        .find(|cookie| cookie.starts_with(&format!("{name}=")))
        .and_then(|cookie| cookie.split(';').next().map(str::to_string))
        .ok_or_else(|| anyhow!("missing {name} cookie"))
}

fn location(response: &Response<Body>) -> Option<&str> {
    response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
}

async fn body_text(response: Response<Body>) -> Result<String> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(String::from_utf8(bytes.to_vec())?)
}

fn request_token(page: &str) -> Result<String> {
    let marker = r#"name="antiforgery_token" value=""#;
    let start = page.find(marker).context("missing token field")? + marker.len();
    let end = page[start..].find('"').context("unterminated token")?;
    Ok(page[start..start + end].to_string())
}

#[tokio::test]
async fn challenge_sets_strict_antiforgery_cookie() -> Result<()> {
    let app = TestApp::new().await?;
    let response = app.get("/users/auth?returnUrl=/users/me", None).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 1);
    assert!(cookies[0].starts_with("credence_antiforgery="));
    assert!(cookies[0].contains("HttpOnly"));
    assert!(cookies[0].contains("SameSite=Strict"));

    let page = body_text(response).await?;
    assert!(page.contains(r#"action="/users/auth?returnUrl=%2Fusers%2Fme""#));
    assert!(!request_token(&page)?.is_empty());
    Ok(())
}

#[tokio::test]
async fn sign_in_me_and_logout_round_trip() -> Result<()> {
    let app = TestApp::new().await?;
    let id = app.insert_user("Ada", "ada@example.com", false).await?;

    let (cookie, token) = app.challenge("/users/auth?returnUrl=/users/me").await?;
    let response = app
        .post_form(
            "/users/auth?returnUrl=/users/me",
            Some(&cookie),
            &[
                ("email", "  ADA@example.com "),
                ("password", PASSWORD),
                ("antiforgery_token", &token),
            ],
        )
        .await?;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/users/me"));
    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 1);
    assert!(cookies[0].contains("Path=/; HttpOnly; SameSite=Lax; Max-Age=86400"));
    assert!(!cookies[0].contains("Secure"));
    let session = cookie_pair(&response, "credence_session")?;
    assert_eq!(app.session_count().await?, 1);

    let response = app.get("/users/me", Some(&session)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let me: serde_json::Value = serde_json::from_str(&body_text(response).await?)?;
    assert_eq!(me["id"], id);
    assert_eq!(me["name"], "Ada");
    assert_eq!(me["email"], "ada@example.com");
    assert_eq!(me["phone"], "555-0100");
    assert_eq!(me["roles"], serde_json::json!([]));
    assert_eq!(me["is_admin"], false);

    let response = app.get("/", Some(&session)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await?.contains("Hello, Ada"));

    let response = app.get("/users/logout", Some(&session)).await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/"));
    let cleared = set_cookies(&response);
    assert!(cleared
        .iter()
        .any(|cookie| cookie.starts_with("credence_session=;") && cookie.contains("Max-Age=0")));
    assert_eq!(app.session_count().await?, 0);

    let response = app.get("/users/me", Some(&session)).await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    Ok(())
}

#[tokio::test]
async fn secure_cookies_when_configured() -> Result<()> {
    let app = TestApp::with_config(AuthConfig::new().with_cookie_secure(true)).await?;
    app.insert_user("Ada", "ada@example.com", false).await?;

    let response = app.get("/users/auth", None).await?;
    assert!(set_cookies(&response)
        .iter()
        .all(|cookie| cookie.ends_with("; Secure")));

    let (cookie, token) = app.challenge("/users/auth").await?;
    let response = app
        .post_form(
            "/users/auth",
            Some(&cookie),
            &[
                ("email", "ada@example.com"),
                ("password", PASSWORD),
                ("antiforgery_token", &token),
            ],
        )
        .await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(set_cookies(&response)[0].ends_with("; Secure"));
    Ok(())
}

#[tokio::test]
async fn wrong_password_renders_challenge_again() -> Result<()> {
    let app = TestApp::new().await?;
    app.insert_user("Ada", "ada@example.com", false).await?;

    let (cookie, token) = app.challenge("/users/auth").await?;
    let response = app
        .post_form(
            "/users/auth",
            Some(&cookie),
            &[
                ("email", "ada@example.com"),
                ("password", "wrong"),
                ("antiforgery_token", &token),
            ],
        )
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(cookie_pair(&response, "credence_session").is_err());
    // Same browser, same anti-forgery cookie.
    assert_eq!(cookie_pair(&response, "credence_antiforgery")?, cookie);
    let page = body_text(response).await?;
    assert!(page.contains("Invalid email or password."));
    assert!(page.contains(r#"value="ada@example.com""#));
    assert!(!request_token(&page)?.is_empty());
    assert_eq!(app.session_count().await?, 0);
    Ok(())
}

#[tokio::test]
async fn unknown_email_and_wrong_password_look_the_same() -> Result<()> {
    let app = TestApp::new().await?;
    app.insert_user("Ada", "ada@example.com", false).await?;

    let mut pages = Vec::new();
    for (email, password) in [("ada@example.com", "wrong"), ("nobody@example.com", PASSWORD)] {
        let (cookie, token) = app.challenge("/users/auth").await?;
        let response = app
            .post_form(
                "/users/auth",
                Some(&cookie),
                &[
                    ("email", email),
                    ("password", password),
                    ("antiforgery_token", &token),
                ],
            )
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
        let page = body_text(response).await?;
        let token = request_token(&page)?;
        pages.push(page.replace(&token, "TOKEN").replace(email, "EMAIL"));
    }
    assert_eq!(pages[0], pages[1]);
    Ok(())
}

#[tokio::test]
async fn missing_or_mismatched_antiforgery_is_rejected() -> Result<()> {
    let app = TestApp::new().await?;
    app.insert_user("Ada", "ada@example.com", false).await?;

    // No cookie, no token.
    let response = app
        .post_form(
            "/users/auth",
            None,
            &[("email", "ada@example.com"), ("password", PASSWORD)],
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(cookie_pair(&response, "credence_session").is_err());

    // Token minted for another browser's cookie.
    let (_, foreign_token) = app.challenge("/users/auth").await?;
    let (cookie, _) = app.challenge("/users/auth").await?;
    let response = app
        .post_form(
            "/users/auth",
            Some(&cookie),
            &[
                ("email", "ada@example.com"),
                ("password", PASSWORD),
                ("antiforgery_token", &foreign_token),
            ],
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(cookie_pair(&response, "credence_session").is_err());
    assert_eq!(app.session_count().await?, 0);
    Ok(())
}

#[tokio::test]
async fn inactive_account_is_rejected() -> Result<()> {
    let app = TestApp::new().await?;
    let id = app.insert_user("Ada", "ada@example.com", false).await?;
    sqlx::query("UPDATE users SET isactive = 0 WHERE id = ?1")
        .bind(id)
        .execute(&app.pool)
        .await?;

    let (cookie, token) = app.challenge("/users/auth").await?;
    let response = app
        .post_form(
            "/users/auth",
            Some(&cookie),
            &[
                ("email", "ada@example.com"),
                ("password", PASSWORD),
                ("antiforgery_token", &token),
            ],
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await?.contains("Invalid email or password."));
    assert_eq!(app.session_count().await?, 0);
    Ok(())
}

#[tokio::test]
async fn offsite_return_url_falls_back_to_root() -> Result<()> {
    let app = TestApp::new().await?;
    app.insert_user("Ada", "ada@example.com", false).await?;

    for evil in ["https://evil.example/", "//evil.example/", "/\\evil.example"] {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("returnUrl", evil)
            .finish();
        let uri = format!("/users/auth?{query}");
        let (cookie, token) = app.challenge(&uri).await?;
        let response = app
            .post_form(
                &uri,
                Some(&cookie),
                &[
                    ("email", "ada@example.com"),
                    ("password", PASSWORD),
                    ("antiforgery_token", &token),
                ],
            )
            .await?;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), Some("/"), "return url {evil}");
    }
    Ok(())
}

#[tokio::test]
async fn unencodable_return_url_falls_back_to_root() -> Result<()> {
    let app = TestApp::new().await?;
    app.insert_user("Ada", "ada@example.com", false).await?;

    for (target, expected) in [("/café", "/"), ("/caf%C3%A9", "/caf%C3%A9")] {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("returnUrl", target)
            .finish();
        let uri = format!("/users/auth?{query}");
        let (cookie, token) = app.challenge(&uri).await?;
        let response = app
            .post_form(
                &uri,
                Some(&cookie),
                &[
                    ("email", "ada@example.com"),
                    ("password", PASSWORD),
                    ("antiforgery_token", &token),
                ],
            )
            .await?;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), Some(expected), "return url {target}");
    }
    Ok(())
}

#[tokio::test]
async fn out_of_range_antiforgery_timestamp_is_rejected() -> Result<()> {
    let app = TestApp::new().await?;
    app.insert_user("Ada", "ada@example.com", false).await?;

    let (cookie, _) = app.challenge("/users/auth").await?;
    for forged in ["-9223372036854775808.AAAA", "9223372036854775807.AAAA"] {
        let response = app
            .post_form(
                "/users/auth",
                Some(&cookie),
                &[
                    ("email", "ada@example.com"),
                    ("password", PASSWORD),
                    ("antiforgery_token", forged),
                ],
            )
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(cookie_pair(&response, "credence_session").is_err());
    }
    assert_eq!(app.session_count().await?, 0);
    Ok(())
}

#[tokio::test]
async fn dotless_email_domain_signs_in() -> Result<()> {
    let app = TestApp::new().await?;
    app.insert_user("Root", "root@localhost", true).await?;

    let session = app.sign_in("root@localhost").await?;
    let response = app.get("/users/me", Some(&session)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let me: serde_json::Value = serde_json::from_str(&body_text(response).await?)?;
    assert_eq!(me["email"], "root@localhost");
    Ok(())
}

#[tokio::test]
async fn anonymous_root_redirects_to_challenge() -> Result<()> {
    let app = TestApp::new().await?;
    let response = app.get("/", None).await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/users/auth?returnUrl=%2F"));

    let response = app.get("/users/me", None).await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Unknown session tokens count as anonymous.
    let response = app.get("/", Some("credence_session=forged")).await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    Ok(())
}

#[tokio::test]
async fn logout_without_session_still_redirects() -> Result<()> {
    let app = TestApp::new().await?;
    let response = app.get("/users/logout", None).await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/"));
    Ok(())
}

#[tokio::test]
async fn admin_page_is_hidden_from_everyone_else() -> Result<()> {
    let app = TestApp::new().await?;
    app.insert_user("Ada", "ada@example.com", false).await?;
    app.insert_user("Grace", "grace@example.com", true).await?;

    let response = app.get("/admin", None).await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let user = app.sign_in("ada@example.com").await?;
    let response = app.get("/admin", Some(&user)).await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let admin = app.sign_in("grace@example.com").await?;
    let response = app.get("/admin", Some(&admin)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await?.contains("<li>Admin</li>"));

    let response = app.get("/users/me", Some(&admin)).await?;
    let me: serde_json::Value = serde_json::from_str(&body_text(response).await?)?;
    assert_eq!(me["is_admin"], true);
    assert_eq!(me["roles"], serde_json::json!(["Admin"]));
    Ok(())
}

#[tokio::test]
async fn health_and_openapi_are_public() -> Result<()> {
    let app = TestApp::new().await?;

    let response = app.get("/health", None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let health: serde_json::Value = serde_json::from_str(&body_text(response).await?)?;
    assert_eq!(health["name"], "credence");
    assert_eq!(health["database"], "ok");

    let response = app.get("/openapi.json", None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let doc: serde_json::Value = serde_json::from_str(&body_text(response).await?)?;
    assert!(doc["paths"]["/users/auth"]["post"].is_object());
    Ok(())
}
