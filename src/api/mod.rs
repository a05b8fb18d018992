//! HTTP surface: the credential form, cookie sessions and the pages they protect.

use anyhow::Result;
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    routing::get,
    Extension, Router,
};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{error, info, info_span, Span};
use ulid::Ulid;

use crate::{
    auth::{AntiforgeryGate, Authenticator, CredentialHasher},
    storage::{SqliteCredentialStore, SqliteSessionSink},
};

pub(crate) mod handlers;
mod openapi;
mod pages;

pub use handlers::state::{AuthConfig, AuthState, SqliteAuthenticator};
pub use openapi::openapi;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Build the application router around `state`.
#[must_use]
pub fn router(state: Arc<AuthState>, pool: SqlitePool) -> Router {
    use handlers::{admin, health, me, root, users};

    Router::new()
        .route("/", get(root::root))
        .route("/admin", get(admin::admin))
        .route(
            "/users/auth",
            get(users::sign_in_form).post(users::sign_in),
        )
        .route("/users/logout", get(users::logout))
        .route("/users/me", get(me::me))
        .route("/health", get(health::health))
        .route("/openapi.json", get(openapi::openapi_json))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static(REQUEST_ID_HEADER),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    REQUEST_ID_HEADER,
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(state))
                .layer(Extension(pool)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    pool: SqlitePool,
    gate: AntiforgeryGate,
    config: AuthConfig,
) -> Result<()> {
    let authenticator = Authenticator::new(
        SqliteCredentialStore::new(pool.clone()),
        SqliteSessionSink::new(pool.clone()),
        CredentialHasher::new(),
        gate,
    );
    let state = Arc::new(AuthState::new(authenticator, config));

    let app = router(state, pool);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {err}");
                std::future::pending::<()>().await;
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
