use axum::{
    extract::Extension,
    http::HeaderMap,
    response::{Html, IntoResponse},
};
use std::sync::Arc;

use super::{principal::require_admin, state::AuthState};
use crate::api::pages;

#[utoipa::path(
    get,
    path = "/admin",
    responses(
        (status = 200, description = "Administration page", content_type = "text/html", body = String),
        (status = 404, description = "Not found for anyone but administrators")
    ),
    tag = "pages"
)]
pub async fn admin(
    headers: HeaderMap,
    Extension(state): Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    match require_admin(&headers, &state).await {
        Ok(principal) => Html(pages::admin(&principal)).into_response(),
        Err(status) => status.into_response(),
    }
}
