use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode, Uri},
    response::{Html, IntoResponse, Redirect},
};
use std::sync::Arc;

use super::{principal::require_auth, state::AuthState};
use crate::api::pages;

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Greeting for the signed-in principal", content_type = "text/html", body = String),
        (status = 303, description = "No session; redirect to the credential page")
    ),
    tag = "pages"
)]
pub async fn root(
    uri: Uri,
    headers: HeaderMap,
    Extension(state): Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    match require_auth(&headers, &state).await {
        Ok(principal) => Html(pages::greeting(&principal)).into_response(),
        Err(StatusCode::UNAUTHORIZED) => {
            let path = uri.path_and_query().map_or("/", |pq| pq.as_str());
            Redirect::to(&pages::sign_in_location(Some(path))).into_response()
        }
        Err(status) => status.into_response(),
    }
}
