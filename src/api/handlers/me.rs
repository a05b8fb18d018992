use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use super::{principal::current_principal, state::AuthState};
use crate::auth::ClaimSet;

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Me {
    pub id: Option<i64>,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub roles: Vec<String>,
    pub is_admin: bool,
}

impl From<&ClaimSet> for Me {
    fn from(principal: &ClaimSet) -> Self {
        Self {
            id: principal.user_id(),
            name: principal.name().to_string(),
            email: principal.email().map(str::to_string),
            phone: principal.phone().map(str::to_string),
            roles: principal.roles().map(str::to_string).collect(),
            is_admin: principal.is_admin(),
        }
    }
}

#[utoipa::path(
    get,
    path = "/users/me",
    responses(
        (status = 200, description = "Principal of the active session", body = Me),
        (status = 204, description = "No active session")
    ),
    tag = "auth"
)]
pub async fn me(
    headers: HeaderMap,
    Extension(state): Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    match current_principal(&headers, &state).await {
        Ok(Some(principal)) => (StatusCode::OK, Json(Me::from(&principal))).into_response(),
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(status) => status.into_response(),
    }
}
