//! Operator endpoints.

use super::{client_meta, require_identity};
use crate::api::error::ErrorBody;
use crate::api::state::ApiState;
use crate::auth::{AuthError, authorize};
use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Grant required to clear another account's lockout.
pub(crate) const PERM_USER_UNLOCK: &str = "user:unlock";

#[utoipa::path(
    post,
    path = "/admin/users/{id}/unlock",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 204, description = "Lock cleared and failure counter reset"),
        (status = 400, description = "Malformed user id", body = ErrorBody),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody),
        (status = 403, description = "Caller lacks the user:unlock permission", body = ErrorBody),
        (status = 404, description = "No such user", body = ErrorBody)
    ),
    tag = "admin"
)]
pub async fn unlock_user(
    Path(id): Path<String>,
    headers: HeaderMap,
    state: Extension<Arc<ApiState>>,
) -> impl IntoResponse {
    let now = Utc::now();
    let identity = match require_identity(&state, &headers, now).await {
        Ok(identity) => identity,
        Err(err) => return err.into_response(),
    };
    if let Err(err) = authorize::require_permission(&identity, PERM_USER_UNLOCK) {
        return err.into_response();
    }

    let Ok(target) = Uuid::parse_str(id.trim()) else {
        return AuthError::Validation("invalid user id".to_string()).into_response();
    };

    let meta = client_meta(&headers);
    match state.auth().unlock_account(&identity, target, &meta, now).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}
