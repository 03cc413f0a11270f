//! Refresh token rotation endpoint.

use super::login::TOKEN_TYPE;
use super::{client_meta, extract_client_ip};
use crate::api::error::ErrorBody;
use crate::api::state::ApiState;
use crate::auth::{
    AuthError,
    rate_limit::{RateLimitAction, RateLimitDecision},
};
use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Token payload only; the rotated session belongs to a caller who already
/// holds a profile from login.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    /// Refresh token lifetime in seconds.
    pub refresh_expires_in: i64,
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Token rotated, previous refresh token retired", body = RefreshResponse),
        (status = 400, description = "Missing refresh token", body = ErrorBody),
        (status = 401, description = "Unknown, expired, or already-used refresh token", body = ErrorBody),
        (status = 429, description = "Too many attempts from this address", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn refresh(
    headers: HeaderMap,
    state: Extension<Arc<ApiState>>,
    payload: Option<Json<RefreshRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return AuthError::Validation("missing payload".to_string()).into_response();
    };
    if request.refresh_token.trim().is_empty() {
        return AuthError::Validation("refreshToken must not be empty".to_string())
            .into_response();
    }

    let client_ip = extract_client_ip(&headers);
    if let RateLimitDecision::Limited {
        retry_after_seconds,
    } = state
        .rate_limiter()
        .check_ip(client_ip.as_deref(), RateLimitAction::Refresh)
    {
        return AuthError::RateLimited {
            retry_after_seconds,
        }
        .into_response();
    }

    let meta = client_meta(&headers);
    match state
        .auth()
        .refresh(request.refresh_token.trim(), &meta, Utc::now())
        .await
    {
        Ok((bundle, _identity)) => {
            let response = RefreshResponse {
                access_token: bundle.access_token,
                refresh_token: bundle.refresh_token,
                token_type: TOKEN_TYPE.to_string(),
                expires_in: bundle.expires_in,
                refresh_expires_in: bundle.refresh_expires_in,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => err.into_response(),
    }
}
