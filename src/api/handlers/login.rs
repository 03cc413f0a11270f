//! Password login endpoint.

use super::{client_meta, extract_client_ip, valid_email};
use crate::api::error::ErrorBody;
use crate::api::state::ApiState;
use crate::auth::{
    AuthError, Identity,
    engine::normalize_email,
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
use uuid::Uuid;

pub(crate) const TOKEN_TYPE: &str = "Bearer";

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    /// Refresh token lifetime in seconds.
    pub refresh_expires_in: i64,
    pub user: UserProfile,
}

/// Sanitized account view. Credential material never appears here.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub roles: Vec<String>,
}

impl From<Identity> for UserProfile {
    fn from(identity: Identity) -> Self {
        Self {
            id: identity.user_id,
            email: identity.email,
            username: identity.username,
            roles: identity.roles,
        }
    }
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Credentials accepted, token pair issued", body = LoginResponse),
        (status = 400, description = "Malformed email or empty password", body = ErrorBody),
        (status = 401, description = "Credentials rejected", body = ErrorBody),
        (status = 429, description = "Too many attempts from this address", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    state: Extension<Arc<ApiState>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return AuthError::Validation("missing payload".to_string()).into_response();
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return AuthError::Validation("invalid email".to_string()).into_response();
    }
    if request.password.is_empty() {
        return AuthError::Validation("password must not be empty".to_string()).into_response();
    }

    // Reject rate-limited sources before credentials cost anything.
    let client_ip = extract_client_ip(&headers);
    if let RateLimitDecision::Limited {
        retry_after_seconds,
    } = state
        .rate_limiter()
        .check_ip(client_ip.as_deref(), RateLimitAction::Login)
    {
        return AuthError::RateLimited {
            retry_after_seconds,
        }
        .into_response();
    }

    let meta = client_meta(&headers);
    match state
        .auth()
        .login(&email, &request.password, &meta, Utc::now())
        .await
    {
        Ok((bundle, identity)) => {
            let response = LoginResponse {
                access_token: bundle.access_token,
                refresh_token: bundle.refresh_token,
                token_type: TOKEN_TYPE.to_string(),
                expires_in: bundle.expires_in,
                refresh_expires_in: bundle.refresh_expires_in,
                user: identity.into(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => err.into_response(),
    }
}
