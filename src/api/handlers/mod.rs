//! Route handlers and the request-parsing helpers they share.

pub mod admin;
pub mod health;
pub mod login;
pub mod logout;
pub mod me;
pub mod refresh;
pub mod root;
pub mod sessions;

#[cfg(test)]
pub(crate) mod test_support;

use crate::api::state::ApiState;
use crate::auth::{AuthError, ClientMeta, Identity};
use axum::http::{
    HeaderMap,
    header::{AUTHORIZATION, USER_AGENT},
};
use chrono::{DateTime, Utc};
use regex::Regex;

/// Lightweight email sanity check used before any store lookup.
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

/// Extract a client IP for rate limiting and audit from common proxy headers.
pub(crate) fn extract_client_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if forwarded.is_some() {
        return forwarded.map(str::to_string);
    }
    headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Request metadata recorded with sessions and audit entries.
pub(crate) fn client_meta(headers: &HeaderMap) -> ClientMeta {
    ClientMeta {
        ip_address: extract_client_ip(headers),
        user_agent: headers
            .get(USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
    }
}

/// Pull the raw token out of an `Authorization: Bearer` header.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolve the caller from the bearer token. Roles and permissions are read
/// from the store on every call, so the identity is always live.
pub(crate) async fn require_identity(
    state: &ApiState,
    headers: &HeaderMap,
    now: DateTime<Utc>,
) -> Result<Identity, AuthError> {
    let Some(token) = bearer_token(headers) else {
        return Err(AuthError::MissingCredentials);
    };
    state.auth().verify_access_token(token, now).await
}
