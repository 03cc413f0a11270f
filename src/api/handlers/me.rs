//! Authenticated caller profile.

use super::require_identity;
use crate::api::error::ErrorBody;
use crate::api::state::ApiState;
use crate::auth::Identity;
use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// Live identity snapshot: roles and permissions come from the store at
/// request time, not from the token.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

impl From<Identity> for MeResponse {
    fn from(identity: Identity) -> Self {
        Self {
            id: identity.user_id,
            email: identity.email,
            username: identity.username,
            roles: identity.roles,
            permissions: identity.permissions,
        }
    }
}

#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "The authenticated identity", body = MeResponse),
        (status = 401, description = "Missing, expired, or invalid bearer token", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn me(headers: HeaderMap, state: Extension<Arc<ApiState>>) -> impl IntoResponse {
    match require_identity(&state, &headers, Utc::now()).await {
        Ok(identity) => (StatusCode::OK, Json(MeResponse::from(identity))).into_response(),
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::test_support::{PASSWORD, seeded_store, state};
    use crate::auth::ClientMeta;
    use axum::http::{HeaderValue, header::AUTHORIZATION};

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        serde_json::from_slice(&bytes).expect("body is JSON")
    }

    #[tokio::test]
    async fn me_returns_the_live_identity() {
        let (store, user_id) = seeded_store();
        let state = state(store);
        let (bundle, _) = state
            .auth()
            .login("amy@example.com", PASSWORD, &ClientMeta::default(), Utc::now())
            .await
            .expect("login succeeds");

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", bundle.access_token)).unwrap(),
        );

        let response = me(headers, Extension(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["id"], user_id.to_string());
        assert_eq!(body["email"], "amy@example.com");
        assert_eq!(body["username"], "amy");
        assert_eq!(body["roles"][0], "user");
        assert_eq!(body["permissions"][0], "user:read");
    }

    #[tokio::test]
    async fn me_without_a_token_is_401() {
        let (store, _) = seeded_store();
        let state = state(store);

        let response = me(HeaderMap::new(), Extension(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = body_json(response).await;
        assert_eq!(body["code"], "AUTHENTICATION_ERROR");
        assert_eq!(body["message"], "missing credentials");
    }

    #[tokio::test]
    async fn me_with_a_tampered_token_is_401() {
        let (store, _) = seeded_store();
        let state = state(store);
        let (bundle, _) = state
            .auth()
            .login("amy@example.com", PASSWORD, &ClientMeta::default(), Utc::now())
            .await
            .expect("login succeeds");

        let mut tampered = bundle.access_token.clone();
        tampered.pop();
        tampered.push('A');

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {tampered}")).unwrap(),
        );

        let response = me(headers, Extension(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
