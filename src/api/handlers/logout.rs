//! Session termination endpoint.

use super::{client_meta, require_identity};
use crate::api::error::ErrorBody;
use crate::api::state::ApiState;
use crate::auth::AuthError;
use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    pub refresh_token: String,
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    request_body = LogoutRequest,
    responses(
        (status = 204, description = "Session revoked (or already gone)"),
        (status = 400, description = "Missing refresh token", body = ErrorBody),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn logout(
    headers: HeaderMap,
    state: Extension<Arc<ApiState>>,
    payload: Option<Json<LogoutRequest>>,
) -> impl IntoResponse {
    let now = Utc::now();
    let identity = match require_identity(&state, &headers, now).await {
        Ok(identity) => identity,
        Err(err) => return err.into_response(),
    };

    let Some(Json(request)) = payload else {
        return AuthError::Validation("missing payload".to_string()).into_response();
    };
    if request.refresh_token.trim().is_empty() {
        return AuthError::Validation("refreshToken must not be empty".to_string())
            .into_response();
    }

    let meta = client_meta(&headers);
    match state
        .auth()
        .logout(identity.user_id, request.refresh_token.trim(), &meta, now)
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::test_support::{PASSWORD, seeded_store, state};
    use crate::auth::ClientMeta;
    use axum::http::{HeaderValue, header::AUTHORIZATION};

    fn request(token: &str) -> Option<Json<LogoutRequest>> {
        Some(Json(LogoutRequest {
            refresh_token: token.to_string(),
        }))
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).expect("header value"),
        );
        headers
    }

    #[tokio::test]
    async fn logout_revokes_the_session_and_is_idempotent() {
        let (store, _) = seeded_store();
        let state = state(store);
        let (bundle, _) = state
            .auth()
            .login("amy@example.com", PASSWORD, &ClientMeta::default(), Utc::now())
            .await
            .expect("login succeeds");

        let response = logout(
            bearer(&bundle.access_token),
            Extension(state.clone()),
            request(&bundle.refresh_token),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        // The refresh token is now dead.
        let err = state
            .auth()
            .refresh(&bundle.refresh_token, &ClientMeta::default(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidRefreshToken));

        // A replay of the logout still returns 204.
        let replay = logout(
            bearer(&bundle.access_token),
            Extension(state),
            request(&bundle.refresh_token),
        )
        .await
        .into_response();
        assert_eq!(replay.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn logout_without_a_bearer_token_is_401() {
        let (store, _) = seeded_store();
        let state = state(store);

        let response = logout(HeaderMap::new(), Extension(state), request("whatever"))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn logout_without_a_payload_is_400() {
        let (store, _) = seeded_store();
        let state = state(store);
        let (bundle, _) = state
            .auth()
            .login("amy@example.com", PASSWORD, &ClientMeta::default(), Utc::now())
            .await
            .expect("login succeeds");

        let response = logout(bearer(&bundle.access_token), Extension(state), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
