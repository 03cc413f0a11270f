//! HTTP rendering of engine errors.
//!
//! Every non-2xx response carries the same envelope: a stable machine code
//! and a human-readable message. The mapping from [`AuthError`] variants to
//! status codes lives in the engine; this module only shapes the wire form
//! and makes sure internal detail never reaches a client.

use crate::auth::AuthError;
use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

/// Wire form of every error response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Stable machine-readable code, e.g. `AUTHENTICATION_ERROR`.
    pub code: String,
    pub message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let Self::Internal(source) = &self {
            // The body stays generic; the cause goes to the log only.
            error!("request failed: {source:#}");
        }

        let status =
            StatusCode::from_u16(self.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorBody {
            code: self.code().to_string(),
            message: self.to_string(),
        };

        let mut response = (status, Json(body)).into_response();
        if let Self::RateLimited {
            retry_after_seconds,
        } = self
        {
            if let Ok(value) = HeaderValue::from_str(&retry_after_seconds.to_string()) {
                response.headers_mut().insert(RETRY_AFTER, value);
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    async fn body_of(response: Response) -> ErrorBody {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        serde_json::from_slice(&bytes).expect("body is the error envelope")
    }

    #[tokio::test]
    async fn credential_failure_maps_to_401_envelope() {
        let response = AuthError::InvalidCredentials.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = body_of(response).await;
        assert_eq!(body.code, "AUTHENTICATION_ERROR");
        assert_eq!(body.message, "invalid credentials");
    }

    #[tokio::test]
    async fn rate_limited_sets_retry_after() {
        let response = AuthError::RateLimited {
            retry_after_seconds: 42,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get(RETRY_AFTER),
            Some(&HeaderValue::from_static("42"))
        );

        let body = body_of(response).await;
        assert_eq!(body.code, "RATE_LIMIT_ERROR");
    }

    #[tokio::test]
    async fn internal_error_body_is_sanitized() {
        let response =
            AuthError::Internal(anyhow!("connect to 10.0.0.3:5432 timed out")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_of(response).await;
        assert_eq!(body.code, "INTERNAL_ERROR");
        assert_eq!(body.message, "internal server error");
    }

    #[tokio::test]
    async fn forbidden_names_the_missing_permission() {
        let response =
            AuthError::Forbidden("requires permission user:unlock".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body = body_of(response).await;
        assert_eq!(body.code, "AUTHORIZATION_ERROR");
        assert_eq!(body.message, "requires permission user:unlock");
    }
}
