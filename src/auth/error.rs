//! Engine error taxonomy.
//!
//! Authentication failures (401) are deliberately uniform: a wrong password,
//! an unknown account, and a locked account all surface as
//! [`AuthError::InvalidCredentials`]. The true reason goes to the audit log,
//! never to the caller. Authorization failures (403) are distinct and may name
//! the missing permission, since the caller is already authenticated.

use crate::store::StoreError;
use crate::token::jwt;
use anyhow::anyhow;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing credentials")]
    MissingCredentials,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("invalid or expired refresh token")]
    InvalidRefreshToken,
    #[error("access token expired")]
    TokenExpired,
    #[error("invalid access token")]
    InvalidToken,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("too many requests")]
    RateLimited { retry_after_seconds: u64 },
    /// Display stays generic; the source is for server-side logs only.
    #[error("internal server error")]
    Internal(#[source] anyhow::Error),
}

impl AuthError {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingCredentials
            | Self::InvalidCredentials
            | Self::InvalidRefreshToken
            | Self::TokenExpired
            | Self::InvalidToken => "AUTHENTICATION_ERROR",
            Self::Forbidden(_) => "AUTHORIZATION_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT_ERROR",
            Self::NotFound(_) => "NOT_FOUND_ERROR",
            Self::RateLimited { .. } => "RATE_LIMIT_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    #[must_use]
    pub const fn status(&self) -> u16 {
        match self {
            Self::MissingCredentials
            | Self::InvalidCredentials
            | Self::InvalidRefreshToken
            | Self::TokenExpired
            | Self::InvalidToken => 401,
            Self::Forbidden(_) => 403,
            Self::Validation(_) => 400,
            Self::Conflict(_) => 409,
            Self::NotFound(_) => 404,
            Self::RateLimited { .. } => 429,
            Self::Internal(_) => 500,
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Database(err) => Self::Internal(err),
            StoreError::Conflict => Self::Internal(anyhow!("unhandled storage conflict")),
            StoreError::NotFound => Self::Internal(anyhow!("storage row missing")),
        }
    }
}

impl From<jwt::Error> for AuthError {
    fn from(err: jwt::Error) -> Self {
        match err {
            jwt::Error::Expired => Self::TokenExpired,
            _ => Self::InvalidToken,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_failures_share_code_and_status() {
        for err in [
            AuthError::MissingCredentials,
            AuthError::InvalidCredentials,
            AuthError::InvalidRefreshToken,
            AuthError::TokenExpired,
            AuthError::InvalidToken,
        ] {
            assert_eq!(err.code(), "AUTHENTICATION_ERROR");
            assert_eq!(err.status(), 401);
        }
    }

    #[test]
    fn taxonomy_maps_to_status() {
        assert_eq!(AuthError::Forbidden("no".to_string()).status(), 403);
        assert_eq!(AuthError::Validation("bad".to_string()).status(), 400);
        assert_eq!(AuthError::Conflict("dup".to_string()).status(), 409);
        assert_eq!(AuthError::NotFound("session").status(), 404);
        assert_eq!(
            AuthError::RateLimited {
                retry_after_seconds: 30
            }
            .status(),
            429
        );
        assert_eq!(AuthError::Internal(anyhow!("boom")).status(), 500);
    }

    #[test]
    fn internal_display_is_sanitized() {
        let err = AuthError::Internal(anyhow!("pool timed out at 10.0.0.3:5432"));
        assert_eq!(err.to_string(), "internal server error");
        assert_eq!(err.code(), "INTERNAL_ERROR");
    }

    #[test]
    fn token_errors_split_expired_from_invalid() {
        assert!(matches!(
            AuthError::from(jwt::Error::Expired),
            AuthError::TokenExpired
        ));
        assert!(matches!(
            AuthError::from(jwt::Error::InvalidSignature),
            AuthError::InvalidToken
        ));
    }

    #[test]
    fn not_found_names_the_resource() {
        assert_eq!(AuthError::NotFound("session").to_string(), "session not found");
    }
}
