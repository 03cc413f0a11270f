//! Token issuance and verification.
//!
//! Two kinds of credential leave this module: short-lived HS256 access tokens
//! (stateless, verified by signature and expiry alone) and long-lived opaque
//! refresh tokens (session-bound, stored hashed).

pub mod jwt;
pub mod refresh;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use uuid::Uuid;

pub use jwt::AccessTokenClaims;

/// Token pair handed to clients on login and refresh.
#[derive(Debug, Clone)]
pub struct TokenBundle {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    /// Refresh token lifetime in seconds (the session TTL).
    pub refresh_expires_in: i64,
}

/// Issues and verifies bearer tokens with one authoritative TTL per kind.
pub struct TokenIssuer {
    signing_key: SecretString,
    issuer: String,
    access_token_ttl_seconds: i64,
    session_ttl_seconds: i64,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(
        signing_key: SecretString,
        issuer: String,
        access_token_ttl_seconds: i64,
        session_ttl_seconds: i64,
    ) -> Self {
        Self {
            signing_key,
            issuer,
            access_token_ttl_seconds,
            session_ttl_seconds,
        }
    }

    /// Issue a fresh access/refresh pair for a user.
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails or the system RNG is unavailable.
    pub fn issue(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<TokenBundle> {
        let iat = now.timestamp();
        let claims = jwt::AccessTokenClaims {
            iss: self.issuer.clone(),
            sub: user_id.to_string(),
            token_type: jwt::ACCESS_TOKEN_TYPE.to_string(),
            iat,
            exp: iat + self.access_token_ttl_seconds,
        };

        let access_token = jwt::sign_hs256(self.signing_key.expose_secret().as_bytes(), &claims)?;
        let refresh_token = refresh::generate()?;

        Ok(TokenBundle {
            access_token,
            refresh_token,
            expires_in: self.access_token_ttl_seconds,
            refresh_expires_in: self.session_ttl_seconds,
        })
    }

    /// Verify an access token and return the user id it was issued for.
    ///
    /// Callers must re-fetch the live role/permission set afterwards; claims
    /// carry identity only.
    ///
    /// # Errors
    ///
    /// Returns [`jwt::Error::Expired`] past the TTL, distinct from the other
    /// variants covering malformed or forged tokens.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Uuid, jwt::Error> {
        let claims = jwt::verify_hs256(
            token,
            self.signing_key.expose_secret().as_bytes(),
            &self.issuer,
            now.timestamp(),
        )?;
        Uuid::parse_str(&claims.sub).map_err(|_| jwt::Error::TokenFormat)
    }

    /// Expiry instant for a session created or rotated at `now`.
    #[must_use]
    pub fn session_expiry(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::seconds(self.session_ttl_seconds)
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }
}
