//! Shared handler state.

use crate::auth::{Authenticator, rate_limit::RateLimiter};
use std::sync::Arc;

/// Everything a request handler needs: the engine and the rate limiter.
/// Injected once as an axum `Extension` at startup.
pub struct ApiState {
    auth: Arc<Authenticator>,
    rate_limiter: Arc<dyn RateLimiter>,
}

impl ApiState {
    #[must_use]
    pub fn new(auth: Arc<Authenticator>, rate_limiter: Arc<dyn RateLimiter>) -> Self {
        Self { auth, rate_limiter }
    }

    #[must_use]
    pub fn auth(&self) -> &Authenticator {
        &self.auth
    }

    #[must_use]
    pub fn rate_limiter(&self) -> &dyn RateLimiter {
        self.rate_limiter.as_ref()
    }
}
