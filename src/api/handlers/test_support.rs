//! Shared fixtures for handler tests: an in-memory engine behind real state.

use crate::api::state::ApiState;
use crate::auth::{
    AuthConfig, Authenticator,
    password::PasswordHasher,
    rate_limit::{NoopRateLimiter, RateLimiter},
};
use crate::store::{MemoryStore, User};
use chrono::Utc;
use secrecy::SecretString;
use std::sync::Arc;
use uuid::Uuid;

pub(crate) const PASSWORD: &str = "correct horse battery staple";

pub(crate) fn test_config() -> AuthConfig {
    AuthConfig::new(SecretString::from(
        "unit-test-signing-key-0123456789".to_string(),
    ))
    .with_hash_memory_kib(64)
    .with_hash_iterations(1)
}

pub(crate) fn build_user(email: &str, roles: &[&str]) -> User {
    let hasher = PasswordHasher::new(64, 1).expect("hasher builds");
    let now = Utc::now();
    User {
        id: Uuid::now_v7(),
        email: email.to_string(),
        username: email.split('@').next().unwrap_or(email).to_string(),
        password_hash: hasher.hash(PASSWORD).expect("hashing succeeds"),
        roles: roles.iter().map(ToString::to_string).collect(),
        is_active: true,
        is_locked: false,
        locked_until: None,
        failed_login_attempts: 0,
        last_login_at: None,
        created_at: now,
        updated_at: now,
    }
}

/// Store with one ordinary account (`amy@example.com`) holding the `user`
/// role and its `user:read` grant.
pub(crate) fn seeded_store() -> (Arc<MemoryStore>, Uuid) {
    let store = Arc::new(MemoryStore::new());
    store.define_role("user", &["user:read"]);
    let user = build_user("amy@example.com", &["user"]);
    let id = user.id;
    store.add_user(user);
    (store, id)
}

pub(crate) fn state_with_limiter(
    store: Arc<MemoryStore>,
    rate_limiter: Arc<dyn RateLimiter>,
) -> Arc<ApiState> {
    let auth = Authenticator::new(store.clone(), store.clone(), store, &test_config())
        .expect("engine builds");
    Arc::new(ApiState::new(Arc::new(auth), rate_limiter))
}

pub(crate) fn state(store: Arc<MemoryStore>) -> Arc<ApiState> {
    state_with_limiter(store, Arc::new(NoopRateLimiter))
}
