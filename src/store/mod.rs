//! Persistence boundary: credential store, session registry, and audit sink.
//!
//! The engine only talks to these traits; `PgStore` backs them with Postgres
//! and `MemoryStore` with mutex-guarded maps. Absence of a row is `Ok(None)`,
//! never an error.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Unique constraint hit; callers may retry with fresh input.
    #[error("conflicting row")]
    Conflict,
    /// The targeted row is gone or no longer in the expected state.
    #[error("row not found")]
    NotFound,
    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

/// Identity record as the credential store returns it.
///
/// Role names are loaded with the user; the permission set is expanded on
/// demand via [`UserStore::permissions_for`].
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub roles: Vec<String>,
    pub is_active: bool,
    pub is_locked: bool,
    pub locked_until: Option<DateTime<Utc>>,
    pub failed_login_attempts: u32,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One refresh-token lease. The raw token never appears here; `refresh_token_hash`
/// is its SHA-256 digest and the lookup key.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub refresh_token_hash: Vec<u8>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub is_active: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Input for [`SessionStore::create`]; the id and `created_at` are store-assigned.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: Uuid,
    pub refresh_token_hash: Vec<u8>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Login,
    LoginFailed,
    Logout,
    TokenRefresh,
    AccountLocked,
    AccountUnlocked,
    RefreshTokenIpMismatch,
    SecurityError,
}

impl AuditAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Login => "LOGIN",
            Self::LoginFailed => "LOGIN_FAILED",
            Self::Logout => "LOGOUT",
            Self::TokenRefresh => "TOKEN_REFRESH",
            Self::AccountLocked => "ACCOUNT_LOCKED",
            Self::AccountUnlocked => "ACCOUNT_UNLOCKED",
            Self::RefreshTokenIpMismatch => "REFRESH_TOKEN_IP_MISMATCH",
            Self::SecurityError => "SECURITY_ERROR",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One security-relevant event. Append-only; ids are assigned by the sink.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub user_id: Option<Uuid>,
    pub action: AuditAction,
    pub resource: &'static str,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    #[must_use]
    pub fn new(action: AuditAction, resource: &'static str, created_at: DateTime<Utc>) -> Self {
        Self {
            user_id: None,
            action,
            resource,
            ip_address: None,
            user_agent: None,
            details: serde_json::json!({}),
            created_at,
        }
    }

    #[must_use]
    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    #[must_use]
    pub fn with_ip(mut self, ip_address: Option<String>) -> Self {
        self.ip_address = ip_address;
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

/// Credential store operations.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Union of permission strings granted by the user's roles.
    async fn permissions_for(&self, user_id: Uuid) -> Result<Vec<String>, StoreError>;

    /// Atomically increment the failure counter and return the new count.
    async fn record_failure(&self, user_id: Uuid) -> Result<u32, StoreError>;

    /// Mark the account locked until the given instant.
    async fn lock(&self, user_id: Uuid, until: DateTime<Utc>) -> Result<(), StoreError>;

    /// Successful login: zero the counter, clear the lock, stamp `last_login_at`.
    async fn record_success(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<(), StoreError>;

    /// Manual unlock. Returns false when the user does not exist.
    async fn clear_lock(&self, user_id: Uuid) -> Result<bool, StoreError>;
}

/// Session registry operations.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, session: NewSession) -> Result<Session, StoreError>;

    /// Refresh lookup: only rows with `is_active` and `expires_at > now`
    /// resolve (the boundary is exclusive).
    async fn find_active_by_token_hash(
        &self,
        hash: &[u8],
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Session>, StoreError>;

    async fn list_active_for_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<Session>, StoreError>;

    /// Replace the stored hash and extend expiry on the same row. The old raw
    /// token no longer resolves afterwards (refresh tokens are single-use).
    async fn rotate(
        &self,
        session_id: Uuid,
        new_hash: Vec<u8>,
        new_expires_at: DateTime<Utc>,
    ) -> Result<Session, StoreError>;

    /// Mark a session inactive. Returns false when no active row matched.
    async fn revoke(&self, session_id: Uuid) -> Result<bool, StoreError>;

    /// Delete sessions past their expiry, returning the number removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}

/// Append-only audit log.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, entry: AuditEntry) -> Result<(), StoreError>;
}

/// Write an audit entry without letting sink failures reach the caller.
/// The primary flow never fails because the audit log did.
pub async fn append_best_effort(sink: &dyn AuditSink, entry: AuditEntry) {
    let action = entry.action;
    if let Err(err) = sink.append(entry).await {
        warn!(action = %action, "audit append failed: {err}");
    }
}
