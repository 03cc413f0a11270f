//! # NovaSanctum (Token Authentication & Authorization Engine)
//!
//! `novasanctum` issues and verifies the credentials behind an HTTP API:
//! short-lived HS256 access tokens paired with opaque, single-use refresh
//! tokens tracked as server-side sessions.
//!
//! ## Credential Model
//!
//! - **Access tokens** are stateless JWTs carrying `iss`, `sub`, `iat`, and
//!   `exp` claims. Roles and permissions are deliberately not embedded; they
//!   are re-read from the store on every authenticated request so grants take
//!   effect immediately.
//! - **Refresh tokens** are 256-bit random strings stored only as SHA-256
//!   digests. Each refresh rotates the token in place: the old value stops
//!   resolving the moment the new one is issued.
//!
//! ## Account Protection
//!
//! Failed logins increment a per-account counter; reaching the threshold locks
//! the account for a cooldown window. Lockouts expire lazily on the next
//! attempt, and operators holding the `user:unlock` permission can clear them
//! early. All authentication failures return the same generic message while
//! the audit log records the true reason.
//!
//! ## Authorization
//!
//! Role and permission checks run against live store data. Admins bypass
//! ownership checks on session management; everyone else only touches their
//! own sessions. Authorization failures may name the missing permission,
//! authentication failures never say why.

pub mod api;
pub mod auth;
pub mod cli;
pub mod store;
pub mod token;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
