//! Credential verification and token lifecycle flows.

use super::authorize::{self, Identity};
use super::config::AuthConfig;
use super::error::AuthError;
use super::lockout::LockoutPolicy;
use super::password::PasswordHasher;
use crate::store::{
    AuditAction, AuditEntry, AuditSink, NewSession, Session, SessionStore, StoreError, User,
    UserStore, append_best_effort,
};
use crate::token::{TokenBundle, TokenIssuer, refresh};
use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

const REASON_USER_NOT_FOUND: &str = "USER_NOT_FOUND";
const REASON_ACCOUNT_INACTIVE: &str = "ACCOUNT_INACTIVE";
const REASON_ACCOUNT_LOCKED: &str = "ACCOUNT_LOCKED";
const REASON_INVALID_PASSWORD: &str = "INVALID_PASSWORD";

/// Request metadata recorded with sessions and audit entries.
#[derive(Debug, Clone, Default)]
pub struct ClientMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Lowercased, trimmed form used for lookups and storage.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Ties together the stores, the token issuer, the password hasher, and the
/// lockout policy. One instance serves the whole process.
pub struct Authenticator {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    audit: Arc<dyn AuditSink>,
    issuer: TokenIssuer,
    hasher: PasswordHasher,
    lockout: LockoutPolicy,
    admin_role: String,
}

impl Authenticator {
    pub fn new(
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        audit: Arc<dyn AuditSink>,
        config: &AuthConfig,
    ) -> Result<Self> {
        let issuer = TokenIssuer::new(
            config.signing_key().clone(),
            config.issuer().to_string(),
            config.access_token_ttl_seconds(),
            config.session_ttl_seconds(),
        );
        let hasher = PasswordHasher::new(config.hash_memory_kib(), config.hash_iterations())?;
        let lockout = LockoutPolicy::new(
            config.lockout_threshold(),
            config.lockout_cooldown_seconds(),
        );
        Ok(Self {
            users,
            sessions,
            audit,
            issuer,
            hasher,
            lockout,
            admin_role: config.admin_role().to_string(),
        })
    }

    /// Full login flow: lookup, active and lock checks, password verification,
    /// then token issuance. Every failure writes a `LOGIN_FAILED` audit entry
    /// carrying the true reason while the caller gets the same generic error.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        meta: &ClientMeta,
        now: DateTime<Utc>,
    ) -> Result<(TokenBundle, Identity), AuthError> {
        let email = normalize_email(email);

        let Some(user) = self.users.find_by_email(&email).await? else {
            // Unknown accounts still pay for a verification so response
            // timing does not separate them from wrong passwords.
            self.hasher.equalize_timing(password);
            self.audit_login_failure(None, &email, REASON_USER_NOT_FOUND, meta, now)
                .await;
            return Err(AuthError::InvalidCredentials);
        };

        if !user.is_active {
            self.audit_login_failure(Some(user.id), &email, REASON_ACCOUNT_INACTIVE, meta, now)
                .await;
            return Err(AuthError::InvalidCredentials);
        }

        // Locked accounts are rejected before the password runs, so further
        // attempts neither grow the counter nor reveal whether the password
        // was right.
        if self.lockout.is_locked(&user, now) {
            self.audit_login_failure(Some(user.id), &email, REASON_ACCOUNT_LOCKED, meta, now)
                .await;
            return Err(AuthError::InvalidCredentials);
        }

        if !self.hasher.verify(password, &user.password_hash) {
            let failures = self.users.record_failure(user.id).await?;
            if self.lockout.should_lock(failures) {
                let until = self.lockout.lock_expiry(now);
                self.users.lock(user.id, until).await?;
                let entry = AuditEntry::new(AuditAction::AccountLocked, "user", now)
                    .with_user(user.id)
                    .with_ip(meta.ip_address.clone())
                    .with_user_agent(meta.user_agent.clone())
                    .with_details(json!({
                        "failedAttempts": failures,
                        "lockedUntil": until,
                    }));
                append_best_effort(self.audit.as_ref(), entry).await;
                warn!(user_id = %user.id, failures, "account locked after repeated login failures");
            }
            self.audit_login_failure(Some(user.id), &email, REASON_INVALID_PASSWORD, meta, now)
                .await;
            return Err(AuthError::InvalidCredentials);
        }

        self.users.record_success(user.id, now).await?;
        let bundle = self.open_session(user.id, meta, now).await?;
        let identity = self.identity_for(&user).await?;

        let entry = AuditEntry::new(AuditAction::Login, "auth", now)
            .with_user(user.id)
            .with_ip(meta.ip_address.clone())
            .with_user_agent(meta.user_agent.clone())
            .with_details(json!({ "email": email }));
        append_best_effort(self.audit.as_ref(), entry).await;
        info!(user_id = %user.id, "login succeeded");

        Ok((bundle, identity))
    }

    /// Rotate a refresh token. The presented token is retired on the same
    /// session row and a fresh bundle issued, so each refresh token works
    /// exactly once.
    pub async fn refresh(
        &self,
        refresh_token: &str,
        meta: &ClientMeta,
        now: DateTime<Utc>,
    ) -> Result<(TokenBundle, Identity), AuthError> {
        let hash = refresh::hash(refresh_token);
        let Some(session) = self.sessions.find_active_by_token_hash(&hash, now).await? else {
            self.audit_security_event(None, "UNKNOWN_REFRESH_TOKEN", meta, now)
                .await;
            return Err(AuthError::InvalidRefreshToken);
        };

        // A new source address is recorded but does not block the rotation;
        // clients on mobile networks change addresses constantly.
        if let (Some(session_ip), Some(request_ip)) = (&session.ip_address, &meta.ip_address) {
            if session_ip != request_ip {
                let entry = AuditEntry::new(AuditAction::RefreshTokenIpMismatch, "auth", now)
                    .with_user(session.user_id)
                    .with_ip(meta.ip_address.clone())
                    .with_user_agent(meta.user_agent.clone())
                    .with_details(json!({
                        "sessionId": session.id,
                        "sessionIp": session_ip,
                        "requestIp": request_ip,
                    }));
                append_best_effort(self.audit.as_ref(), entry).await;
                warn!(
                    user_id = %session.user_id,
                    session_id = %session.id,
                    "refresh token presented from a new address"
                );
            }
        }

        let user = match self.users.find_by_id(session.user_id).await? {
            Some(user) if user.is_active => user,
            // The account is gone or disabled; the session must not outlive it.
            _ => {
                let _ = self.sessions.revoke(session.id).await;
                self.audit_security_event(
                    Some(session.user_id),
                    "REFRESH_FOR_DISABLED_ACCOUNT",
                    meta,
                    now,
                )
                .await;
                return Err(AuthError::InvalidRefreshToken);
            }
        };

        let bundle = self.rotate_session(&session, now).await?;
        let identity = self.identity_for(&user).await?;

        let entry = AuditEntry::new(AuditAction::TokenRefresh, "auth", now)
            .with_user(user.id)
            .with_ip(meta.ip_address.clone())
            .with_user_agent(meta.user_agent.clone())
            .with_details(json!({ "sessionId": session.id }));
        append_best_effort(self.audit.as_ref(), entry).await;

        Ok((bundle, identity))
    }

    /// Revoke the session behind a refresh token. Idempotent: an unknown or
    /// already-retired token is a silent success.
    pub async fn logout(
        &self,
        user_id: Uuid,
        refresh_token: &str,
        meta: &ClientMeta,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let hash = refresh::hash(refresh_token);
        let Some(session) = self.sessions.find_active_by_token_hash(&hash, now).await? else {
            return Ok(());
        };

        if session.user_id != user_id {
            // Someone presented another account's refresh token. Record it;
            // the response stays indistinguishable from the no-op case.
            self.audit_security_event(Some(user_id), "LOGOUT_TOKEN_OWNER_MISMATCH", meta, now)
                .await;
            return Ok(());
        }

        if self.sessions.revoke(session.id).await? {
            let entry = AuditEntry::new(AuditAction::Logout, "auth", now)
                .with_user(user_id)
                .with_ip(meta.ip_address.clone())
                .with_user_agent(meta.user_agent.clone())
                .with_details(json!({ "sessionId": session.id }));
            append_best_effort(self.audit.as_ref(), entry).await;
        }
        Ok(())
    }

    /// Validate a bearer token and build the live identity. Roles and
    /// permissions come from the store at call time, never from token claims.
    pub async fn verify_access_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Identity, AuthError> {
        let user_id = self.issuer.verify(token, now)?;
        let user = match self.users.find_by_id(user_id).await? {
            Some(user) if user.is_active => user,
            _ => return Err(AuthError::InvalidToken),
        };
        self.identity_for(&user).await
    }

    pub async fn sessions_for(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<Session>, AuthError> {
        Ok(self.sessions.list_active_for_user(user_id, now).await?)
    }

    /// Revoke any session by id. The owner may revoke their own; everyone
    /// else needs the admin role. Missing sessions are 404, foreign ones 403.
    pub async fn revoke_session(
        &self,
        actor: &Identity,
        session_id: Uuid,
        meta: &ClientMeta,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let Some(session) = self.sessions.find_by_id(session_id).await? else {
            return Err(AuthError::NotFound("session"));
        };
        authorize::require_owner_or_admin(actor, session.user_id, &self.admin_role)?;

        if self.sessions.revoke(session_id).await? {
            let entry = AuditEntry::new(AuditAction::Logout, "session", now)
                .with_user(session.user_id)
                .with_ip(meta.ip_address.clone())
                .with_user_agent(meta.user_agent.clone())
                .with_details(json!({
                    "sessionId": session.id,
                    "revokedBy": actor.user_id,
                }));
            append_best_effort(self.audit.as_ref(), entry).await;
        }
        Ok(())
    }

    /// Operator unlock: clears the lock and zeroes the failure counter.
    pub async fn unlock_account(
        &self,
        actor: &Identity,
        target: Uuid,
        meta: &ClientMeta,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        if !self.users.clear_lock(target).await? {
            return Err(AuthError::NotFound("user"));
        }
        let entry = AuditEntry::new(AuditAction::AccountUnlocked, "user", now)
            .with_user(target)
            .with_ip(meta.ip_address.clone())
            .with_user_agent(meta.user_agent.clone())
            .with_details(json!({ "unlockedBy": actor.user_id }));
        append_best_effort(self.audit.as_ref(), entry).await;
        info!(user_id = %target, unlocked_by = %actor.user_id, "account unlocked");
        Ok(())
    }

    async fn identity_for(&self, user: &User) -> Result<Identity, AuthError> {
        let permissions = self.users.permissions_for(user.id).await?;
        Ok(Identity {
            user_id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            roles: user.roles.clone(),
            permissions,
        })
    }

    // Collisions on the unique hash index are vanishingly rare; retry with a
    // fresh token instead of surfacing the conflict.
    async fn open_session(
        &self,
        user_id: Uuid,
        meta: &ClientMeta,
        now: DateTime<Utc>,
    ) -> Result<TokenBundle, AuthError> {
        for _ in 0..3 {
            let bundle = self
                .issuer
                .issue(user_id, now)
                .map_err(AuthError::Internal)?;
            let new_session = NewSession {
                user_id,
                refresh_token_hash: refresh::hash(&bundle.refresh_token),
                ip_address: meta.ip_address.clone(),
                user_agent: meta.user_agent.clone(),
                expires_at: self.issuer.session_expiry(now),
            };
            match self.sessions.create(new_session).await {
                Ok(_) => return Ok(bundle),
                Err(StoreError::Conflict) => {}
                Err(err) => return Err(err.into()),
            }
        }
        Err(AuthError::Internal(anyhow!(
            "could not mint a unique refresh token"
        )))
    }

    async fn rotate_session(
        &self,
        session: &Session,
        now: DateTime<Utc>,
    ) -> Result<TokenBundle, AuthError> {
        for _ in 0..3 {
            let bundle = self
                .issuer
                .issue(session.user_id, now)
                .map_err(AuthError::Internal)?;
            let new_hash = refresh::hash(&bundle.refresh_token);
            let rotated = self
                .sessions
                .rotate(session.id, new_hash, self.issuer.session_expiry(now))
                .await;
            match rotated {
                Ok(_) => return Ok(bundle),
                Err(StoreError::Conflict) => {}
                // Revoked between lookup and rotation; treat as a dead token.
                Err(StoreError::NotFound) => return Err(AuthError::InvalidRefreshToken),
                Err(err) => return Err(err.into()),
            }
        }
        Err(AuthError::Internal(anyhow!(
            "could not mint a unique refresh token"
        )))
    }

    async fn audit_login_failure(
        &self,
        user_id: Option<Uuid>,
        email: &str,
        reason: &str,
        meta: &ClientMeta,
        now: DateTime<Utc>,
    ) {
        let mut entry = AuditEntry::new(AuditAction::LoginFailed, "auth", now)
            .with_ip(meta.ip_address.clone())
            .with_user_agent(meta.user_agent.clone())
            .with_details(json!({ "email": email, "reason": reason }));
        if let Some(user_id) = user_id {
            entry = entry.with_user(user_id);
        }
        append_best_effort(self.audit.as_ref(), entry).await;
    }

    async fn audit_security_event(
        &self,
        user_id: Option<Uuid>,
        reason: &str,
        meta: &ClientMeta,
        now: DateTime<Utc>,
    ) {
        let mut entry = AuditEntry::new(AuditAction::SecurityError, "auth", now)
            .with_ip(meta.ip_address.clone())
            .with_user_agent(meta.user_agent.clone())
            .with_details(json!({ "reason": reason }));
        if let Some(user_id) = user_id {
            entry = entry.with_user(user_id);
        }
        append_best_effort(self.audit.as_ref(), entry).await;
    }
}
