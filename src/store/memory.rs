//! Mutex-guarded in-memory store, the harness for engine flow tests.
//!
//! Mirrors the Postgres semantics that matter to callers: unique refresh-token
//! hashes, exclusive expiry boundaries, and single-shot revocation.

use super::{
    AuditEntry, AuditSink, NewSession, Session, SessionStore, StoreError, User, UserStore,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<HashMap<Uuid, User>>,
    role_permissions: Mutex<HashMap<String, Vec<String>>>,
    sessions: Mutex<HashMap<Uuid, Session>>,
    audit: Mutex<Vec<AuditEntry>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, user: User) {
        self.users.lock().unwrap().insert(user.id, user);
    }

    pub fn define_role(&self, role: &str, permissions: &[&str]) {
        self.role_permissions.lock().unwrap().insert(
            role.to_string(),
            permissions.iter().map(ToString::to_string).collect(),
        );
    }

    #[must_use]
    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        self.audit.lock().unwrap().clone()
    }

    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }

    async fn permissions_for(&self, user_id: Uuid) -> Result<Vec<String>, StoreError> {
        let roles = match self.users.lock().unwrap().get(&user_id) {
            Some(user) => user.roles.clone(),
            None => return Ok(Vec::new()),
        };
        let grants = self.role_permissions.lock().unwrap();
        let mut permissions = BTreeSet::new();
        for role in &roles {
            if let Some(perms) = grants.get(role) {
                permissions.extend(perms.iter().cloned());
            }
        }
        Ok(permissions.into_iter().collect())
    }

    async fn record_failure(&self, user_id: Uuid) -> Result<u32, StoreError> {
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        user.failed_login_attempts += 1;
        Ok(user.failed_login_attempts)
    }

    async fn lock(&self, user_id: Uuid, until: DateTime<Utc>) -> Result<(), StoreError> {
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        user.is_locked = true;
        user.locked_until = Some(until);
        Ok(())
    }

    async fn record_success(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<(), StoreError> {
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        user.failed_login_attempts = 0;
        user.is_locked = false;
        user.locked_until = None;
        user.last_login_at = Some(now);
        user.updated_at = now;
        Ok(())
    }

    async fn clear_lock(&self, user_id: Uuid) -> Result<bool, StoreError> {
        let mut users = self.users.lock().unwrap();
        match users.get_mut(&user_id) {
            Some(user) => {
                user.failed_login_attempts = 0;
                user.is_locked = false;
                user.locked_until = None;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create(&self, session: NewSession) -> Result<Session, StoreError> {
        let mut sessions = self.sessions.lock().unwrap();
        if sessions
            .values()
            .any(|s| s.refresh_token_hash == session.refresh_token_hash)
        {
            return Err(StoreError::Conflict);
        }
        let row = Session {
            id: Uuid::now_v7(),
            user_id: session.user_id,
            refresh_token_hash: session.refresh_token_hash,
            ip_address: session.ip_address,
            user_agent: session.user_agent,
            is_active: true,
            expires_at: session.expires_at,
            created_at: Utc::now(),
        };
        sessions.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_active_by_token_hash(
        &self,
        hash: &[u8],
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, StoreError> {
        let sessions = self.sessions.lock().unwrap();
        Ok(sessions
            .values()
            .find(|s| s.refresh_token_hash == hash && s.is_active && s.expires_at > now)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Session>, StoreError> {
        Ok(self.sessions.lock().unwrap().get(&id).cloned())
    }

    async fn list_active_for_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<Session>, StoreError> {
        let sessions = self.sessions.lock().unwrap();
        let mut rows: Vec<Session> = sessions
            .values()
            .filter(|s| s.user_id == user_id && s.is_active && s.expires_at > now)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn rotate(
        &self,
        session_id: Uuid,
        new_hash: Vec<u8>,
        new_expires_at: DateTime<Utc>,
    ) -> Result<Session, StoreError> {
        let mut sessions = self.sessions.lock().unwrap();
        if sessions
            .values()
            .any(|s| s.id != session_id && s.refresh_token_hash == new_hash)
        {
            return Err(StoreError::Conflict);
        }
        let session = sessions.get_mut(&session_id).ok_or(StoreError::NotFound)?;
        if !session.is_active {
            return Err(StoreError::NotFound);
        }
        session.refresh_token_hash = new_hash;
        session.expires_at = new_expires_at;
        Ok(session.clone())
    }

    async fn revoke(&self, session_id: Uuid) -> Result<bool, StoreError> {
        let mut sessions = self.sessions.lock().unwrap();
        match sessions.get_mut(&session_id) {
            Some(session) if session.is_active => {
                session.is_active = false;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at >= now);
        Ok((before - sessions.len()) as u64)
    }
}

#[async_trait]
impl AuditSink for MemoryStore {
    async fn append(&self, entry: AuditEntry) -> Result<(), StoreError> {
        self.audit.lock().unwrap().push(entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_user(email: &str, roles: &[&str]) -> User {
        let now = Utc::now();
        User {
            id: Uuid::now_v7(),
            email: email.to_string(),
            username: email.split('@').next().unwrap().to_string(),
            password_hash: String::new(),
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

    fn lease(user_id: Uuid, hash: &[u8], expires_at: DateTime<Utc>) -> NewSession {
        NewSession {
            user_id,
            refresh_token_hash: hash.to_vec(),
            ip_address: Some("203.0.113.7".to_string()),
            user_agent: None,
            expires_at,
        }
    }

    #[tokio::test]
    async fn rotate_replaces_hash_in_place() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let user_id = Uuid::now_v7();
        let session = store
            .create(lease(user_id, b"old-hash", now + Duration::hours(1)))
            .await
            .unwrap();

        let rotated = store
            .rotate(session.id, b"new-hash".to_vec(), now + Duration::hours(2))
            .await
            .unwrap();
        assert_eq!(rotated.id, session.id);

        assert!(store
            .find_active_by_token_hash(b"old-hash", now)
            .await
            .unwrap()
            .is_none());
        let found = store
            .find_active_by_token_hash(b"new-hash", now)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, session.id);
        assert_eq!(found.expires_at, now + Duration::hours(2));
    }

    #[tokio::test]
    async fn expiry_boundary_is_exclusive() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store
            .create(lease(Uuid::now_v7(), b"h1", now))
            .await
            .unwrap();
        store
            .create(lease(Uuid::now_v7(), b"h2", now + Duration::seconds(1)))
            .await
            .unwrap();

        assert!(store
            .find_active_by_token_hash(b"h1", now)
            .await
            .unwrap()
            .is_none());
        assert!(store
            .find_active_by_token_hash(b"h2", now)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn revoke_is_single_shot() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let session = store
            .create(lease(Uuid::now_v7(), b"h", now + Duration::hours(1)))
            .await
            .unwrap();

        assert!(store.revoke(session.id).await.unwrap());
        assert!(!store.revoke(session.id).await.unwrap());
        assert!(store
            .find_active_by_token_hash(b"h", now)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn purge_removes_only_expired_rows() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store
            .create(lease(Uuid::now_v7(), b"stale", now - Duration::hours(1)))
            .await
            .unwrap();
        store
            .create(lease(Uuid::now_v7(), b"live", now + Duration::hours(1)))
            .await
            .unwrap();

        let removed = store.purge_expired(now).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.session_count(), 1);
    }

    #[tokio::test]
    async fn duplicate_token_hash_conflicts() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store
            .create(lease(Uuid::now_v7(), b"same", now + Duration::hours(1)))
            .await
            .unwrap();
        let err = store
            .create(lease(Uuid::now_v7(), b"same", now + Duration::hours(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict));
    }

    #[tokio::test]
    async fn permissions_union_across_roles_dedups() {
        let store = MemoryStore::new();
        store.define_role("editor", &["posts:write", "posts:read"]);
        store.define_role("viewer", &["posts:read"]);
        let user = sample_user("casey@example.com", &["editor", "viewer"]);
        let user_id = user.id;
        store.add_user(user);

        let perms = store.permissions_for(user_id).await.unwrap();
        assert_eq!(perms, vec!["posts:read", "posts:write"]);
    }

    #[tokio::test]
    async fn failure_counter_and_unlock() {
        let store = MemoryStore::new();
        let user = sample_user("dana@example.com", &[]);
        let user_id = user.id;
        store.add_user(user);

        assert_eq!(store.record_failure(user_id).await.unwrap(), 1);
        assert_eq!(store.record_failure(user_id).await.unwrap(), 2);
        store
            .lock(user_id, Utc::now() + Duration::minutes(15))
            .await
            .unwrap();
        let locked = UserStore::find_by_id(&store, user_id).await.unwrap().unwrap();
        assert!(locked.is_locked);

        assert!(store.clear_lock(user_id).await.unwrap());
        let cleared = UserStore::find_by_id(&store, user_id).await.unwrap().unwrap();
        assert!(!cleared.is_locked);
        assert_eq!(cleared.failed_login_attempts, 0);
        assert!(cleared.locked_until.is_none());

        assert!(!store.clear_lock(Uuid::now_v7()).await.unwrap());
    }
}
