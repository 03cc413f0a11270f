//! Authorization evaluator.
//!
//! Pure checks over an [`Identity`] snapshot. Roles and permissions are
//! re-read from the store on every request, so a revoked role stops working
//! as soon as the grant row is gone, not when the access token expires.

use super::error::AuthError;
use uuid::Uuid;

/// Authenticated caller with live role and permission sets.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: Uuid,
    pub email: String,
    pub username: String,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

impl Identity {
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    #[must_use]
    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.iter().any(|role| self.has_role(role))
    }

    #[must_use]
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    #[must_use]
    pub fn has_all_permissions(&self, permissions: &[&str]) -> bool {
        permissions.iter().all(|p| self.has_permission(p))
    }
}

/// Admins bypass the ownership test entirely.
#[must_use]
pub fn can_access_owned(identity: &Identity, owner_id: Uuid, admin_role: &str) -> bool {
    identity.has_role(admin_role) || identity.user_id == owner_id
}

pub fn require_role(identity: &Identity, role: &str) -> Result<(), AuthError> {
    if identity.has_role(role) {
        Ok(())
    } else {
        Err(AuthError::Forbidden(format!("requires role {role}")))
    }
}

pub fn require_permission(identity: &Identity, permission: &str) -> Result<(), AuthError> {
    if identity.has_permission(permission) {
        Ok(())
    } else {
        Err(AuthError::Forbidden(format!(
            "requires permission {permission}"
        )))
    }
}

pub fn require_owner_or_admin(
    identity: &Identity,
    owner_id: Uuid,
    admin_role: &str,
) -> Result<(), AuthError> {
    if can_access_owned(identity, owner_id, admin_role) {
        Ok(())
    } else {
        Err(AuthError::Forbidden(
            "not the owner of this resource".to_string(),
        ))
    }
}
