//! Authenticated caller attached to a single request

use super::rbac::{Permission, Role};
use serde::Serialize;
use std::collections::BTreeSet;

/// Where a principal's roles and permissions came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationSource {
    /// Read straight from the token's authorization claims
    Embedded,
    /// Token predates embedded claims; recomputed from the stored user
    Resolved,
}

/// Identity plus authorization context for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub user_id: i64,
    pub display_name: String,
    pub email: String,
    pub phone: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub roles: BTreeSet<Role>,
    pub permissions: BTreeSet<Permission>,
    pub source: AuthorizationSource,
}

impl Principal {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.iter().any(|r| self.has_role(*r))
    }

    pub fn has_all_permissions(&self, permissions: &[Permission]) -> bool {
        permissions.iter().all(|p| self.has_permission(*p))
    }

    pub fn has_any_permission(&self, permissions: &[Permission]) -> bool {
        permissions.iter().any(|p| self.has_permission(*p))
    }

    pub fn role_names(&self) -> Vec<String> {
        self.roles.iter().map(|r| r.as_str().to_string()).collect()
    }

    pub fn permission_names(&self) -> Vec<String> {
        self.permissions
            .iter()
            .map(|p| p.as_str().to_string())
            .collect()
    }
}
