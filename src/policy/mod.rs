//! Declarative access guards evaluated against an authenticated principal.

use crate::domain::{Permission, Principal, Role};
use crate::error::AppError;
use crate::telemetry::metrics::GUARD_DENIALS_TOTAL;
use serde_json::json;
use std::fmt;

pub type PolicyResult<T> = std::result::Result<T, AppError>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PermissionMode {
    /// Every listed permission is required
    #[default]
    All,
    /// Any one listed permission suffices
    Any,
}

/// Why a guard rejected a principal, with enough context for the client to tell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDenied {
    InsufficientRole {
        required: Vec<Role>,
        actual: Vec<Role>,
    },
    InsufficientPermission {
        mode: PermissionMode,
        required: Vec<Permission>,
        missing: Vec<Permission>,
        actual: Vec<Permission>,
    },
}

fn names<T: fmt::Display>(items: &[T]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

impl AccessDenied {
    pub fn code(&self) -> &'static str {
        match self {
            AccessDenied::InsufficientRole { .. } => "insufficient_role",
            AccessDenied::InsufficientPermission { .. } => "insufficient_permission",
        }
    }

    pub fn details(&self) -> serde_json::Value {
        match self {
            AccessDenied::InsufficientRole { required, actual } => json!({
                "required_roles": names(required),
                "user_roles": names(actual),
            }),
            AccessDenied::InsufficientPermission {
                mode: PermissionMode::All,
                required,
                missing,
                actual,
            } => json!({
                "required_permissions": names(required),
                "missing_permissions": names(missing),
                "user_permissions": names(actual),
            }),
            AccessDenied::InsufficientPermission {
                mode: PermissionMode::Any,
                required,
                actual,
                ..
            } => json!({
                "required_permissions": names(required),
                "user_permissions": names(actual),
            }),
        }
    }
}

impl fmt::Display for AccessDenied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessDenied::InsufficientRole { required, .. } => write!(
                f,
                "This endpoint requires one of the following roles: {}",
                names(required).join(", ")
            ),
            AccessDenied::InsufficientPermission { mode, required, .. } => {
                let quantifier = match mode {
                    PermissionMode::All => "all",
                    PermissionMode::Any => "at least one",
                };
                write!(
                    f,
                    "This endpoint requires {} of the following permissions: {}",
                    quantifier,
                    names(required).join(", ")
                )
            }
        }
    }
}

impl std::error::Error for AccessDenied {}

fn role_list(principal: &Principal) -> Vec<Role> {
    principal.roles.iter().copied().collect()
}

fn permission_list(principal: &Principal) -> Vec<Permission> {
    principal.permissions.iter().copied().collect()
}

/// Principal holds at least one of `roles`.
pub fn require_role(principal: &Principal, roles: &[Role]) -> Result<(), AccessDenied> {
    if principal.has_any_role(roles) {
        return Ok(());
    }
    Err(AccessDenied::InsufficientRole {
        required: roles.to_vec(),
        actual: role_list(principal),
    })
}

pub fn require_permission(
    principal: &Principal,
    permissions: &[Permission],
    mode: PermissionMode,
) -> Result<(), AccessDenied> {
    let granted = match mode {
        PermissionMode::All => principal.has_all_permissions(permissions),
        PermissionMode::Any => principal.has_any_permission(permissions),
    };
    if granted {
        return Ok(());
    }

    let missing = match mode {
        PermissionMode::All => permissions
            .iter()
            .copied()
            .filter(|p| !principal.has_permission(*p))
            .collect(),
        PermissionMode::Any => Vec::new(),
    };
    Err(AccessDenied::InsufficientPermission {
        mode,
        required: permissions.to_vec(),
        missing,
        actual: permission_list(principal),
    })
}

/// Admin or superuser role, or either privilege flag.
pub fn require_admin(principal: &Principal) -> Result<(), AccessDenied> {
    let is_admin = principal.has_any_role(&[Role::Admin, Role::Superuser])
        || principal.is_staff
        || principal.is_superuser;
    if is_admin {
        return Ok(());
    }
    Err(AccessDenied::InsufficientRole {
        required: vec![Role::Admin],
        actual: role_list(principal),
    })
}

pub fn require_self_or_admin(principal: &Principal, target_user_id: i64) -> Result<(), AccessDenied> {
    if principal.user_id == target_user_id {
        return Ok(());
    }
    require_admin(principal)
}

/// A composable access requirement attached to a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    Authenticated,
    /// Any of the listed roles
    Role(Vec<Role>),
    Permission {
        required: Vec<Permission>,
        mode: PermissionMode,
    },
    Admin,
    SelfOrAdmin(i64),
    /// Every member must pass; the first failure is reported
    All(Vec<Guard>),
}

impl Guard {
    pub fn authenticated() -> Self {
        Guard::Authenticated
    }

    pub fn superuser_only() -> Self {
        Guard::Role(vec![Role::Superuser])
    }

    pub fn staff_only() -> Self {
        Guard::Role(vec![Role::Admin, Role::Staff])
    }

    pub fn student_only() -> Self {
        Guard::Role(vec![Role::Student])
    }

    pub fn all_permissions(required: &[Permission]) -> Self {
        Guard::Permission {
            required: required.to_vec(),
            mode: PermissionMode::All,
        }
    }

    pub fn any_permission(required: &[Permission]) -> Self {
        Guard::Permission {
            required: required.to_vec(),
            mode: PermissionMode::Any,
        }
    }

    pub fn check(&self, principal: &Principal) -> Result<(), AccessDenied> {
        match self {
            Guard::Authenticated => Ok(()),
            Guard::Role(roles) => require_role(principal, roles),
            Guard::Permission { required, mode } => require_permission(principal, required, *mode),
            Guard::Admin => require_admin(principal),
            Guard::SelfOrAdmin(target) => require_self_or_admin(principal, *target),
            Guard::All(guards) => guards.iter().try_for_each(|guard| guard.check(principal)),
        }
    }
}

/// Evaluate a guard, logging and counting denials.
pub fn enforce(principal: &Principal, guard: &Guard) -> PolicyResult<()> {
    guard.check(principal).map_err(|denied| {
        tracing::warn!(
            user_id = principal.user_id,
            reason = denied.code(),
            "Access denied: {}",
            denied
        );
        metrics::counter!(GUARD_DENIALS_TOTAL, "reason" => denied.code()).increment(1);
        AppError::from(denied)
    })
}
