//! Role and permission resolution
//!
//! Roles are derived from user flags; permissions are derived from roles via
//! fixed tables. Both functions are total and never touch storage.

use crate::domain::{Permission, Role, UserFlags};
use std::collections::BTreeSet;

/// Granted to every authenticated principal regardless of role.
pub const UNIVERSAL_PERMISSIONS: [Permission; 3] = [
    Permission::AuthLogin,
    Permission::AuthLogout,
    Permission::AuthRefresh,
];

/// Roles that own a permission table, highest precedence first.
pub const PRECEDENCE: [Role; 4] = [Role::Superuser, Role::Admin, Role::Staff, Role::Student];

const SUPERUSER_PERMISSIONS: &[Permission] = &[
    Permission::UserCreate,
    Permission::UserRead,
    Permission::UserUpdate,
    Permission::UserDelete,
    Permission::MessCreate,
    Permission::MessRead,
    Permission::MessUpdate,
    Permission::MessDelete,
    Permission::BookingCreate,
    Permission::BookingRead,
    Permission::BookingUpdate,
    Permission::BookingDelete,
    Permission::CouponCreate,
    Permission::CouponRead,
    Permission::CouponUpdate,
    Permission::CouponDelete,
    Permission::ReportRead,
    Permission::ReportExport,
    Permission::AuditRead,
];

const ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::UserRead,
    Permission::UserUpdate,
    Permission::UserDelete,
    Permission::MessCreate,
    Permission::MessRead,
    Permission::MessUpdate,
    Permission::MessDelete,
    Permission::BookingRead,
    Permission::BookingUpdate,
    Permission::BookingDelete,
    Permission::CouponCreate,
    Permission::CouponRead,
    Permission::CouponUpdate,
    Permission::CouponDelete,
    Permission::ReportRead,
    Permission::ReportExport,
    Permission::AuditRead,
];

const STAFF_PERMISSIONS: &[Permission] = &[
    Permission::UserRead,
    Permission::MessRead,
    Permission::MessUpdate,
    Permission::BookingRead,
    Permission::BookingUpdate,
    Permission::CouponCreate,
    Permission::CouponRead,
    Permission::CouponUpdate,
    Permission::ReportRead,
];

const STUDENT_PERMISSIONS: &[Permission] = &[
    Permission::UserRead,
    Permission::UserUpdate,
    Permission::MessRead,
    Permission::BookingCreate,
    Permission::BookingRead,
    Permission::BookingUpdate,
    Permission::CouponRead,
];

/// Permission table owned by a single role. `user` owns none.
pub fn role_permissions(role: Role) -> &'static [Permission] {
    match role {
        Role::Superuser => SUPERUSER_PERMISSIONS,
        Role::Admin => ADMIN_PERMISSIONS,
        Role::Staff => STAFF_PERMISSIONS,
        Role::Student => STUDENT_PERMISSIONS,
        Role::User => &[],
    }
}

/// How the tables of a multi-role principal are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PermissionPolicy {
    /// Only the highest-precedence matching role's table applies.
    #[default]
    FirstMatch,
    /// Every matching role's table applies.
    Union,
}

impl PermissionPolicy {
    pub fn resolve(&self, roles: &BTreeSet<Role>) -> BTreeSet<Permission> {
        let mut permissions = BTreeSet::new();

        let mut matching = PRECEDENCE.into_iter().filter(|role| roles.contains(role));
        match self {
            PermissionPolicy::FirstMatch => {
                if let Some(role) = matching.next() {
                    permissions.extend(role_permissions(role).iter().copied());
                }
            }
            PermissionPolicy::Union => {
                for role in matching {
                    permissions.extend(role_permissions(role).iter().copied());
                }
            }
        }

        permissions.extend(UNIVERSAL_PERMISSIONS);
        permissions
    }
}

/// Derive the role set for a user.
pub fn resolve_roles(flags: UserFlags<'_>) -> BTreeSet<Role> {
    let mut roles = BTreeSet::new();

    if flags.is_superuser {
        roles.insert(Role::Superuser);
    }
    if flags.is_staff {
        roles.insert(Role::Staff);
    }
    if flags.is_named_admin() {
        roles.insert(Role::Admin);
    }
    if !flags.is_staff && !flags.is_superuser {
        roles.insert(Role::Student);
    }
    roles.insert(Role::User);

    roles
}

/// Derive permissions with first-match precedence.
pub fn resolve_permissions(roles: &BTreeSet<Role>) -> BTreeSet<Permission> {
    PermissionPolicy::FirstMatch.resolve(roles)
}

/// Roles and permissions for a user in one step.
pub fn resolve(flags: UserFlags<'_>) -> (BTreeSet<Role>, BTreeSet<Permission>) {
    let roles = resolve_roles(flags);
    let permissions = resolve_permissions(&roles);
    (roles, permissions)
}
