//! Role and permission catalog

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse-grained membership derived from user flags.
///
/// Declaration order is the serialization order of role sets, so tokens
/// issued for the same user always list roles identically.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Superuser,
    Admin,
    Staff,
    Student,
    User,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Superuser,
        Role::Admin,
        Role::Staff,
        Role::Student,
        Role::User,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Superuser => "superuser",
            Role::Admin => "admin",
            Role::Staff => "staff",
            Role::Student => "student",
            Role::User => "user",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Role::ALL.into_iter().find(|role| role.as_str() == s)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fine-grained `resource.action` capability.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Permission {
    #[serde(rename = "user.create")]
    UserCreate,
    #[serde(rename = "user.read")]
    UserRead,
    #[serde(rename = "user.update")]
    UserUpdate,
    #[serde(rename = "user.delete")]
    UserDelete,
    #[serde(rename = "mess.create")]
    MessCreate,
    #[serde(rename = "mess.read")]
    MessRead,
    #[serde(rename = "mess.update")]
    MessUpdate,
    #[serde(rename = "mess.delete")]
    MessDelete,
    #[serde(rename = "booking.create")]
    BookingCreate,
    #[serde(rename = "booking.read")]
    BookingRead,
    #[serde(rename = "booking.update")]
    BookingUpdate,
    #[serde(rename = "booking.delete")]
    BookingDelete,
    #[serde(rename = "coupon.create")]
    CouponCreate,
    #[serde(rename = "coupon.read")]
    CouponRead,
    #[serde(rename = "coupon.update")]
    CouponUpdate,
    #[serde(rename = "coupon.delete")]
    CouponDelete,
    #[serde(rename = "report.read")]
    ReportRead,
    #[serde(rename = "report.export")]
    ReportExport,
    #[serde(rename = "audit.read")]
    AuditRead,
    #[serde(rename = "auth.login")]
    AuthLogin,
    #[serde(rename = "auth.logout")]
    AuthLogout,
    #[serde(rename = "auth.refresh")]
    AuthRefresh,
}

impl Permission {
    pub const ALL: [Permission; 22] = [
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
        Permission::AuthLogin,
        Permission::AuthLogout,
        Permission::AuthRefresh,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::UserCreate => "user.create",
            Permission::UserRead => "user.read",
            Permission::UserUpdate => "user.update",
            Permission::UserDelete => "user.delete",
            Permission::MessCreate => "mess.create",
            Permission::MessRead => "mess.read",
            Permission::MessUpdate => "mess.update",
            Permission::MessDelete => "mess.delete",
            Permission::BookingCreate => "booking.create",
            Permission::BookingRead => "booking.read",
            Permission::BookingUpdate => "booking.update",
            Permission::BookingDelete => "booking.delete",
            Permission::CouponCreate => "coupon.create",
            Permission::CouponRead => "coupon.read",
            Permission::CouponUpdate => "coupon.update",
            Permission::CouponDelete => "coupon.delete",
            Permission::ReportRead => "report.read",
            Permission::ReportExport => "report.export",
            Permission::AuditRead => "audit.read",
            Permission::AuthLogin => "auth.login",
            Permission::AuthLogout => "auth.logout",
            Permission::AuthRefresh => "auth.refresh",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Permission::ALL.into_iter().find(|perm| perm.as_str() == s)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
