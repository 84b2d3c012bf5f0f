//! User snapshot as seen by the authentication layer

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Read-only view of a stored user, loaded by id or phone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UserSnapshot {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl UserSnapshot {
    pub fn flags(&self) -> UserFlags<'_> {
        UserFlags {
            name: &self.name,
            is_staff: self.is_staff,
            is_superuser: self.is_superuser,
        }
    }

    /// Legacy rule: the account literally named "admin" is the mess administrator.
    pub fn is_named_admin(&self) -> bool {
        self.flags().is_named_admin()
    }
}

/// The inputs role resolution depends on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserFlags<'a> {
    pub name: &'a str,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl UserFlags<'_> {
    // TODO: replace with an explicit admin flag column once the user table migration lands.
    pub fn is_named_admin(&self) -> bool {
        self.name.eq_ignore_ascii_case("admin")
    }
}
