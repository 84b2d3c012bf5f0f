//! Domain models

pub mod principal;
pub mod rbac;
pub mod user;

pub use principal::{AuthorizationSource, Principal};
pub use rbac::{Permission, Role};
pub use user::{UserFlags, UserSnapshot};
