//! HTTP middleware for Mess Core
//!
//! - Bearer authentication and the `Principal` extractors
//! - Declarative route guards

pub mod auth;
pub mod guard;

pub use auth::{Authenticator, OptionalPrincipal};
pub use guard::{require_guard, GuardState};
