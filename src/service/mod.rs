//! Business logic layer

pub mod password;
pub mod token;

pub use token::{LoginInput, LoginPortal, TokenService};
