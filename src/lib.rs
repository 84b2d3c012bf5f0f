//! Mess Core - authentication and authorization backbone of the campus mess backend
//!
//! Access tokens carry the caller's roles and permissions, so authorizing a
//! request needs no database round-trip beyond a single user existence check.

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod jwt;
pub mod middleware;
pub mod policy;
pub mod rbac;
pub mod repository;
pub mod server;
pub mod service;
pub mod state;
pub mod telemetry;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, Result};
