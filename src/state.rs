//! Application state traits for dependency injection
//!
//! Handlers, extractors and the guard middleware are generic over [`HasAuth`],
//! so the production `AppState` and test states share one router.

use crate::config::Config;
use crate::middleware::auth::Authenticator;
use crate::repository::UserRepository;
use crate::service::TokenService;

pub trait HasAuth: Clone + Send + Sync + 'static {
    /// The user repository type
    type UserRepo: UserRepository + 'static;

    /// Get the application configuration
    fn config(&self) -> &Config;

    fn authenticator(&self) -> &Authenticator<Self::UserRepo>;

    fn token_service(&self) -> &TokenService<Self::UserRepo>;

    /// Readiness of backing stores
    fn check_ready(&self) -> impl std::future::Future<Output = bool> + Send {
        async { true }
    }
}
