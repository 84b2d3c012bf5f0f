//! API integration tests infrastructure
//!
//! Provides an in-memory `UserRepository`, a `HasAuth` test state and HTTP
//! helpers that send requests through the real router.

pub mod auth_http_test;

use argon2::password_hash::{PasswordHasher, SaltString};
use argon2::{Argon2, Params};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header::AUTHORIZATION, Method, Request, StatusCode},
    Router,
};
use jsonwebtoken::Algorithm;
use mess_core::config::{Config, DatabaseConfig, JwtConfig, TelemetryConfig};
use mess_core::domain::UserSnapshot;
use mess_core::error::Result;
use mess_core::jwt::{FixedClock, JwtManager};
use mess_core::middleware::Authenticator;
use mess_core::repository::UserRepository;
use mess_core::server::build_router;
use mess_core::service::TokenService;
use mess_core::state::HasAuth;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceExt;

pub const NOW: i64 = 1_700_000_000;
pub const PASSWORD: &str = "correct horse battery staple";

pub const ADMIN_ID: i64 = 1;
pub const STUDENT_ID: i64 = 2;
pub const STAFF_ID: i64 = 3;
pub const SUPERUSER_ID: i64 = 4;
pub const INACTIVE_ID: i64 = 5;
pub const OTHER_STUDENT_ID: i64 = 6;

// ============================================================================
// Test Configuration
// ============================================================================

pub fn test_jwt_config() -> JwtConfig {
    JwtConfig {
        secret: "test-secret-key-for-api-testing-purposes".to_string(),
        algorithm: Algorithm::HS256,
        access_token_ttl_secs: 300,
        refresh_token_ttl_secs: 86400,
        private_key_pem: None,
        public_key_pem: None,
    }
}

pub fn create_test_config() -> Config {
    Config {
        http_host: "127.0.0.1".to_string(),
        http_port: 0,
        database: DatabaseConfig {
            url: "mysql://localhost/mess_test".to_string(),
            max_connections: 1,
            min_connections: 1,
            acquire_timeout_secs: 1,
        },
        jwt: test_jwt_config(),
        telemetry: TelemetryConfig::default(),
    }
}

/// Argon2id hash with minimal cost parameters; verification reads them from the PHC string.
pub fn hash_password(password: &str) -> String {
    let params = Params::new(8, 1, 1, None).unwrap();
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);
    let salt = SaltString::from_b64("dGVzdHNhbHR0ZXN0c2FsdA").unwrap();
    argon2
        .hash_password(password.as_bytes(), &salt)
        .unwrap()
        .to_string()
}

pub fn user(id: i64, name: &str, is_staff: bool, is_superuser: bool) -> UserSnapshot {
    UserSnapshot {
        id,
        name: name.to_string(),
        email: format!("{}@campus.test", name.to_lowercase()),
        phone: phone_of(id),
        is_active: true,
        is_staff,
        is_superuser,
    }
}

pub fn phone_of(id: i64) -> String {
    format!("90000000{:02}", id)
}

// ============================================================================
// Test Repository
// ============================================================================

pub struct TestUserRepository {
    users: RwLock<Vec<(UserSnapshot, String)>>,
}

impl TestUserRepository {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(vec![]),
        }
    }

    pub async fn add_user(&self, user: UserSnapshot, password: &str) {
        self.add_user_with_hash(user, hash_password(password)).await;
    }

    /// Store a user with a pre-computed password hash in any supported format.
    pub async fn add_user_with_hash(&self, user: UserSnapshot, stored: impl Into<String>) {
        self.users.write().await.push((user, stored.into()));
    }

    /// Replace a stored user's snapshot, keeping its password.
    pub async fn update_user(&self, user: UserSnapshot) {
        let mut users = self.users.write().await;
        if let Some(entry) = users.iter_mut().find(|(u, _)| u.id == user.id) {
            entry.0 = user;
        }
    }

    pub async fn remove_user(&self, id: i64) {
        self.users.write().await.retain(|(u, _)| u.id != id);
    }
}

impl Default for TestUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepository for TestUserRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<UserSnapshot>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|(u, _)| u.id == id).map(|(u, _)| u.clone()))
    }

    async fn find_by_phone(&self, phone: &str) -> Result<Option<UserSnapshot>> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .find(|(u, _)| u.phone == phone)
            .map(|(u, _)| u.clone()))
    }

    async fn find_password_hash(&self, id: i64) -> Result<Option<String>> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .find(|(u, _)| u.id == id)
            .map(|(_, hash)| hash.clone()))
    }
}

// ============================================================================
// Test Application State
// ============================================================================

#[derive(Clone)]
pub struct TestAppState {
    pub config: Arc<Config>,
    pub jwt_manager: JwtManager,
    pub authenticator: Authenticator<TestUserRepository>,
    pub token_service: TokenService<TestUserRepository>,
    pub user_repo: Arc<TestUserRepository>,
    pub clock: Arc<FixedClock>,
}

impl TestAppState {
    pub fn new() -> Self {
        let config = create_test_config();
        let clock = Arc::new(FixedClock::at_timestamp(NOW));
        let jwt_manager = JwtManager::new(config.jwt.clone(), clock.clone()).unwrap();
        let user_repo = Arc::new(TestUserRepository::new());

        Self {
            config: Arc::new(config),
            authenticator: Authenticator::new(user_repo.clone(), jwt_manager.clone()),
            token_service: TokenService::new(user_repo.clone(), jwt_manager.clone()),
            jwt_manager,
            user_repo,
            clock,
        }
    }

    /// State populated with one user of each kind.
    pub async fn seeded() -> Self {
        let state = Self::new();
        let repo = &state.user_repo;
        repo.add_user(user(ADMIN_ID, "admin", false, false), PASSWORD).await;
        repo.add_user(user(STUDENT_ID, "Asha", false, false), PASSWORD).await;
        repo.add_user(user(STAFF_ID, "Ravi", true, false), PASSWORD).await;
        repo.add_user(user(SUPERUSER_ID, "Root", true, true), PASSWORD).await;
        let mut inactive = user(INACTIVE_ID, "Gone", false, false);
        inactive.is_active = false;
        repo.add_user(inactive, PASSWORD).await;
        repo.add_user(user(OTHER_STUDENT_ID, "Bina", false, false), PASSWORD)
            .await;
        state
    }

    /// Access token for a seeded user, issued directly by the codec.
    pub async fn access_token_for(&self, id: i64) -> String {
        let user = self
            .user_repo
            .find_by_id(id)
            .await
            .unwrap()
            .expect("seeded user");
        self.jwt_manager.issue(&user).unwrap().access
    }

    pub fn router(&self) -> Router {
        build_router(self.clone())
    }
}

impl HasAuth for TestAppState {
    type UserRepo = TestUserRepository;

    fn config(&self) -> &Config {
        &self.config
    }

    fn authenticator(&self) -> &Authenticator<Self::UserRepo> {
        &self.authenticator
    }

    fn token_service(&self) -> &TokenService<Self::UserRepo> {
        &self.token_service
    }
}

// ============================================================================
// HTTP Test Helpers
// ============================================================================

/// Send a request and parse the JSON response (`Value::Null` for an empty or non-JSON body).
pub async fn send(
    app: &Router,
    method: Method,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_string(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap_or_default();

    (
        status,
        serde_json::from_slice(&body_bytes).unwrap_or(Value::Null),
    )
}

pub async fn get_json(app: &Router, path: &str, token: Option<&str>) -> (StatusCode, Value) {
    send(app, Method::GET, path, token, None).await
}

pub async fn post_json(app: &Router, path: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, path, None, Some(body)).await
}

pub async fn delete_json(app: &Router, path: &str, token: Option<&str>) -> (StatusCode, Value) {
    send(app, Method::DELETE, path, token, None).await
}
