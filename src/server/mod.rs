//! Server initialization and routing

use crate::api;
use crate::config::Config;
use crate::domain::{Permission, Role};
use crate::jwt::{JwtManager, SystemClock};
use crate::middleware::auth::Authenticator;
use crate::middleware::guard::{require_guard, GuardState};
use crate::policy::Guard;
use crate::repository::{DbPool, UserRepositoryImpl};
use crate::service::TokenService;
use crate::state::HasAuth;
use anyhow::Result;
use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Production application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db_pool: DbPool,
    pub authenticator: Authenticator<UserRepositoryImpl>,
    pub token_service: TokenService<UserRepositoryImpl>,
}

impl HasAuth for AppState {
    type UserRepo = UserRepositoryImpl;

    fn config(&self) -> &Config {
        &self.config
    }

    fn authenticator(&self) -> &Authenticator<Self::UserRepo> {
        &self.authenticator
    }

    fn token_service(&self) -> &TokenService<Self::UserRepo> {
        &self.token_service
    }

    async fn check_ready(&self) -> bool {
        self.db_pool.ping().await.is_ok()
    }
}

/// Run the server
pub async fn run(config: Config, prometheus_handle: Option<PrometheusHandle>) -> Result<()> {
    let db_pool = DbPool::connect_lazy(&config.database)?;
    info!("Database pool configured");

    let jwt_manager = JwtManager::new(config.jwt.clone(), Arc::new(SystemClock))?;
    info!(algorithm = ?jwt_manager.algorithm(), "JWT manager ready");

    let user_repo = Arc::new(UserRepositoryImpl::new(db_pool.inner().clone()));
    let authenticator = Authenticator::new(user_repo.clone(), jwt_manager.clone());
    let token_service = TokenService::new(user_repo, jwt_manager);

    let http_addr = config.http_addr();
    let state = AppState {
        config: Arc::new(config),
        db_pool,
        authenticator,
        token_service,
    };

    let app = build_router(state).merge(
        Router::new()
            .route("/metrics", get(api::metrics::metrics_handler))
            .with_state(Arc::new(prometheus_handle)),
    );

    let listener = TcpListener::bind(&http_addr).await?;
    info!("HTTP server started on {}", http_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}

/// Attach a guard to every route of `routes`.
fn guarded<S: HasAuth>(state: &S, guard: Guard, routes: Router<S>) -> Router<S> {
    routes.route_layer(middleware::from_fn_with_state(
        GuardState::new(state.clone(), guard),
        require_guard::<S>,
    ))
}

/// Build the HTTP router with generic state type
///
/// Works with both the production `AppState` and test states implementing `HasAuth`.
pub fn build_router<S: HasAuth>(state: S) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let admin = guarded(
        &state,
        Guard::Admin,
        Router::new().route("/api/v1/admin/dashboard", get(api::access::admin_dashboard)),
    );
    let staff = guarded(
        &state,
        Guard::staff_only(),
        Router::new().route("/api/v1/staff/dashboard", get(api::access::staff_dashboard)),
    );
    let superuser = guarded(
        &state,
        Guard::superuser_only(),
        Router::new().route("/api/v1/superuser/panel", get(api::access::superuser_panel)),
    );
    let student = guarded(
        &state,
        Guard::student_only(),
        Router::new().route("/api/v1/student/portal", get(api::access::student_portal)),
    );
    let user_management = guarded(
        &state,
        Guard::all_permissions(&[Permission::UserRead, Permission::UserUpdate]),
        Router::new().route("/api/v1/users/manage", get(api::access::user_management)),
    );
    let flexible = guarded(
        &state,
        Guard::any_permission(&[Permission::UserRead, Permission::MessRead]),
        Router::new().route("/api/v1/access/flexible", get(api::access::flexible_access)),
    );
    let user_delete = guarded(
        &state,
        // The admin role itself; the staff and superuser flags do not stand in for it here
        Guard::All(vec![
            Guard::Role(vec![Role::Admin]),
            Guard::all_permissions(&[Permission::UserDelete]),
        ]),
        Router::new().route("/api/v1/users/{user_id}", delete(api::access::delete_user)),
    );

    Router::new()
        // Health endpoints
        .route("/health", get(api::health::health::<S>))
        .route("/ready", get(api::health::ready::<S>))
        .route("/api/v1/home", get(api::access::home))
        // Auth endpoints
        .route("/api/v1/auth/token", post(api::auth::token::<S>))
        .route("/api/v1/auth/student/login", post(api::auth::student_login::<S>))
        .route("/api/v1/auth/admin/login", post(api::auth::admin_login::<S>))
        .route("/api/v1/auth/token/refresh", post(api::auth::refresh::<S>))
        .route("/api/v1/auth/token-info", get(api::auth::token_info))
        // Self-or-admin is checked by the handler against the path
        .route(
            "/api/v1/users/{user_id}/profile",
            get(api::access::user_profile),
        )
        // Guarded endpoints
        .merge(admin)
        .merge(staff)
        .merge(superuser)
        .merge(student)
        .merge(user_management)
        .merge(flexible)
        .merge(user_delete)
        // Add middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
