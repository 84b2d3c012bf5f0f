//! Route-level guard middleware
//!
//! Authenticates in hard mode, evaluates a [`Guard`], and stores the resulting
//! [`Principal`](crate::domain::Principal) in request extensions for the handler.

use crate::error::AppError;
use crate::middleware::auth::authorization_header;
use crate::policy::{self, Guard};
use crate::state::HasAuth;
use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Shared state for the guard middleware
#[derive(Clone)]
pub struct GuardState<S> {
    app: S,
    guard: Arc<Guard>,
}

impl<S> GuardState<S> {
    pub fn new(app: S, guard: Guard) -> Self {
        Self {
            app,
            guard: Arc::new(guard),
        }
    }
}

pub async fn require_guard<S: HasAuth>(
    State(state): State<GuardState<S>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let header = authorization_header(request.headers()).map(str::to_owned);
    let principal = state
        .app
        .authenticator()
        .require(header.as_deref())
        .await?;

    policy::enforce(&principal, &state.guard)?;

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}
