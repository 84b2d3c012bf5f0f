//! Bearer token authentication
//!
//! Turns an `Authorization: Bearer <token>` header into a [`Principal`]. Roles and
//! permissions are read from the token itself; the user table is consulted only to
//! confirm the account still exists and is active, and to recompute authorization
//! for tokens issued before it was embedded.

use crate::domain::{AuthorizationSource, Principal};
use crate::error::{AppError, Result};
use crate::jwt::{JwtManager, TokenClaims, TokenKind};
use crate::rbac;
use crate::repository::UserRepository;
use crate::state::HasAuth;
use crate::telemetry::metrics::AUTHENTICATIONS_TOTAL;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use std::sync::Arc;

const BEARER_PREFIX: &str = "Bearer ";

/// Raw `Authorization` header value, if present and valid UTF-8.
pub fn authorization_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok())
}

/// Token following the literal `Bearer ` prefix.
pub fn extract_bearer(header: Option<&str>) -> Option<&str> {
    header.and_then(|value| value.strip_prefix(BEARER_PREFIX))
}

fn record_outcome(outcome: &'static str) {
    metrics::counter!(AUTHENTICATIONS_TOTAL, "outcome" => outcome).increment(1);
}

pub struct Authenticator<U: UserRepository> {
    users: Arc<U>,
    jwt_manager: JwtManager,
}

impl<U: UserRepository> Clone for Authenticator<U> {
    fn clone(&self) -> Self {
        Self {
            users: self.users.clone(),
            jwt_manager: self.jwt_manager.clone(),
        }
    }
}

impl<U: UserRepository> Authenticator<U> {
    pub fn new(users: Arc<U>, jwt_manager: JwtManager) -> Self {
        Self { users, jwt_manager }
    }

    /// Soft mode: no bearer credential yields `Ok(None)`, but a bad token is still an error.
    pub async fn authenticate(&self, header: Option<&str>) -> Result<Option<Principal>> {
        match extract_bearer(header) {
            Some(token) => self.principal_from_token(token).await.map(Some),
            None => Ok(None),
        }
    }

    /// Hard mode: a bearer credential is mandatory.
    pub async fn require(&self, header: Option<&str>) -> Result<Principal> {
        match extract_bearer(header) {
            Some(token) => self.principal_from_token(token).await,
            None => {
                record_outcome("missing");
                Err(AppError::MissingCredential)
            }
        }
    }

    async fn principal_from_token(&self, token: &str) -> Result<Principal> {
        let result = self.resolve_principal(token).await;
        match &result {
            Ok(principal) => {
                record_outcome(match principal.source {
                    AuthorizationSource::Embedded => "embedded",
                    AuthorizationSource::Resolved => "resolved",
                });
                tracing::debug!(
                    user_id = principal.user_id,
                    source = ?principal.source,
                    "Authenticated request"
                );
            }
            Err(e) => {
                record_outcome(e.code());
                tracing::warn!(error = %e, "Rejected bearer token");
            }
        }
        result
    }

    async fn resolve_principal(&self, token: &str) -> Result<Principal> {
        let claims = self.jwt_manager.decode_expecting(token, TokenKind::Access)?;

        let user_id = claims
            .user_id
            .ok_or_else(|| AppError::Authentication("Token contained no user_id".to_string()))?;

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::UserNotFound)?;
        if !user.is_active {
            return Err(AppError::UserInactive);
        }

        let embedded = claims
            .parsed_roles()
            .zip(claims.parsed_permissions());
        let (roles, permissions, source, is_staff, is_superuser) = match embedded {
            Some((roles, permissions)) => (
                roles,
                permissions,
                AuthorizationSource::Embedded,
                claims.is_staff,
                claims.is_superuser,
            ),
            None => {
                let (roles, permissions) = rbac::resolve(user.flags());
                (
                    roles,
                    permissions,
                    AuthorizationSource::Resolved,
                    user.is_staff,
                    user.is_superuser,
                )
            }
        };

        let TokenClaims {
            name, email, phone, ..
        } = claims;

        Ok(Principal {
            user_id,
            display_name: name.unwrap_or(user.name),
            email: email.unwrap_or(user.email),
            phone: phone.unwrap_or(user.phone),
            is_staff,
            is_superuser,
            roles,
            permissions,
            source,
        })
    }
}

/// Axum extractor for the authenticated principal (hard mode).
///
/// Reuses a principal already placed in request extensions by the guard
/// middleware, so a guarded handler never authenticates twice.
///
/// ```ignore
/// async fn handler(principal: Principal) -> impl IntoResponse {
///     format!("Hello, {}!", principal.display_name)
/// }
/// ```
impl<S> FromRequestParts<S> for Principal
where
    S: HasAuth,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        if let Some(principal) = parts.extensions.get::<Principal>() {
            return Ok(principal.clone());
        }
        state
            .authenticator()
            .require(authorization_header(&parts.headers))
            .await
    }
}

/// Optional authentication extractor
///
/// `None` when no bearer credential was sent; invalid or expired tokens are still rejected.
#[derive(Debug, Clone)]
pub struct OptionalPrincipal(pub Option<Principal>);

impl<S> FromRequestParts<S> for OptionalPrincipal
where
    S: HasAuth,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        if let Some(principal) = parts.extensions.get::<Principal>() {
            return Ok(OptionalPrincipal(Some(principal.clone())));
        }
        state
            .authenticator()
            .authenticate(authorization_header(&parts.headers))
            .await
            .map(OptionalPrincipal)
    }
}
