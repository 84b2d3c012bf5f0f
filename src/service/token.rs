//! Login and token refresh

use crate::domain::UserSnapshot;
use crate::error::{AppError, Result};
use crate::jwt::{JwtManager, TokenKind, TokenPair};
use crate::repository::UserRepository;
use crate::service::password::verify_password;
use crate::telemetry::metrics::LOGINS_TOTAL;
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginInput {
    #[validate(length(min = 1, max = 15))]
    pub phone: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Which login endpoint the request came through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginPortal {
    Generic,
    /// Everyone except the admin account
    Student,
    /// Only the admin account
    Admin,
}

impl LoginPortal {
    fn admit(&self, user: &UserSnapshot) -> Result<()> {
        match self {
            LoginPortal::Generic => Ok(()),
            LoginPortal::Student if user.is_named_admin() => Err(AppError::Forbidden(
                "Admin must use /api/v1/auth/admin/login".to_string(),
            )),
            LoginPortal::Admin if !user.is_named_admin() => Err(AppError::Forbidden(
                "Only admin can use this endpoint".to_string(),
            )),
            _ => Ok(()),
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            LoginPortal::Generic => "generic",
            LoginPortal::Student => "student",
            LoginPortal::Admin => "admin",
        }
    }
}

pub struct TokenService<U: UserRepository> {
    users: Arc<U>,
    jwt_manager: JwtManager,
}

impl<U: UserRepository> Clone for TokenService<U> {
    fn clone(&self) -> Self {
        Self {
            users: self.users.clone(),
            jwt_manager: self.jwt_manager.clone(),
        }
    }
}

impl<U: UserRepository> TokenService<U> {
    pub fn new(users: Arc<U>, jwt_manager: JwtManager) -> Self {
        Self { users, jwt_manager }
    }

    pub async fn login(&self, input: LoginInput, portal: LoginPortal) -> Result<TokenPair> {
        let result = self.try_login(input, portal).await;
        let outcome = match &result {
            Ok(_) => "success",
            Err(AppError::Forbidden(_)) => "wrong_portal",
            Err(AppError::InvalidCredentials) => "invalid_credentials",
            Err(AppError::UserInactive) => "inactive",
            Err(_) => "error",
        };
        metrics::counter!(LOGINS_TOTAL, "result" => outcome).increment(1);
        result
    }

    async fn try_login(&self, input: LoginInput, portal: LoginPortal) -> Result<TokenPair> {
        input.validate()?;

        let user = self
            .users
            .find_by_phone(&input.phone)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        portal.admit(&user)?;

        let hash = self
            .users
            .find_password_hash(user.id)
            .await?
            .ok_or(AppError::InvalidCredentials)?;
        if !verify_password(&input.password, &hash)? {
            tracing::info!(user_id = user.id, portal = portal.as_str(), "Login rejected: bad password");
            return Err(AppError::InvalidCredentials);
        }

        if !user.is_active {
            return Err(AppError::UserInactive);
        }

        let pair = self.jwt_manager.issue(&user)?;
        tracing::info!(
            user_id = user.id,
            portal = portal.as_str(),
            roles = ?pair.user_info.roles,
            "User logged in"
        );
        Ok(pair)
    }

    /// Exchange a refresh token for a new access token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<String> {
        let claims = self
            .jwt_manager
            .decode_expecting(refresh_token, TokenKind::Refresh)?;

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

        let access = self
            .jwt_manager
            .issue_access_from(&claims.backfill_from(&user))?;
        tracing::debug!(user_id, "Refreshed access token");
        Ok(access)
    }
}
