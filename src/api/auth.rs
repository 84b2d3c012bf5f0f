//! Login, refresh and token introspection endpoints

use crate::domain::Principal;
use crate::error::Result;
use crate::jwt::UserInfo;
use crate::service::{LoginInput, LoginPortal};
use crate::state::HasAuth;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: String,
    pub user: UserInfo,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1))]
    pub refresh: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
}

async fn login<S: HasAuth>(state: &S, input: LoginInput, portal: LoginPortal) -> Result<Json<LoginResponse>> {
    let pair = state.token_service().login(input, portal).await?;
    Ok(Json(LoginResponse {
        access: pair.access,
        refresh: pair.refresh,
        user: pair.user_info,
    }))
}

/// POST /api/v1/auth/token
pub async fn token<S: HasAuth>(
    State(state): State<S>,
    Json(input): Json<LoginInput>,
) -> Result<Json<LoginResponse>> {
    login(&state, input, LoginPortal::Generic).await
}

/// POST /api/v1/auth/student/login
pub async fn student_login<S: HasAuth>(
    State(state): State<S>,
    Json(input): Json<LoginInput>,
) -> Result<Json<LoginResponse>> {
    login(&state, input, LoginPortal::Student).await
}

/// POST /api/v1/auth/admin/login
pub async fn admin_login<S: HasAuth>(
    State(state): State<S>,
    Json(input): Json<LoginInput>,
) -> Result<Json<LoginResponse>> {
    login(&state, input, LoginPortal::Admin).await
}

/// POST /api/v1/auth/token/refresh
pub async fn refresh<S: HasAuth>(
    State(state): State<S>,
    Json(input): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>> {
    input.validate()?;
    let access = state.token_service().refresh(&input.refresh).await?;
    Ok(Json(RefreshResponse { access }))
}

/// GET /api/v1/auth/token-info
pub async fn token_info(principal: Principal) -> Json<Principal> {
    Json(principal)
}
