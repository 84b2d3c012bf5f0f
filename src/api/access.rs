//! Guarded demonstration endpoints
//!
//! Route guards are attached in the router; handlers here only read the
//! principal the guard middleware left in request extensions.

use crate::domain::Principal;
use crate::error::Result;
use crate::middleware::OptionalPrincipal;
use crate::policy::{self, Guard};
use axum::{extract::Path, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct AccessResponse {
    pub message: String,
    pub endpoint: &'static str,
    pub user_id: i64,
    pub user_info: Principal,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct HomeResponse {
    pub message: &'static str,
    pub authenticated: bool,
    pub user_info: Option<Principal>,
}

/// Open to everyone; identifies the caller when a bearer token is sent.
pub async fn home(OptionalPrincipal(principal): OptionalPrincipal) -> Json<HomeResponse> {
    Json(HomeResponse {
        message: "Welcome to Mess Management",
        authenticated: principal.is_some(),
        user_info: principal,
    })
}

fn respond(
    principal: Principal,
    endpoint: &'static str,
    message: impl Into<String>,
    features: &[&'static str],
) -> Json<AccessResponse> {
    Json(AccessResponse {
        message: message.into(),
        endpoint,
        user_id: principal.user_id,
        user_info: principal,
        features: features.to_vec(),
    })
}

pub async fn admin_dashboard(principal: Principal) -> Json<AccessResponse> {
    respond(
        principal,
        "Admin Dashboard",
        "Welcome to Admin Dashboard",
        &["User Management", "System Settings", "Reports & Analytics", "Audit Logs"],
    )
}

pub async fn staff_dashboard(principal: Principal) -> Json<AccessResponse> {
    respond(
        principal,
        "Staff Dashboard",
        "Welcome to Staff Dashboard",
        &["Mess Management", "Booking Management", "Basic Reports"],
    )
}

pub async fn superuser_panel(principal: Principal) -> Json<AccessResponse> {
    respond(
        principal,
        "Superuser Panel",
        "Welcome to Superuser Panel",
        &["Full System Access", "Security Settings", "All Admin Features"],
    )
}

pub async fn student_portal(principal: Principal) -> Json<AccessResponse> {
    respond(
        principal,
        "Student Portal",
        "Welcome to Student Portal",
        &["View Mess Menu", "Book Meals", "View Coupons", "Update Profile"],
    )
}

pub async fn user_management(principal: Principal) -> Json<AccessResponse> {
    respond(principal, "User Management", "User Management", &[])
}

pub async fn flexible_access(principal: Principal) -> Json<AccessResponse> {
    respond(principal, "Flexible Access", "Flexible Access Endpoint", &[])
}

/// Self-or-admin depends on the path, so it is checked here rather than in a route guard.
pub async fn user_profile(
    Path(user_id): Path<i64>,
    principal: Principal,
) -> Result<Json<AccessResponse>> {
    policy::enforce(&principal, &Guard::SelfOrAdmin(user_id))?;
    Ok(respond(
        principal,
        "User Profile",
        format!("Profile for user {}", user_id),
        &[],
    ))
}

pub async fn delete_user(
    Path(user_id): Path<i64>,
    principal: Principal,
) -> Json<AccessResponse> {
    tracing::info!(actor = principal.user_id, target = user_id, "User deletion authorised");
    respond(
        principal,
        "Delete User",
        format!("User {} deletion authorised", user_id),
        &[],
    )
}
