//! Login, refresh and token-info HTTP tests

use super::*;
use axum::http::StatusCode;
use chrono::Duration;
use jsonwebtoken::{encode, EncodingKey, Header};
use pretty_assertions::assert_eq;
use serde_json::json;

fn credentials(id: i64, password: &str) -> Value {
    json!({ "phone": phone_of(id), "password": password })
}

#[tokio::test]
async fn test_health() {
    let app = TestAppState::new().router();
    let (status, body) = get_json(&app, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "mess-core");
}

#[tokio::test]
async fn test_ready() {
    let app = TestAppState::new().router();
    let (status, _) = get_json(&app, "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_generic_login_returns_pair_and_user() {
    let app = TestAppState::seeded().await.router();

    let (status, body) = post_json(
        &app,
        "/api/v1/auth/token",
        credentials(STUDENT_ID, PASSWORD),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["access"].as_str().unwrap().split('.').count() == 3);
    assert!(body["refresh"].is_string());
    assert_eq!(body["user"]["user_id"], STUDENT_ID);
    assert_eq!(body["user"]["roles"], json!(["student", "user"]));
    assert!(body["user"]["permissions"]
        .as_array()
        .unwrap()
        .contains(&json!("auth.refresh")));
}

#[tokio::test]
async fn test_login_wrong_password() {
    let app = TestAppState::seeded().await.router();

    let (status, body) = post_json(
        &app,
        "/api/v1/auth/token",
        credentials(STUDENT_ID, "wrong"),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_credentials");
}

#[tokio::test]
async fn test_login_against_django_pbkdf2_hash() {
    let state = TestAppState::new();
    // pbkdf2_sha256 of "password123", salt "campussalt", 1000 rounds
    state
        .user_repo
        .add_user_with_hash(
            user(STUDENT_ID, "Asha", false, false),
            "pbkdf2_sha256$1000$campussalt$Bh1X0hBjRInFD99/nRxXzwsELL7NLlEHq0yCeqsT6Bw=",
        )
        .await;
    let app = state.router();

    let (status, body) = post_json(
        &app,
        "/api/v1/auth/student/login",
        credentials(STUDENT_ID, "password123"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["user_id"], STUDENT_ID);

    let (status, body) = post_json(
        &app,
        "/api/v1/auth/student/login",
        credentials(STUDENT_ID, "password124"),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_credentials");
}

#[tokio::test]
async fn test_login_unknown_phone() {
    let app = TestAppState::seeded().await.router();

    let (status, body) = post_json(
        &app,
        "/api/v1/auth/token",
        json!({"phone": "1234567890", "password": PASSWORD}),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_credentials");
}

#[tokio::test]
async fn test_login_empty_password_is_validation_error() {
    let app = TestAppState::seeded().await.router();

    let (status, body) = post_json(
        &app,
        "/api/v1/auth/token",
        json!({"phone": phone_of(STUDENT_ID), "password": ""}),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation");
}

#[tokio::test]
async fn test_login_inactive_user() {
    let app = TestAppState::seeded().await.router();

    let (status, body) = post_json(
        &app,
        "/api/v1/auth/token",
        credentials(INACTIVE_ID, PASSWORD),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "user_inactive");
}

#[tokio::test]
async fn test_student_portal_rejects_admin() {
    let app = TestAppState::seeded().await.router();

    let (status, body) = post_json(
        &app,
        "/api/v1/auth/student/login",
        credentials(ADMIN_ID, PASSWORD),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
}

#[tokio::test]
async fn test_student_portal_accepts_student() {
    let app = TestAppState::seeded().await.router();

    let (status, _) = post_json(
        &app,
        "/api/v1/auth/student/login",
        credentials(STUDENT_ID, PASSWORD),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_admin_portal() {
    let app = TestAppState::seeded().await.router();

    let (status, body) = post_json(
        &app,
        "/api/v1/auth/admin/login",
        credentials(ADMIN_ID, PASSWORD),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["roles"], json!(["admin", "student", "user"]));

    let (status, body) = post_json(
        &app,
        "/api/v1/auth/admin/login",
        credentials(STAFF_ID, PASSWORD),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
}

#[tokio::test]
async fn test_token_info_returns_principal() {
    let state = TestAppState::seeded().await;
    let app = state.router();
    let token = state.access_token_for(SUPERUSER_ID).await;

    let (status, body) = get_json(&app, "/api/v1/auth/token-info", Some(&token)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], SUPERUSER_ID);
    assert_eq!(body["roles"], json!(["superuser", "staff", "user"]));
    assert_eq!(body["is_superuser"], true);
    assert_eq!(body["source"], "embedded");
}

#[tokio::test]
async fn test_token_info_without_credentials() {
    let app = TestAppState::seeded().await.router();

    let (status, body) = get_json(&app, "/api/v1/auth/token-info", None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "missing_credential");
}

#[tokio::test]
async fn test_token_info_with_garbage_token() {
    let app = TestAppState::seeded().await.router();

    let (status, body) = get_json(&app, "/api/v1/auth/token-info", Some("garbage")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_token");
}

#[tokio::test]
async fn test_expired_access_token() {
    let state = TestAppState::seeded().await;
    let app = state.router();
    let token = state.access_token_for(STUDENT_ID).await;

    state.clock.advance(Duration::seconds(301));
    let (status, body) = get_json(&app, "/api/v1/auth/token-info", Some(&token)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "token_expired");
}

#[tokio::test]
async fn test_refresh_token_rejected_as_bearer() {
    let state = TestAppState::seeded().await;
    let app = state.router();
    let user = user(STUDENT_ID, "Asha", false, false);
    let refresh = state.jwt_manager.issue(&user).unwrap().refresh;

    let (status, body) = get_json(&app, "/api/v1/auth/token-info", Some(&refresh)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_token");
}

#[tokio::test]
async fn test_deleted_user_token() {
    let state = TestAppState::seeded().await;
    let app = state.router();
    let token = state.access_token_for(OTHER_STUDENT_ID).await;
    state.user_repo.remove_user(OTHER_STUDENT_ID).await;

    let (status, body) = get_json(&app, "/api/v1/auth/token-info", Some(&token)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "user_not_found");
}

#[tokio::test]
async fn test_inactive_user_token() {
    let state = TestAppState::seeded().await;
    let app = state.router();
    let token = state.access_token_for(INACTIVE_ID).await;

    let (status, body) = get_json(&app, "/api/v1/auth/token-info", Some(&token)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "user_inactive");
}

#[tokio::test]
async fn test_legacy_token_is_resolved_from_user() {
    let state = TestAppState::seeded().await;
    let app = state.router();
    let claims = json!({
        "token_type": "access",
        "exp": NOW + 60,
        "iat": NOW,
        "jti": "legacy",
        "user_id": STAFF_ID
    });
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(test_jwt_config().secret.as_bytes()),
    )
    .unwrap();

    let (status, body) = get_json(&app, "/api/v1/auth/token-info", Some(&token)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "resolved");
    assert_eq!(body["roles"], json!(["staff", "user"]));
    assert_eq!(body["display_name"], "Ravi");
}

#[tokio::test]
async fn test_refresh_flow() {
    let state = TestAppState::seeded().await;
    let app = state.router();

    let (_, login) = post_json(
        &app,
        "/api/v1/auth/token",
        credentials(STUDENT_ID, PASSWORD),
    )
    .await;
    let refresh = login["refresh"].as_str().unwrap().to_string();

    // Original access token has expired by now
    state.clock.advance(Duration::seconds(3600));

    let (status, body) = post_json(
        &app,
        "/api/v1/auth/token/refresh",
        json!({ "refresh": refresh }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let access = body["access"].as_str().unwrap();
    let (status, info) = get_json(&app, "/api/v1/auth/token-info", Some(access)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(info["user_id"], STUDENT_ID);
    assert_eq!(info["roles"], json!(["student", "user"]));
}

#[tokio::test]
async fn test_refresh_with_access_token_is_rejected() {
    let state = TestAppState::seeded().await;
    let app = state.router();
    let access = state.access_token_for(STUDENT_ID).await;

    let (status, body) = post_json(
        &app,
        "/api/v1/auth/token/refresh",
        json!({ "refresh": access }),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_token");
}

#[tokio::test]
async fn test_refresh_for_deactivated_user() {
    let state = TestAppState::seeded().await;
    let app = state.router();
    let mut student = user(STUDENT_ID, "Asha", false, false);
    let refresh = state.jwt_manager.issue(&student).unwrap().refresh;

    student.is_active = false;
    state.user_repo.update_user(student).await;

    let (status, body) = post_json(
        &app,
        "/api/v1/auth/token/refresh",
        json!({ "refresh": refresh }),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "user_inactive");
}

#[tokio::test]
async fn test_expired_refresh_token() {
    let state = TestAppState::seeded().await;
    let app = state.router();
    let refresh = state
        .jwt_manager
        .issue(&user(STUDENT_ID, "Asha", false, false))
        .unwrap()
        .refresh;

    state.clock.advance(Duration::seconds(86401));
    let (status, body) = post_json(
        &app,
        "/api/v1/auth/token/refresh",
        json!({ "refresh": refresh }),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "token_expired");
}
