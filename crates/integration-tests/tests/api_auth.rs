//! Router-level tests that never reach the database.
//!
//! Every request here is rejected by extraction, validation or token checks
//! before the first query, so the app runs over an unreachable pool.

#![allow(clippy::unwrap_used)]

use axum::http::{StatusCode, header};
use chrono::TimeDelta;
use secrecy::SecretString;
use serde_json::json;

use territory_core::UserId;
use territory_integration_tests::{
    JWT_SECRET, empty_request, json_request, offline_app, read_body, read_json, send,
};
use territory_server::services::{JwtKeys, TokenPurpose};

fn keys() -> JwtKeys {
    JwtKeys::new(&SecretString::from(JWT_SECRET), TimeDelta::hours(1))
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_is_ok() {
    let app = offline_app();
    let response = send(&app, empty_request("GET", "/health", None)).await;

    let (status, body) = read_body(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = offline_app();
    let response = send(&app, empty_request("GET", "/api/nope", None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = offline_app();
    let mut request = empty_request("GET", "/health", None);
    request
        .headers_mut()
        .insert("x-request-id", "it-request-1".parse().unwrap());

    let response = send(&app, request).await;
    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "it-request-1"
    );
}

// ============================================================================
// Session cookie
// ============================================================================

#[tokio::test]
async fn test_me_without_cookie_is_unauthorized() {
    let app = offline_app();
    let response = send(&app, empty_request("GET", "/api/auth/me", None)).await;

    let (status, body) = read_json(response).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Not authenticated");
}

#[tokio::test]
async fn test_me_with_garbage_cookie_is_unauthorized() {
    let app = offline_app();
    let response = send(
        &app,
        empty_request("GET", "/api/auth/me", Some("sessionToken=not-a-jwt")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_with_foreign_signature_is_unauthorized() {
    let foreign = JwtKeys::new(
        &SecretString::from("Zr8#pQ2!vLm5@xT9wK3$nB7^cF4&hJ6*"),
        TimeDelta::hours(1),
    );
    let token = foreign
        .sign(UserId::new(1), TokenPurpose::Session, TimeDelta::hours(1))
        .unwrap();

    let app = offline_app();
    let cookie = format!("sessionToken={token}");
    let response = send(&app, empty_request("GET", "/api/auth/me", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_confirmation_token_is_not_a_session() {
    let token = keys()
        .sign(
            UserId::new(1),
            TokenPurpose::EmailConfirmation,
            TimeDelta::hours(1),
        )
        .unwrap();

    let app = offline_app();
    let cookie = format!("sessionToken={token}");
    let response = send(&app, empty_request("GET", "/api/auth/me", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_session_token_is_unauthorized() {
    let token = keys()
        .sign_at(
            UserId::new(1),
            TokenPurpose::Session,
            chrono::Utc::now() - TimeDelta::days(2),
            TimeDelta::days(1),
        )
        .unwrap();

    let app = offline_app();
    let cookie = format!("sessionToken={token}");
    let response = send(&app, empty_request("GET", "/api/auth/me", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_without_cookie_clears_cookie() {
    let app = offline_app();
    let response = send(&app, empty_request("POST", "/api/auth/logout", None)).await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(cookie.starts_with("sessionToken="));
    assert!(cookie.contains("Max-Age=0"));
    assert!(cookie.contains("HttpOnly"));
}

// ============================================================================
// Input validation
// ============================================================================

#[tokio::test]
async fn test_register_rejects_invalid_email() {
    let app = offline_app();
    let body = json!({ "email": "not-an-email", "password": "long enough password" });
    let response = send(&app, json_request("POST", "/api/auth/register", &body, None)).await;

    let (status, body) = read_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid email address");
}

#[tokio::test]
async fn test_register_rejects_short_password() {
    let app = offline_app();
    let body = json!({ "email": "someone@territoires.fr", "password": "short" });
    let response = send(&app, json_request("POST", "/api/auth/register", &body, None)).await;

    let (status, body) = read_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("at least 8"));
}

#[tokio::test]
async fn test_register_rejects_missing_fields() {
    let app = offline_app();
    let body = json!({ "email": "someone@territoires.fr" });
    let response = send(&app, json_request("POST", "/api/auth/register", &body, None)).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_confirm_email_rejects_garbage_token() {
    let app = offline_app();
    let body = json!({ "token": "garbage" });
    let response = send(
        &app,
        json_request("POST", "/api/auth/confirm-email", &body, None),
    )
    .await;

    let (status, body) = read_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_confirm_email_rejects_session_token() {
    let token = keys()
        .sign(UserId::new(1), TokenPurpose::Session, TimeDelta::hours(1))
        .unwrap();

    let app = offline_app();
    let body = json!({ "token": token });
    let response = send(
        &app,
        json_request("POST", "/api/auth/confirm-email", &body, None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Protected routes
// ============================================================================

#[tokio::test]
async fn test_protected_routes_require_session() {
    let app = offline_app();
    let requests = [
        empty_request("GET", "/api/territories", None),
        empty_request("GET", "/api/territories/12", None),
        empty_request("DELETE", "/api/territories/12", None),
        empty_request("GET", "/api/territories/12/frame", None),
        empty_request("GET", "/api/territories/12/images/miniature", None),
        empty_request("GET", "/api/config", None),
        empty_request("POST", "/api/auth/refresh", None),
        json_request(
            "POST",
            "/api/auth/change-password",
            &json!({ "currentPassword": "a", "newPassword": "b" }),
            None,
        ),
        json_request("PUT", "/api/config", &json!({}), None),
    ];

    for request in requests {
        let uri = request.uri().clone();
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }
}
