//! End-to-end flows against a real `MySQL` database.
//!
//! Skipped unless `TEST_DATABASE_URL` points at a database the tests may
//! migrate and write to.

#![allow(clippy::unwrap_used)]

use axum::Router;
use chrono::TimeDelta;
use axum::http::{StatusCode, header};
use serde_json::{Value, json};

use territory_core::Email;
use territory_integration_tests::{
    database_app, empty_request, json_request, read_body, read_json, send, set_cookie_pair,
    unique_email,
};

use territory_server::db::{PasswordResetTokenRepository, SessionRepository, UserRepository};
use territory_server::services::auth::sha256_hex;
use territory_server::services::maintenance::sweep_expired;

const PASSWORD: &str = "correct horse battery";

/// 1x1 transparent PNG.
const PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

/// Register a fresh account and return its email and session cookie.
async fn signed_in(app: &Router) -> (String, String) {
    let email = unique_email();
    let body = json!({ "email": email, "password": PASSWORD, "locale": "fr" });
    let response = send(app, json_request("POST", "/api/auth/register", &body, None)).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = json!({ "email": email, "password": PASSWORD });
    let response = send(app, json_request("POST", "/api/auth/login", &body, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = set_cookie_pair(&response).unwrap();
    assert!(cookie.starts_with("sessionToken="));

    (email, cookie)
}

fn square(num: &str) -> Value {
    json!({
        "num": num,
        "name": "Quartier de la gare",
        "polygon": [
            { "lat": 48.80, "lon": 2.30 },
            { "lat": 48.80, "lon": 2.32 },
            { "lat": 48.82, "lon": 2.32 },
            { "lat": 48.82, "lon": 2.30 },
        ],
        "rotation": 15.0,
    })
}

#[tokio::test]
async fn test_account_lifecycle() {
    let Some((app, _pool)) = database_app().await else {
        return;
    };
    let (email, cookie) = signed_in(&app).await;

    // Current user
    let response = send(&app, empty_request("GET", "/api/auth/me", Some(&cookie))).await;
    let (status, me) = read_json(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], email.as_str());
    assert_eq!(me["emailVerified"], false);
    assert!(me.get("passwordHash").is_none());

    // Duplicate registration
    let body = json!({ "email": email, "password": PASSWORD });
    let response = send(&app, json_request("POST", "/api/auth/register", &body, None)).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Wrong password
    let body = json!({ "email": email, "password": "wrong password!" });
    let response = send(&app, json_request("POST", "/api/auth/login", &body, None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Refresh rotates the token
    let response = send(&app, empty_request("POST", "/api/auth/refresh", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let rotated = set_cookie_pair(&response).unwrap();
    assert_ne!(rotated, cookie);

    let response = send(&app, empty_request("GET", "/api/auth/me", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Logout closes the session
    let response = send(&app, empty_request("POST", "/api/auth/logout", Some(&rotated))).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(&app, empty_request("GET", "/api/auth/me", Some(&rotated))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_change_password() {
    let Some((app, _pool)) = database_app().await else {
        return;
    };
    let (email, cookie) = signed_in(&app).await;

    let body = json!({ "currentPassword": "not my password", "newPassword": "new long password" });
    let response = send(
        &app,
        json_request("POST", "/api/auth/change-password", &body, Some(&cookie)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = json!({ "currentPassword": PASSWORD, "newPassword": "new long password" });
    let response = send(
        &app,
        json_request("POST", "/api/auth/change-password", &body, Some(&cookie)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // The current session survives
    let response = send(&app, empty_request("GET", "/api/auth/me", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json!({ "email": email, "password": PASSWORD });
    let response = send(&app, json_request("POST", "/api/auth/login", &body, None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = json!({ "email": email, "password": "new long password" });
    let response = send(&app, json_request("POST", "/api/auth/login", &body, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_forgot_password_hides_unknown_accounts() {
    let Some((app, _pool)) = database_app().await else {
        return;
    };

    let body = json!({ "email": unique_email() });
    let response = send(
        &app,
        json_request("POST", "/api/auth/forgot-password", &body, None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let body = json!({ "token": "00".repeat(32), "password": "new long password" });
    let response = send(
        &app,
        json_request("POST", "/api/auth/reset-password", &body, None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reset_link_works_once_under_concurrency() {
    let Some((app, pool)) = database_app().await else {
        return;
    };
    let (email, _) = signed_in(&app).await;

    let token = "ab".repeat(32);
    let tokens = PasswordResetTokenRepository::new(&pool);
    tokens
        .create(
            &Email::parse(&email).unwrap(),
            &sha256_hex(&token),
            chrono::Utc::now() + TimeDelta::minutes(30),
        )
        .await
        .unwrap();

    let first = json!({ "token": token, "password": "first new password" });
    let second = json!({ "token": token, "password": "second new password" });
    let (a, b) = tokio::join!(
        send(&app, json_request("POST", "/api/auth/reset-password", &first, None)),
        send(&app, json_request("POST", "/api/auth/reset-password", &second, None)),
    );

    let mut statuses = [a.status(), b.status()];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::NO_CONTENT, StatusCode::BAD_REQUEST]);
    assert!(tokens.get_by_hash(&sha256_hex(&token)).await.unwrap().is_none());

    // Exactly one of the two passwords took
    let mut logins = 0;
    for password in ["first new password", "second new password"] {
        let body = json!({ "email": email, "password": password });
        let response = send(&app, json_request("POST", "/api/auth/login", &body, None)).await;
        if response.status() == StatusCode::OK {
            logins += 1;
        }
    }
    assert_eq!(logins, 1);
}

#[tokio::test]
async fn test_territory_lifecycle() {
    let Some((app, _pool)) = database_app().await else {
        return;
    };
    let (_, cookie) = signed_in(&app).await;

    // Create
    let response = send(
        &app,
        json_request("POST", "/api/territories", &square("12"), Some(&cookie)),
    )
    .await;
    let (status, created) = read_json(response).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["num"], "12");
    assert_eq!(created["rotation"], 15.0);
    assert!(created["boundingBox"].is_object());

    // Numbers are unique per user
    let response = send(
        &app,
        json_request("POST", "/api/territories", &square("12"), Some(&cookie)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Another user cannot see it
    let (_, other) = signed_in(&app).await;
    let response = send(&app, empty_request("GET", "/api/territories/12", Some(&other))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Partial update
    let body = json!({ "name": "Centre" });
    let response = send(
        &app,
        json_request("PUT", "/api/territories/12", &body, Some(&cookie)),
    )
    .await;
    let (status, updated) = read_json(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Centre");
    assert_eq!(updated["polygon"], created["polygon"]);

    // Frame
    let response = send(
        &app,
        empty_request("GET", "/api/territories/12/frame", Some(&cookie)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Image upload and download
    let mut upload = empty_request("PUT", "/api/territories/12/images/miniature", Some(&cookie));
    *upload.body_mut() = axum::body::Body::from(PNG);
    let response = send(&app, upload).await;
    assert!(response.status().is_success());

    let response = send(
        &app,
        empty_request("GET", "/api/territories/12/images/miniature", Some(&cookie)),
    )
    .await;
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/png"
    );
    let (status, bytes) = read_body(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, PNG);

    // Listing inlines the miniature on request
    let response = send(
        &app,
        empty_request("GET", "/api/territories?miniatures=true", Some(&cookie)),
    )
    .await;
    let (status, list) = read_json(response).await;
    assert_eq!(status, StatusCode::OK);
    let entry = &list.as_array().unwrap()[0];
    assert!(
        entry["miniature"]
            .as_str()
            .unwrap()
            .starts_with("data:image/png;base64,")
    );

    // Not an image
    let mut upload = empty_request("PUT", "/api/territories/12/images/full", Some(&cookie));
    *upload.body_mut() = axum::body::Body::from("plain text");
    let response = send(&app, upload).await;
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    // Delete removes the images too
    let response = send(
        &app,
        empty_request("DELETE", "/api/territories/12", Some(&cookie)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(
        &app,
        empty_request("GET", "/api/territories/12/images/miniature", Some(&cookie)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_image_settings() {
    let Some((app, _pool)) = database_app().await else {
        return;
    };
    let (_, cookie) = signed_in(&app).await;

    let response = send(&app, empty_request("GET", "/api/config", Some(&cookie))).await;
    let (status, defaults) = read_json(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(defaults["ratioX"], 3);

    let body = json!({ "ratioX": 4, "ratioY": 3, "strokeColor": "#112233" });
    let response = send(&app, json_request("PUT", "/api/config", &body, Some(&cookie))).await;
    let (status, saved) = read_json(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["ratioX"], 4);
    assert_eq!(saved["strokeColor"], "#112233");

    let body = json!({ "ratioX": 0 });
    let response = send(&app, json_request("PUT", "/api/config", &body, Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_session_rows_until_deleted_or_expired() {
    let Some((_app, pool)) = database_app().await else {
        return;
    };
    let users = UserRepository::new(&pool);
    let sessions = SessionRepository::new(&pool);
    let now = chrono::Utc::now();

    let email = Email::parse(&unique_email()).unwrap();
    let user = users.create(&email, "not-a-real-hash").await.unwrap();

    let live = sessions
        .create(user.id, &format!("live-{}", user.id), now + TimeDelta::hours(1))
        .await
        .unwrap();
    let stale = sessions
        .create(user.id, &format!("stale-{}", user.id), now - TimeDelta::seconds(5))
        .await
        .unwrap();
    assert_eq!(sessions.get_by_id(live.id).await.unwrap().unwrap(), live);

    let report = sweep_expired(&pool, now).await.unwrap();
    assert!(report.sessions >= 1);
    assert!(sessions.get_by_id(stale.id).await.unwrap().is_none());
    assert!(sessions.get_by_id(live.id).await.unwrap().is_some());

    assert!(sessions.delete(live.id).await.unwrap());
    assert!(sessions.get_by_id(live.id).await.unwrap().is_none());
    assert!(!sessions.delete(live.id).await.unwrap());

    assert!(users.delete(user.id).await.unwrap());
}

#[tokio::test]
async fn test_territory_numbers_are_case_sensitive() {
    let Some((app, _pool)) = database_app().await else {
        return;
    };
    let (_, cookie) = signed_in(&app).await;

    for num in ["B-4", "b-4"] {
        let response = send(
            &app,
            json_request("POST", "/api/territories", &square(num), Some(&cookie)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED, "{num}");
    }

    let response = send(&app, empty_request("GET", "/api/territories/b-4", Some(&cookie))).await;
    let (status, territory) = read_json(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(territory["num"], "b-4");
}
