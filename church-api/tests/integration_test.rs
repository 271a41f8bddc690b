//! Integration tests for the HTTP surface over the in-memory account store
//!
//! These tests drive the full router, including the admin extractor and
//! token handling, without binding a socket.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use church_api::{build_router, ApiConfig, AppState};

fn app() -> Router {
    let config = ApiConfig {
        jwt_secret: "integration-secret".to_string(),
        ..ApiConfig::default()
    };
    build_router(AppState::in_memory(config))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn login(app: &Router, username: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "username": username, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    body["access_token"].as_str().unwrap().to_string()
}

/// Registers `jane` as the first administrator and returns her token.
async fn bootstrap_admin(app: &Router) -> String {
    let (status, _) = send(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "username": "jane", "password": "jane-pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    login(app, "jane", "jane-pw").await
}

async fn create_user(app: &Router, token: &str, name: &str, role: &str) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/users",
        Some(token),
        Some(json!({ "name": name, "password": "pw", "role": role, "status": "active" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);
    body["user"].clone()
}

#[tokio::test]
async fn test_health_and_index() {
    let app = app();

    let (status, body) = send(&app, Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["timestamp"].is_string());

    let (status, body) = send(&app, Method::GET, "/api", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["endpoints"]["users"], "/api/users/*");
}

#[tokio::test]
async fn test_admin_manages_users() {
    let app = app();
    let token = bootstrap_admin(&app).await;

    let bob = create_user(&app, &token, "bob", "editor").await;
    assert_eq!(bob["name"], "bob");
    assert_eq!(bob["role"], "editor");
    assert_eq!(bob["status"], "active");
    assert_eq!(bob["email"], "bob@dciukajuki.org");

    let (status, body) = send(&app, Method::GET, "/api/users", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let users = body["users"].as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0]["role"], "admin");
    assert!(users[0]["lastLogin"].is_string());

    let id = bob["id"].as_i64().unwrap();
    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/users/{}/status", id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["status"], "inactive");

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/users/{}", id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        Method::DELETE,
        &format!("/api/users/{}", id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_editor_is_forbidden() {
    let app = app();
    let token = bootstrap_admin(&app).await;
    create_user(&app, &token, "bob", "editor").await;
    let bob_token = login(&app, "bob", "pw").await;

    let (status, body) = send(&app, Method::GET, "/api/users", Some(&bob_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "AUTH_FORBIDDEN");
    assert_eq!(body["message"], "Admins only");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/users",
        Some(&bob_token),
        Some(json!({ "name": "eve", "password": "pw", "role": "admin" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The editor can still read its own profile.
    let (status, body) = send(&app, Method::GET, "/api/auth/profile", Some(&bob_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "bob");
    assert_eq!(body["is_admin"], false);
}

#[tokio::test]
async fn test_missing_and_malformed_tokens() {
    let app = app();
    bootstrap_admin(&app).await;

    let (status, body) = send(&app, Method::GET, "/api/users", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "AUTH_UNAUTHORIZED");

    let (status, _) = send(&app, Method::GET, "/api/users", Some("not-a-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::GET, "/api/auth/verify", Some("a.b.c"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::GET, "/api/auth/profile", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_from_other_secret_is_rejected() {
    let app = app();
    bootstrap_admin(&app).await;

    let other = build_router(AppState::in_memory(ApiConfig {
        jwt_secret: "another-secret".to_string(),
        ..ApiConfig::default()
    }));
    let foreign = bootstrap_admin(&other).await;

    let (status, _) = send(&app, Method::GET, "/api/users", Some(&foreign), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_verify_returns_identity() {
    let app = app();
    let token = bootstrap_admin(&app).await;

    let (status, body) = send(&app, Method::GET, "/api/auth/verify", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);
    assert_eq!(body["user"]["username"], "jane");
    assert_eq!(body["user"]["is_admin"], true);
    assert!(body["user"]["id"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn test_demoted_admin_keeps_access_until_relogin() {
    let app = app();
    let token = bootstrap_admin(&app).await;
    let mary = create_user(&app, &token, "mary", "admin").await;
    let mary_token = login(&app, "mary", "pw").await;

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/users/{}", mary["id"]),
        Some(&token),
        Some(json!({ "role": "editor" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "editor");

    // The flag frozen into the old token still grants access.
    let (status, _) = send(&app, Method::GET, "/api/users", Some(&mary_token), None).await;
    assert_eq!(status, StatusCode::OK);

    let fresh = login(&app, "mary", "pw").await;
    let (status, _) = send(&app, Method::GET, "/api/users", Some(&fresh), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_last_admin_cannot_be_deleted() {
    let app = app();
    let token = bootstrap_admin(&app).await;
    let (_, body) = send(&app, Method::GET, "/api/auth/verify", Some(&token), None).await;
    let jane_id = body["user"]["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        Method::DELETE,
        &format!("/api/users/{}", jane_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Cannot delete the last admin user");
}

#[tokio::test]
async fn test_registration_closes_after_first_admin() {
    let app = app();
    let token = bootstrap_admin(&app).await;
    let credentials = json!({ "username": "mary", "password": "pw" });

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(credentials.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        Some(&token),
        Some(credentials.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        Some(&token),
        Some(credentials),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Username already exists");
}

#[tokio::test]
async fn test_login_failures() {
    let app = app();
    bootstrap_admin(&app).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "username": "jane", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid credentials");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "username": "jane" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["details"].is_string());
}

#[tokio::test]
async fn test_profile_update() {
    let app = app();
    let token = bootstrap_admin(&app).await;

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/auth/profile",
        Some(&token),
        Some(json!({ "email": "jane@example.org" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "jane@example.org");
    assert_eq!(body["user"]["username"], "jane");
}

#[tokio::test]
async fn test_non_numeric_user_id_is_json_error() {
    let app = app();
    let token = bootstrap_admin(&app).await;

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/users/abc",
        Some(&token),
        Some(json!({ "role": "editor" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["message"], "Invalid user id");
    assert!(body["details"].is_string());

    let (status, body) = send(&app, Method::DELETE, "/api/users/abc", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) =
        send(&app, Method::PUT, "/api/users/1.5/status", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    // The admin check still runs first.
    let (status, _) = send(&app, Method::DELETE, "/api/users/abc", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
