//! HTTP-level integration tests for registration, login and `/users/me`.

mod common;

use axum::http::StatusCode;
use common::{body_json, get, get_auth, post_json, register_user, registration, TEST_PASSWORD};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "../db/migrations")]
async fn register_returns_token_and_user(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = post_json(app, "/api/auth/register", registration("  Ada@Example.com ")).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["message"], "User registered successfully");
    assert!(json["token"].is_string());
    assert_eq!(json["user"]["email"], "ada@example.com");
    assert_eq!(json["user"]["name"], "Test User");
    assert!(json["user"]["createdAt"].is_string());
    assert!(json["user"].get("passwordHash").is_none());
    assert!(json["user"].get("password_hash").is_none());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn duplicate_email_is_conflict(pool: PgPool) {
    let app = common::build_test_app(pool);
    register_user(app.clone(), "dup@example.com").await;

    let response = post_json(app, "/api/auth/register", registration("DUP@example.com")).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["code"], "CONFLICT");
    assert_eq!(json["message"], "Email is already in use");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn invalid_registration_lists_field_errors(pool: PgPool) {
    let app = common::build_test_app(pool);
    let body = json!({
        "name": "Al",
        "email": "not-an-email",
        "password": "short",
        "phone": "555",
        "profession": "Dev",
    });

    let response = post_json(app, "/api/auth/register", body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    let fields: Vec<&str> = json["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"name"));
    assert!(fields.contains(&"email"));
    assert!(fields.contains(&"password"));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn login_success(pool: PgPool) {
    let app = common::build_test_app(pool);
    register_user(app.clone(), "login@example.com").await;

    let body = json!({ "email": "Login@Example.com", "password": TEST_PASSWORD });
    let response = post_json(app, "/api/auth/login", body).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["message"], "Login successful");
    assert!(json["token"].is_string());
    assert_eq!(json["user"]["email"], "login@example.com");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn bad_credentials_share_one_message(pool: PgPool) {
    let app = common::build_test_app(pool);
    register_user(app.clone(), "creds@example.com").await;

    let wrong_password = json!({ "email": "creds@example.com", "password": "not the password" });
    let response = post_json(app.clone(), "/api/auth/login", wrong_password).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let first = body_json(response).await;

    let unknown_email = json!({ "email": "nobody@example.com", "password": TEST_PASSWORD });
    let response = post_json(app, "/api/auth/login", unknown_email).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let second = body_json(response).await;

    assert_eq!(first["message"], "Invalid email or password");
    assert_eq!(first["message"], second["message"]);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn me_returns_current_user(pool: PgPool) {
    let app = common::build_test_app(pool);
    let token = register_user(app.clone(), "me@example.com").await;

    let response = get_auth(app, "/api/users/me", &token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["user"]["email"], "me@example.com");
    assert_eq!(json["user"]["profession"], "Researcher");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn me_requires_token(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = get(app.clone(), "/api/users/me").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Access denied. No token provided");

    let response = get_auth(app, "/api/users/me", "garbage").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Invalid or expired token");
}
