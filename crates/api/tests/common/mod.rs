#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;

use formcraft_api::auth::jwt::JwtConfig;
use formcraft_api::config::ServerConfig;
use formcraft_api::router::build_app_router;
use formcraft_api::state::AppState;

pub const TEST_PASSWORD: &str = "correct horse battery";

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin (matching the dev default)
/// and a 30-second request timeout.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "integration-test-secret".to_string(),
            expiry_days: 7,
        },
    }
}

/// The production router over `pool`, so tests run the same middleware stack.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
    };
    build_app_router(state, &config)
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(app: Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    send(app, Method::POST, uri, None, Some(body)).await
}

pub async fn post_json_auth(app: Router, uri: &str, body: Value, token: &str) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn put_json_auth(app: Router, uri: &str, body: Value, token: &str) -> Response<Body> {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, Some(token), None).await
}

pub fn registration(email: &str) -> Value {
    json!({
        "name": "Test User",
        "email": email,
        "password": TEST_PASSWORD,
        "phone": "555-0100",
        "profession": "Researcher",
    })
}

/// Register `email` through the API and return its bearer token.
pub async fn register_user(app: Router, email: &str) -> String {
    let response = post_json(app, "/api/auth/register", registration(email)).await;
    assert_eq!(response.status(), 201, "registration of {email} should succeed");
    let json = body_json(response).await;
    json["token"].as_str().unwrap().to_string()
}

pub fn satisfaction_survey() -> Value {
    json!({
        "title": "Satisfaction",
        "description": "Quarterly check-in",
        "questions": [
            {
                "title": "How satisfied are you?",
                "type": "scale",
                "required": true,
                "minValue": 1,
                "maxValue": 5
            },
            {
                "title": "Favourite feature",
                "type": "multiple_choice",
                "required": false,
                "alternatives": [
                    { "text": "Speed", "isCorrect": false },
                    { "text": "Price", "isCorrect": false }
                ]
            }
        ]
    })
}
