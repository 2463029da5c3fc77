#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use servwatch_alerting::{AlertEngine, PgAlertStore};
use servwatch_api::auth::jwt::{generate_access_token, JwtConfig};
use servwatch_api::config::ServerConfig;
use servwatch_api::router::build_app_router;
use servwatch_api::state::AppState;
use servwatch_core::threshold::ThresholdDefinition;
use servwatch_db::models::server::{CreateServer, Server};
use servwatch_db::models::threshold::AlertThreshold;
use servwatch_db::repositories::{ServerRepo, ThresholdRepo};
use servwatch_events::{EventBus, NotificationDispatcher};

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        metrics_retention_days: 30,
        event_bus_capacity: 1024,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 60,
        },
    }
}

/// Application state over `pool` with no notification channels.
pub fn build_test_state(pool: PgPool) -> AppState {
    let engine = AlertEngine::new(
        Arc::new(PgAlertStore::new(pool.clone())),
        Arc::new(NotificationDispatcher::new(Duration::from_secs(1))),
    );
    AppState {
        pool,
        config: Arc::new(test_config()),
        event_bus: Arc::new(EventBus::default()),
        engine: Arc::new(engine),
    }
}

/// Build the full application router, the same way `main.rs` does.
pub fn build_test_app(pool: PgPool) -> Router {
    app_for(build_test_state(pool))
}

pub fn app_for(state: AppState) -> Router {
    build_app_router(state, &test_config())
}

/// A valid access token for `user_id` with `role`.
pub fn token(user_id: i64, role: &str) -> String {
    generate_access_token(user_id, role, &test_config().jwt).expect("token generation should succeed")
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    send(app, Method::POST, uri, None, Some(body)).await
}

pub async fn post_json_auth(app: Router, uri: &str, token: &str, body: serde_json::Value) -> Response {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn put_json_auth(app: Router, uri: &str, token: &str, body: serde_json::Value) -> Response {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

pub async fn put_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::PUT, uri, Some(token), None).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::DELETE, uri, Some(token), None).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub async fn create_server(pool: &PgPool, hostname: &str) -> Server {
    ServerRepo::create(
        pool,
        &CreateServer {
            hostname: hostname.to_string(),
            ip_address: "10.0.0.5".to_string(),
            description: String::new(),
        },
    )
    .await
    .expect("server creation should succeed")
}

/// A CPU threshold definition with no channels and no cooldown.
pub fn cpu_definition(server_id: Option<i64>, operator: &str, value: f64) -> ThresholdDefinition {
    serde_json::from_value(serde_json::json!({
        "name": "High CPU",
        "metric_type": "cpu",
        "operator": operator,
        "value": value,
        "severity": "critical",
        "cooldown_minutes": 0,
        "server_id": server_id,
    }))
    .expect("definition should deserialize")
}

pub async fn create_threshold(pool: &PgPool, def: &ThresholdDefinition) -> AlertThreshold {
    ThresholdRepo::create(pool, def, None)
        .await
        .expect("threshold creation should succeed")
}

/// JSON body for `POST /api/v1/metrics`.
pub fn metric_body(server_id: i64, cpu_usage: f64) -> serde_json::Value {
    serde_json::json!({
        "server_id": server_id,
        "cpu_usage": cpu_usage,
        "memory_total": 8_000,
        "memory_used": 2_000,
        "memory_free": 6_000,
        "disk_total": 100_000,
        "disk_used": 40_000,
        "disk_free": 60_000,
        "net_upload": 1_048_576,
        "net_download": 2_097_152,
    })
}
