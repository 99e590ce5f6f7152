//! In-process HTTP tests of the router over the in-memory repository

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use tillwatch_server::{
    api,
    config::{AppConfig, AuthConfig, DatabaseConfig, LoggingConfig, MonitoringConfig, ServerConfig},
    models::user::{Role, UserClaims},
    repository::MemoryRepository,
    services::Services,
    AppState,
};

const SECRET: &str = "test-secret";

async fn app() -> Router {
    let repo = Arc::new(MemoryRepository::new());
    repo.add_store(1, "Westlands").await;

    let config = AppConfig {
        server: ServerConfig::default(),
        database: DatabaseConfig::default(),
        auth: AuthConfig {
            jwt_secret: SECRET.to_string(),
        },
        logging: LoggingConfig::default(),
        monitoring: MonitoringConfig::default(),
    };
    let services = Services::new(repo, config.monitoring.clone());

    api::create_router(AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    })
}

fn token(role: Role) -> String {
    let now = chrono::Utc::now().timestamp();
    UserClaims {
        sub: "back-office".to_string(),
        user_id: 3,
        role,
        exp: now + 600,
        iat: now,
    }
    .create_token(SECRET)
    .unwrap()
}

async fn call(app: &Router, method: Method, uri: &str, role: Option<Role>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(role) = role {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token(role)));
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
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn new_terminal() -> Value {
    json!({
        "store_id": 1,
        "name": "Bar till",
        "terminal_type": "till",
        "business_mode": "restaurant"
    })
}

#[tokio::test]
async fn test_health_is_public() {
    let app = app().await;
    let (status, body) = call(&app, Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = call(&app, Method::GET, "/api/v1/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_terminal_routes_need_a_token() {
    let app = app().await;
    let (status, body) = call(&app, Method::POST, "/api/v1/terminals", None, Some(new_terminal())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "NotAuthorized");

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/v1/terminals",
        Some(Role::Cashier),
        Some(new_terminal()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_register_heartbeat_and_health_flow() {
    let app = app().await;

    let (status, terminal) = call(
        &app,
        Method::POST,
        "/api/v1/terminals",
        Some(Role::Manager),
        Some(new_terminal()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(terminal["code"], "TILL-001");
    assert_eq!(terminal["lifecycle"], "active");
    let id = terminal["id"].as_i64().unwrap();

    let (_, health) = call(&app, Method::GET, &format!("/api/v1/terminals/{}/health", id), Some(Role::Device), None).await;
    assert_eq!(health["status"], "offline");

    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/api/v1/terminals/{}/heartbeat", id),
        Some(Role::Device),
        Some(json!({ "ip_address": "192.168.0.14", "current_user_id": 11 })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, health) = call(&app, Method::GET, &format!("/api/v1/terminals/{}/health", id), Some(Role::Device), None).await;
    assert_eq!(health["status"], "online");
    assert_eq!(health["is_online"], true);

    let (status, summary) = call(&app, Method::GET, "/api/v1/stores/1/health", Some(Role::Manager), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["total_terminals"], 1);
    assert_eq!(summary["health_percentage"], 100.0);
}

#[tokio::test]
async fn test_error_statuses() {
    let app = app().await;

    let (status, body) = call(&app, Method::GET, "/api/v1/terminals/77", Some(Role::Admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NoSuchTerminal");

    let mut unknown_store = new_terminal();
    unknown_store["store_id"] = json!(9);
    let (status, body) = call(&app, Method::POST, "/api/v1/terminals/register", Some(Role::Admin), Some(unknown_store)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NoSuchStore");

    let (status, body) = call(&app, Method::GET, "/api/v1/stores/9/health", Some(Role::Admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NoSuchStore");

    let (status, _) = call(
        &app,
        Method::GET,
        "/api/v1/stores/9/terminal-codes/register",
        Some(Role::Admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let mut with_code = new_terminal();
    with_code["code"] = json!("TILL-001");
    let (status, _) = call(&app, Method::POST, "/api/v1/terminals", Some(Role::Admin), Some(with_code.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = call(&app, Method::POST, "/api/v1/terminals", Some(Role::Admin), Some(with_code)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "DuplicateCode");
}

#[tokio::test]
async fn test_code_preview_and_last_check() {
    let app = app().await;

    let (status, body) = call(
        &app,
        Method::GET,
        "/api/v1/stores/1/terminal-codes/kitchen_display",
        Some(Role::Admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], "KDS-001");

    let (_, body) = call(&app, Method::GET, "/api/v1/health/last-check", Some(Role::Admin), None).await;
    assert!(body["last_check_time"].is_null());

    let (status, run) = call(&app, Method::POST, "/api/v1/stores/1/health/check", Some(Role::Admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(run["terminals_evaluated"], 0);

    let (_, body) = call(&app, Method::GET, "/api/v1/health/last-check", Some(Role::Admin), None).await;
    assert!(body["last_check_time"].is_string());
}
