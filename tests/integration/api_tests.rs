//! API integration tests against a running server
//!
//! Needs a server on localhost:8080 backed by a migrated database with a
//! store id 1, and `JWT_SECRET` matching the server's secret.

use reqwest::Client;
use serde_json::{json, Value};
use tillwatch_server::models::user::{Role, UserClaims};

const BASE_URL: &str = "http://localhost:8080/api/v1";

fn auth_token() -> String {
    let secret = std::env::var("JWT_SECRET")
        .unwrap_or_else(|_| "change-this-secret-in-production".to_string());
    let now = chrono::Utc::now().timestamp();
    UserClaims {
        sub: "integration".to_string(),
        user_id: 1,
        role: Role::Admin,
        exp: now + 600,
        iat: now,
    }
    .create_token(&secret)
    .expect("Failed to create token")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_readiness_reaches_database() {
    let client = Client::new();

    let response = client
        .get(format!("{}/ready", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
}

#[tokio::test]
#[ignore]
async fn test_missing_token_is_rejected() {
    let client = Client::new();

    let response = client
        .get(format!("{}/stores/1/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_register_then_heartbeat() {
    let client = Client::new();
    let token = auth_token();

    let response = client
        .post(format!("{}/terminals/register", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({
            "store_id": 1,
            "name": "Integration register",
            "terminal_type": "register",
            "business_mode": "supermarket",
            "ip_address": "127.0.0.1"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201);
    let terminal: Value = response.json().await.expect("Failed to parse response");
    assert!(terminal["code"].as_str().unwrap_or_default().starts_with("REG-"));
    let id = terminal["id"].as_i64().expect("No id in response");

    let response = client
        .post(format!("{}/terminals/{}/heartbeat", BASE_URL, id))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "ip_address": "127.0.0.1" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 204);

    let response = client
        .get(format!("{}/terminals/{}/health", BASE_URL, id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    let health: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(health["status"], "online");

    let response = client
        .post(format!("{}/terminals/{}/deactivate", BASE_URL, id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
}

#[tokio::test]
#[ignore]
async fn test_store_health_summary() {
    let client = Client::new();
    let token = auth_token();

    let response = client
        .get(format!("{}/stores/1/health", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    let total = body["total_terminals"].as_u64().unwrap();
    let parts = ["online_terminals", "offline_terminals", "inactive_terminals", "unknown_terminals"]
        .iter()
        .map(|key| body[*key].as_u64().unwrap())
        .sum::<u64>();
    assert_eq!(parts, total);
}
