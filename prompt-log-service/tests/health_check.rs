//! End-to-end tests against a running server bound to a random port.
//!
//! Uses the in-memory store and mock provider, so no external services are needed.
//! Run with: cargo test -p prompt-log-service --test health_check

use prompt_log_service::services::providers::MockTextProvider;
use prompt_log_service::services::InMemoryInteractionStore;
use prompt_log_service::startup::{AppState, Application};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// Spawn the application on a random port and return the port number.
async fn spawn_app() -> u16 {
    let state = AppState::new(
        Arc::new(MockTextProvider::new()),
        Arc::new(InMemoryInteractionStore::new()),
        "gpt-4o-mini",
        Duration::from_secs(5),
    );

    let app = Application::with_state(state, 0)
        .await
        .expect("Failed to build application");

    let port = app.http_port();

    // Spawn the server in the background
    tokio::spawn(async move {
        let _ = app.run_until_stopped().await;
    });

    port
}

#[tokio::test]
async fn health_check_returns_ok() {
    let port = spawn_app().await;
    let client = Client::new();

    let response = client
        .get(format!("http://localhost:{}/health", port))
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    assert!(response.headers().contains_key("x-request-id"));

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "prompt-log-service");
    assert_eq!(body["model"], "gpt-4o-mini");
}

#[tokio::test]
async fn generate_round_trip_over_http() {
    let port = spawn_app().await;
    let client = Client::new();

    let response = client
        .post(format!("http://localhost:{}/prompts/generate", port))
        .json(&serde_json::json!({ "prompt": "ping" }))
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let history: serde_json::Value = client
        .get(format!("http://localhost:{}/prompts/history", port))
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse JSON");

    assert_eq!(history[0]["prompt"], "ping");
    assert_eq!(history[0]["response"], "Mock response for: ping");
}
