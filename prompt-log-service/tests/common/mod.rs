//! Common test utilities for prompt-log-service integration tests.
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use prompt_log_service::services::providers::MockTextProvider;
use prompt_log_service::services::InMemoryInteractionStore;
use prompt_log_service::startup::{build_router, AppState};
use std::sync::{Arc, Once};
use std::time::Duration;
use tower::util::ServiceExt;

static INIT: Once = Once::new();

pub const TEST_MODEL: &str = "gpt-4o-mini";

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,prompt_log_service=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryInteractionStore>,
    pub provider: Arc<MockTextProvider>,
}

/// Build the router over an in-memory store and the given mock provider.
pub fn spawn_app_with(provider: MockTextProvider, provider_timeout: Duration) -> TestApp {
    init_tracing();

    let provider = Arc::new(provider);
    let store = Arc::new(InMemoryInteractionStore::new());
    let state = AppState::new(provider.clone(), store.clone(), TEST_MODEL, provider_timeout);

    TestApp {
        router: build_router(state),
        store,
        provider,
    }
}

pub fn spawn_app() -> TestApp {
    spawn_app_with(MockTextProvider::new(), Duration::from_secs(5))
}

impl TestApp {
    pub async fn post_prompt(&self, path: &str, prompt: &str) -> (StatusCode, serde_json::Value) {
        let body = serde_json::json!({ "prompt": prompt }).to_string();
        self.send(
            Request::builder()
                .method("POST")
                .uri(path)
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
    }

    pub async fn get_json(&self, path: &str) -> (StatusCode, serde_json::Value) {
        self.send(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };
        (status, json)
    }
}
