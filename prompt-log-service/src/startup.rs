//! Application startup and lifecycle management.
//!
//! Wires the interaction store, provider and gateway into one HTTP server.

use crate::config::PromptLogConfig;
use crate::handlers::{health, metrics, prompts};
use crate::services::providers::{OpenAiConfig, OpenAiTextProvider, TextProvider};
use crate::services::{
    AnalyticsAggregator, GenerationGateway, InteractionStore, PgInteractionStore,
};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::tracing::request_id_middleware;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state.
///
/// Every collaborator is passed in explicitly; nothing is looked up from
/// process-wide globals.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn InteractionStore>,
    pub gateway: GenerationGateway,
    pub analytics: AnalyticsAggregator,
}

impl AppState {
    pub fn new(
        provider: Arc<dyn TextProvider>,
        store: Arc<dyn InteractionStore>,
        model: impl Into<String>,
        provider_timeout: Duration,
    ) -> Self {
        Self {
            gateway: GenerationGateway::new(provider, store.clone(), model, provider_timeout),
            analytics: AnalyticsAggregator::new(store.clone()),
            store,
        }
    }
}

/// Build the HTTP router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(metrics::metrics))
        .route("/prompts/generate", post(prompts::generate))
        .route("/prompts/regenerate", post(prompts::regenerate))
        .route("/prompts/history", get(prompts::history))
        .route("/prompts/metrics", get(prompts::usage_metrics))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    http_port: u16,
    http_listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with PostgreSQL and OpenAI from configuration.
    pub async fn build(config: PromptLogConfig) -> Result<Self, AppError> {
        let store = PgInteractionStore::connect(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to PostgreSQL: {}", e);
            e
        })?;

        store.run_migrations().await.map_err(|e| {
            tracing::error!("Failed to run database migrations: {}", e);
            e
        })?;

        let provider = OpenAiTextProvider::new(OpenAiConfig {
            api_key: config.provider.api_key.clone(),
            base_url: config.provider.base_url.clone(),
            timeout: config.provider.timeout(),
        })?;

        tracing::info!(
            model = %config.provider.model,
            timeout_secs = config.provider.timeout_secs,
            "Initialized OpenAI text provider"
        );

        let state = AppState::new(
            Arc::new(provider),
            Arc::new(store),
            config.provider.model.clone(),
            config.provider.timeout(),
        );

        Self::with_state(state, config.common.port).await
    }

    /// Bind the HTTP listener for an already wired state (port 0 = random port for testing).
    pub async fn with_state(state: AppState, port: u16) -> Result<Self, AppError> {
        let http_addr = SocketAddr::from(([0, 0, 0, 0], port));
        let http_listener = TcpListener::bind(http_addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", http_addr, e);
            AppError::from(e)
        })?;
        let http_port = http_listener.local_addr()?.port();

        tracing::info!("Prompt log service: HTTP on port {}", http_port);

        Ok(Self {
            http_port,
            http_listener,
            state,
        })
    }

    /// Get the HTTP port the server is listening on.
    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    /// Run the application until a shutdown signal arrives.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = build_router(self.state);

        axum::serve(self.http_listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| {
                tracing::error!("HTTP server error: {}", e);
                std::io::Error::other(format!("HTTP server error: {}", e))
            })
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
