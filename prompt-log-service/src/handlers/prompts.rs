//! Generation, history and analytics endpoints.

use crate::error::GatewayError;
use crate::models::{MetricsSnapshot, PromptInteraction};
use crate::services::log_store::HISTORY_LIMIT;
use crate::services::Generation;
use crate::startup::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct PromptRequest {
    #[validate(length(min = 1, message = "Prompt cannot be empty"))]
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub response: String,
    /// False when the answer was produced but could not be logged.
    pub recorded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl From<Generation> for GenerateResponse {
    fn from(generation: Generation) -> Self {
        Self {
            response: generation.response,
            recorded: true,
            warning: None,
        }
    }
}

fn respond(outcome: Result<Generation, GatewayError>) -> Result<Json<GenerateResponse>, AppError> {
    match outcome {
        Ok(generation) => Ok(Json(generation.into())),
        Err(GatewayError::NotRecorded { response, source }) => Ok(Json(GenerateResponse {
            response,
            recorded: false,
            warning: Some(source.to_string()),
        })),
        Err(GatewayError::EmptyPrompt) => Err(AppError::BadRequest(anyhow::anyhow!(
            "Prompt must not be empty"
        ))),
        Err(GatewayError::Generation(err)) => Err(err.into()),
    }
}

#[tracing::instrument(skip(state, request))]
pub async fn generate(
    State(state): State<AppState>,
    Json(request): Json<PromptRequest>,
) -> Result<Json<GenerateResponse>, AppError> {
    request.validate()?;
    respond(state.gateway.generate(&request.prompt, false).await)
}

#[tracing::instrument(skip(state, request))]
pub async fn regenerate(
    State(state): State<AppState>,
    Json(request): Json<PromptRequest>,
) -> Result<Json<GenerateResponse>, AppError> {
    request.validate()?;
    respond(state.gateway.regenerate(&request.prompt).await)
}

#[tracing::instrument(skip(state))]
pub async fn history(
    State(state): State<AppState>,
) -> Result<Json<Vec<PromptInteraction>>, AppError> {
    let interactions = state.store.recent(HISTORY_LIMIT).await?;
    Ok(Json(interactions))
}

#[tracing::instrument(skip(state))]
pub async fn usage_metrics(
    State(state): State<AppState>,
) -> Result<Json<MetricsSnapshot>, AppError> {
    let snapshot = state.analytics.compute_metrics().await?;
    Ok(Json(snapshot))
}
