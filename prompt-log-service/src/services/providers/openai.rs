//! OpenAI provider implementation.
//!
//! Sends a single user message to the chat completions endpoint and returns
//! the first choice's content.

use super::{ProviderResponse, TextProvider};
use crate::error::GenerationError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use std::time::Duration;

/// OpenAI API base URL.
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// OpenAI provider configuration.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
}

/// OpenAI chat completions provider.
pub struct OpenAiTextProvider {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiTextProvider {
    pub fn new(config: OpenAiConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn map_transport_error(&self, err: reqwest::Error) -> GenerationError {
        if err.is_timeout() {
            GenerationError::Timeout(format!(
                "no reply within {} ms",
                self.config.timeout.as_millis()
            ))
        } else {
            GenerationError::ProviderUnavailable(err.to_string())
        }
    }
}

/// Classify a non-success HTTP status from the provider.
fn status_error(status: StatusCode, body: &str) -> GenerationError {
    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            GenerationError::Timeout(format!("OpenAI API returned {}", status))
        }
        _ => GenerationError::ProviderUnavailable(format!("OpenAI API error {}: {}", status, body)),
    }
}

/// Extract the reply text from a chat completions body.
///
/// A missing choice or message content is an invalid response; an empty
/// string is a valid one.
pub fn parse_completion(body: &str) -> Result<String, GenerationError> {
    let parsed: ChatCompletionResponse = serde_json::from_str(body)
        .map_err(|e| GenerationError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

    parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| GenerationError::InvalidResponse("Response has no choices".to_string()))?
        .message
        .and_then(|m| m.content)
        .ok_or_else(|| {
            GenerationError::InvalidResponse("Response choice has no message content".to_string())
        })
}

#[async_trait]
impl TextProvider for OpenAiTextProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete(
        &self,
        model: &str,
        prompt: &str,
    ) -> Result<ProviderResponse, GenerationError> {
        let request = ChatCompletionRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        tracing::debug!(
            model = %model,
            prompt_len = prompt.len(),
            "Sending request to OpenAI API"
        );

        let response = self
            .client
            .post(self.api_url("chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        let text = parse_completion(&body)?;

        Ok(ProviderResponse { text })
    }

    async fn health_check(&self) -> Result<(), GenerationError> {
        if self.config.api_key.is_empty() {
            return Err(GenerationError::ProviderUnavailable(
                "OpenAI API key not configured".to_string(),
            ));
        }

        let response = self
            .client
            .get(self.api_url("models"))
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(GenerationError::ProviderUnavailable(format!(
                "Health check failed: {}",
                response.status()
            )))
        }
    }
}

// ============================================================================
// OpenAI API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}
