//! Mock provider implementation for testing.

use super::{ProviderResponse, TextProvider};
use crate::error::GenerationError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Mock text provider with scripted latency, reply and failure.
#[derive(Debug, Default)]
pub struct MockTextProvider {
    delay: Duration,
    response: Option<String>,
    failure: Option<GenerationError>,
    calls: AtomicUsize,
}

impl MockTextProvider {
    /// Echoes the prompt back immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long before replying.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Always reply with `response` instead of echoing.
    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.response = Some(response.into());
        self
    }

    /// Fail every call with `error` after the configured delay.
    pub fn failing(mut self, error: GenerationError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Number of `complete` calls received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextProvider for MockTextProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn complete(
        &self,
        _model: &str,
        prompt: &str,
    ) -> Result<ProviderResponse, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if let Some(error) = &self.failure {
            return Err(error.clone());
        }

        let text = self
            .response
            .clone()
            .unwrap_or_else(|| format!("Mock response for: {}", prompt));

        Ok(ProviderResponse { text })
    }

    async fn health_check(&self) -> Result<(), GenerationError> {
        match &self.failure {
            Some(GenerationError::ProviderUnavailable(msg)) => {
                Err(GenerationError::ProviderUnavailable(msg.clone()))
            }
            _ => Ok(()),
        }
    }
}
