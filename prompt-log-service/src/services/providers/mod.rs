//! Generative provider abstraction and implementations.
//!
//! The gateway talks to providers only through [`TextProvider`], so the
//! OpenAI client can be swapped for the mock in tests and local runs.

pub mod mock;
pub mod openai;

use crate::error::GenerationError;
use async_trait::async_trait;

pub use mock::MockTextProvider;
pub use openai::{OpenAiConfig, OpenAiTextProvider};

/// A usable provider reply. The text is always present, possibly empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderResponse {
    pub text: String,
}

/// Trait for single-shot text completion providers.
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Short provider name for logs and metrics.
    fn name(&self) -> &'static str;

    /// Complete `prompt` with the given model.
    async fn complete(&self, model: &str, prompt: &str)
        -> Result<ProviderResponse, GenerationError>;

    /// Health check.
    async fn health_check(&self) -> Result<(), GenerationError>;
}
