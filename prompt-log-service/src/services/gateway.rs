//! Generation gateway: calls the provider, times it, and logs the interaction.

use crate::error::{GatewayError, GenerationError, StorageError};
use crate::models::NewInteraction;
use crate::services::log_store::InteractionStore;
use crate::services::metrics;
use crate::services::providers::TextProvider;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::instrument;

/// A provider answer that has been appended to the interaction log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub interaction_id: i64,
    pub response: String,
    pub latency_ms: i64,
}

/// Entry point for `generate` and `regenerate`.
///
/// Stateless per call: concurrent calls, including identical prompts, each
/// produce their own log record.
#[derive(Clone)]
pub struct GenerationGateway {
    provider: Arc<dyn TextProvider>,
    store: Arc<dyn InteractionStore>,
    model: String,
    timeout: Duration,
}

impl GenerationGateway {
    pub fn new(
        provider: Arc<dyn TextProvider>,
        store: Arc<dyn InteractionStore>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            store,
            model: model.into(),
            timeout,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Complete `prompt` and append exactly one interaction for it.
    ///
    /// Provider failures write nothing. A failed append after a successful
    /// completion returns [`GatewayError::NotRecorded`] carrying the answer.
    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
    pub async fn generate(
        &self,
        prompt: &str,
        regenerated: bool,
    ) -> Result<Generation, GatewayError> {
        let kind = if regenerated { "regenerate" } else { "generate" };

        if prompt.trim().is_empty() {
            metrics::record_generation(kind, "empty_prompt");
            return Err(GatewayError::EmptyPrompt);
        }

        let start = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, self.provider.complete(&self.model, prompt))
            .await;
        let elapsed = start.elapsed();

        let reply = match outcome {
            Ok(Ok(reply)) => reply,
            Ok(Err(err)) => return Err(self.provider_failed(kind, err)),
            Err(_) => {
                let err = GenerationError::Timeout(format!(
                    "no reply within {} ms",
                    self.timeout.as_millis()
                ));
                return Err(self.provider_failed(kind, err));
            }
        };

        metrics::record_provider_latency(&self.model, elapsed.as_secs_f64());

        let record = NewInteraction::new(prompt, reply.text, &self.model, regenerated, Some(elapsed));
        let latency_ms = record.latency_ms.unwrap_or_default();

        // The append runs on its own task so an abandoned request still logs
        // the answer it already paid for. No timeout applies here.
        let store = Arc::clone(&self.store);
        let pending = record.clone();
        let appended = tokio::spawn(async move { store.append(&pending).await }).await;

        let result = match appended {
            Ok(result) => result,
            Err(join_err) => Err(StorageError::write(join_err)),
        };

        match result {
            Ok(interaction_id) => {
                metrics::record_generation(kind, "recorded");
                tracing::info!(
                    interaction_id = interaction_id,
                    latency_ms = latency_ms,
                    regenerated = regenerated,
                    "Generation recorded"
                );
                Ok(Generation {
                    interaction_id,
                    response: record.response,
                    latency_ms,
                })
            }
            Err(source) => {
                metrics::record_generation(kind, "not_recorded");
                tracing::error!(
                    error = %source,
                    latency_ms = latency_ms,
                    "Generation succeeded but interaction was not recorded"
                );
                Err(GatewayError::NotRecorded {
                    response: record.response,
                    source,
                })
            }
        }
    }

    /// Issue `prompt` again as a new, independent interaction.
    ///
    /// Earlier records for the same prompt are left untouched.
    pub async fn regenerate(&self, prompt: &str) -> Result<Generation, GatewayError> {
        self.generate(prompt, true).await
    }

    fn provider_failed(&self, kind: &str, err: GenerationError) -> GatewayError {
        metrics::record_generation(kind, err.kind());
        metrics::record_provider_error(err.kind());
        tracing::warn!(
            provider = self.provider.name(),
            error = %err,
            "Provider call failed; nothing recorded"
        );
        GatewayError::Generation(err)
    }
}
