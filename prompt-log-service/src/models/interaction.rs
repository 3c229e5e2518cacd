//! Interaction record written once per successful provider call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::time::Duration;

/// A persisted provider call. Immutable once stored.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptInteraction {
    /// Store-assigned, strictly increasing in insertion order.
    pub id: i64,

    /// Text submitted to the provider.
    pub prompt: String,

    /// Text returned by the provider. May be empty.
    pub response: String,

    /// Provider model identifier.
    pub model: String,

    /// True when produced by a regeneration request.
    pub regenerated: bool,

    /// Provider round-trip in whole milliseconds, if it was captured.
    pub latency_ms: Option<i64>,

    /// Assigned by the store at write time.
    pub created_at: DateTime<Utc>,
}

/// Fields supplied by the caller when appending to the log.
#[derive(Debug, Clone, PartialEq)]
pub struct NewInteraction {
    pub prompt: String,
    pub response: String,
    pub model: String,
    pub regenerated: bool,
    pub latency_ms: Option<i64>,
}

impl NewInteraction {
    /// Build a record from a completed provider call.
    pub fn new(
        prompt: impl Into<String>,
        response: impl Into<String>,
        model: impl Into<String>,
        regenerated: bool,
        elapsed: Option<Duration>,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            response: response.into(),
            model: model.into(),
            regenerated,
            latency_ms: elapsed.map(round_millis),
        }
    }

    /// Attach the store-assigned identity.
    pub fn into_interaction(self, id: i64, created_at: DateTime<Utc>) -> PromptInteraction {
        PromptInteraction {
            id,
            prompt: self.prompt,
            response: self.response,
            model: self.model,
            regenerated: self.regenerated,
            latency_ms: self.latency_ms,
            created_at,
        }
    }
}

/// Round a duration to the nearest millisecond.
pub fn round_millis(elapsed: Duration) -> i64 {
    (elapsed.as_secs_f64() * 1000.0).round() as i64
}
