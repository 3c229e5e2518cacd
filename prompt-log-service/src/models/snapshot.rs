//! Aggregate usage report, rebuilt on every request and never stored.

use super::PromptInteraction;
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::FromRow;

/// Number of interactions recorded on one UTC calendar date.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: i64,
}

/// Occurrence count for one distinct prompt text.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct PromptFrequency {
    pub prompt: String,
    pub count: i64,
}

/// Usage analytics over the interaction log.
///
/// The five fields come from independent reads and are not guaranteed to be
/// mutually consistent if writes land while the snapshot is being built.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub total_prompts: i64,

    /// `None` when no interaction has a latency, serialized as `null`.
    pub avg_latency: Option<f64>,

    /// Most recent active dates first. Dates without activity are absent.
    pub prompts_per_day: Vec<DailyCount>,

    /// Most frequent prompts, highest count first.
    pub top_prompts: Vec<PromptFrequency>,

    /// Slowest individual interactions, highest latency first.
    pub slowest_prompts: Vec<PromptInteraction>,
}
