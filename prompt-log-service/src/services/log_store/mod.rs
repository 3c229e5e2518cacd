//! Interaction log store abstractions and implementations.
//!
//! The log is append-only: there is no update or delete. Aggregate queries are
//! read-only and consumed by the analytics aggregator.

pub mod memory;
pub mod postgres;

use crate::error::StorageError;
use crate::models::{DailyCount, NewInteraction, PromptFrequency, PromptInteraction};
use async_trait::async_trait;

pub use memory::InMemoryInteractionStore;
pub use postgres::PgInteractionStore;

/// Maximum number of interactions returned by a history read.
pub const HISTORY_LIMIT: i64 = 20;

/// Persistence for prompt interactions.
///
/// Implementations must accept concurrent appends from independent requests
/// without any coordination by the caller.
#[async_trait]
pub trait InteractionStore: Send + Sync {
    /// Persist one record and return its store-assigned id.
    async fn append(&self, record: &NewInteraction) -> Result<i64, StorageError>;

    /// Up to `limit` records, newest `created_at` first, ties by `id` descending.
    async fn recent(&self, limit: i64) -> Result<Vec<PromptInteraction>, StorageError>;

    /// Total number of records.
    async fn count(&self) -> Result<i64, StorageError>;

    /// Mean latency over records that have one. `None` if no record does.
    async fn average_latency(&self) -> Result<Option<f64>, StorageError>;

    /// Record counts for the `limit` most recent UTC dates with activity,
    /// newest date first.
    async fn count_per_day(&self, limit: i64) -> Result<Vec<DailyCount>, StorageError>;

    /// The `limit` most frequent prompt texts, highest count first.
    /// Equal counts are ordered by prompt text ascending.
    async fn top_prompts(&self, limit: i64) -> Result<Vec<PromptFrequency>, StorageError>;

    /// The `limit` records with the largest non-null latency, highest first.
    /// Equal latencies are ordered by `id` descending.
    async fn slowest(&self, limit: i64) -> Result<Vec<PromptInteraction>, StorageError>;

    /// Verify the store is reachable.
    async fn health_check(&self) -> Result<(), StorageError>;
}
