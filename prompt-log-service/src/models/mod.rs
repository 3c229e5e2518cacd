//! Domain models for the prompt log service.

pub mod interaction;
pub mod snapshot;

pub use interaction::{NewInteraction, PromptInteraction};
pub use snapshot::{DailyCount, MetricsSnapshot, PromptFrequency};
