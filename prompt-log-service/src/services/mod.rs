pub mod analytics;
pub mod gateway;
pub mod log_store;
pub mod metrics;
pub mod providers;

pub use analytics::AnalyticsAggregator;
pub use gateway::{Generation, GenerationGateway};
pub use log_store::{InMemoryInteractionStore, InteractionStore, PgInteractionStore};
