//! HTTP handlers for the prompt log service.

pub mod health;
pub mod metrics;
pub mod prompts;
