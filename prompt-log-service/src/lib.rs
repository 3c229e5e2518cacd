//! Prompt Log Service - records provider calls and reports usage analytics.

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;
