//! Prometheus metrics for prompt-log-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, HistogramVec, TextEncoder,
};

/// Generation outcomes: recorded, not_recorded, empty_prompt, or a provider error kind.
pub static GENERATIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "prompt_log_generations_total",
        "Total number of generate/regenerate calls by outcome",
        &["kind", "outcome"] // kind: generate, regenerate
    )
    .expect("Failed to register generations_total")
});

/// Provider round-trip for successful calls.
pub static PROVIDER_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "prompt_log_provider_latency_seconds",
        "Generative provider latency in seconds",
        &["model"],
        vec![0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]
    )
    .expect("Failed to register provider_latency")
});

/// Provider failures by error kind.
pub static PROVIDER_ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "prompt_log_provider_errors_total",
        "Total number of provider failures",
        &["error_type"]
    )
    .expect("Failed to register provider_errors_total")
});

/// Log store operation duration.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "prompt_log_db_query_duration_seconds",
        "Interaction log query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Log store failures by operation.
pub static DB_ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "prompt_log_db_errors_total",
        "Total number of interaction log failures",
        &["operation"]
    )
    .expect("Failed to register db_errors_total")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&GENERATIONS_TOTAL);
    Lazy::force(&PROVIDER_LATENCY);
    Lazy::force(&PROVIDER_ERRORS_TOTAL);
    Lazy::force(&DB_QUERY_DURATION);
    Lazy::force(&DB_ERRORS_TOTAL);
}

pub fn record_generation(kind: &str, outcome: &str) {
    GENERATIONS_TOTAL.with_label_values(&[kind, outcome]).inc();
}

pub fn record_provider_latency(model: &str, duration_secs: f64) {
    PROVIDER_LATENCY
        .with_label_values(&[model])
        .observe(duration_secs);
}

pub fn record_provider_error(error_type: &str) {
    PROVIDER_ERRORS_TOTAL.with_label_values(&[error_type]).inc();
}

pub fn record_db_error(operation: &str) {
    DB_ERRORS_TOTAL.with_label_values(&[operation]).inc();
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}
