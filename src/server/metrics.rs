use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all sync metrics
const PREFIX: &str = "now_playing_sync";

lazy_static! {
    // Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Reconciliation cycles
    pub static ref SYNC_CYCLES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_cycles_total"), "Reconciliation cycles by trigger and outcome"),
        &["trigger", "outcome"]
    ).expect("Failed to create cycles_total metric");

    pub static ref SYNC_CYCLE_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_cycle_duration_seconds"),
            "Reconciliation cycle duration in seconds"
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["outcome"]
    ).expect("Failed to create cycle_duration_seconds metric");

    pub static ref SYNC_SKIPPED_TICKS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_skipped_ticks_total"), "Scheduled ticks skipped by reason"),
        &["reason"]
    ).expect("Failed to create skipped_ticks_total metric");

    // Request status updates
    pub static ref SYNC_TRANSITIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_transitions_total"), "Request status transitions applied"),
        &["status"]
    ).expect("Failed to create transitions_total metric");

    pub static ref SYNC_UPDATE_FAILURES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_update_failures_total"), "Request status updates skipped by reason"),
        &["reason"]
    ).expect("Failed to create update_failures_total metric");

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of admin HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Register all metrics - ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(SYNC_CYCLES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(SYNC_CYCLE_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(SYNC_SKIPPED_TICKS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(SYNC_TRANSITIONS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(SYNC_UPDATE_FAILURES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));

    tracing::info!("Metrics system initialized successfully");
}

/// Record a finished reconciliation cycle
pub fn record_cycle(trigger: &str, outcome: &str, duration: Duration) {
    SYNC_CYCLES_TOTAL
        .with_label_values(&[trigger, outcome])
        .inc();

    SYNC_CYCLE_DURATION_SECONDS
        .with_label_values(&[outcome])
        .observe(duration.as_secs_f64());
}

/// Record a scheduled tick that did not start a cycle
pub fn record_skipped_tick(reason: &str) {
    SYNC_SKIPPED_TICKS_TOTAL.with_label_values(&[reason]).inc();
}

/// Record an applied request transition
pub fn record_transition(status: &str) {
    SYNC_TRANSITIONS_TOTAL.with_label_values(&[status]).inc();
}

/// Record a request update that was skipped
pub fn record_update_failure(reason: &str) {
    SYNC_UPDATE_FAILURES_TOTAL.with_label_values(&[reason]).inc();
}

/// Record an admin HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_default();
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
