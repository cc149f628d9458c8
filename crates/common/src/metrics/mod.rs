//! Metrics and observability utilities
//!
//! Prometheus metrics with standardized naming conventions.

use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit,
};
use std::time::Instant;

/// Metrics prefix for all Polydoc metrics
pub const METRICS_PREFIX: &str = "polydoc";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.00,
];

/// Buckets for OCR task wait time, which is measured in seconds not millis
pub const OCR_BUCKETS: &[f64] = &[1.0, 2.0, 5.0, 10.0, 20.0, 30.0, 60.0, 120.0, 300.0];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    describe_counter!(
        format!("{}_memory_lookups_total", METRICS_PREFIX),
        Unit::Count,
        "Total memory lookups, labeled by hit or miss"
    );

    describe_counter!(
        format!("{}_memory_rows_imported_total", METRICS_PREFIX),
        Unit::Count,
        "Total memory rows written by imports"
    );

    describe_counter!(
        format!("{}_import_row_errors_total", METRICS_PREFIX),
        Unit::Count,
        "Total rejected rows across imports"
    );

    describe_counter!(
        format!("{}_ocr_tasks_total", METRICS_PREFIX),
        Unit::Count,
        "Total OCR tasks, labeled by terminal status"
    );

    describe_histogram!(
        format!("{}_ocr_task_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Time spent handling the status poll that observed a terminal status"
    );

    describe_counter!(
        format!("{}_translation_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total machine translation API requests"
    );

    describe_gauge!(
        format!("{}_document_substitutions_count", METRICS_PREFIX),
        Unit::Count,
        "Substitutions applied to the most recent rewritten document"
    );

    describe_gauge!(
        format!("{}_db_connections_active", METRICS_PREFIX),
        Unit::Count,
        "Active database connections"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Record one memory lookup
pub fn record_lookup(hit: bool) {
    let outcome = if hit { "hit" } else { "miss" };
    counter!(
        format!("{}_memory_lookups_total", METRICS_PREFIX),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record an import outcome
pub fn record_import(format: &str, rows_saved: usize, row_errors: usize) {
    counter!(
        format!("{}_memory_rows_imported_total", METRICS_PREFIX),
        "format" => format.to_string()
    )
    .increment(rows_saved as u64);

    if row_errors > 0 {
        counter!(
            format!("{}_import_row_errors_total", METRICS_PREFIX),
            "format" => format.to_string()
        )
        .increment(row_errors as u64);
    }
}

/// Record an OCR task reaching a terminal status. `duration_secs` is the
/// handling time of the status poll that observed it.
pub fn record_ocr_task(duration_secs: f64, status: &str) {
    counter!(
        format!("{}_ocr_tasks_total", METRICS_PREFIX),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(format!("{}_ocr_task_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}

/// Record one machine translation API call
pub fn record_translation(model: &str, success: bool) {
    let status = if success { "success" } else { "error" };
    counter!(
        format!("{}_translation_requests_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record how many substitutions the last rewrite applied
pub fn record_rewrite(substitutions: usize) {
    gauge!(format!("{}_document_substitutions_count", METRICS_PREFIX)).set(substitutions as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buckets_sorted() {
        for buckets in [LATENCY_BUCKETS, OCR_BUCKETS] {
            for pair in buckets.windows(2) {
                assert!(pair[0] < pair[1]);
            }
        }
    }

    #[test]
    fn test_request_metrics() {
        let metrics = RequestMetrics::start("GET", "/api/memory");
        std::thread::sleep(std::time::Duration::from_millis(5));
        metrics.finish(200);
        // Just verify it runs without panic
    }
}
