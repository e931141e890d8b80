//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with SLO-aligned histograms
//! and standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};

/// Metrics prefix for all PortraitForge metrics
pub const METRICS_PREFIX: &str = "portraitforge";

/// SLO-aligned histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.075, 0.100, 0.150, 0.250, 0.500, 1.000, 2.500, 5.000,
    10.00,
];

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
        format!("{}_jobs_submitted_total", METRICS_PREFIX),
        Unit::Count,
        "Total jobs submitted to the generation provider"
    );

    describe_counter!(
        format!("{}_submission_errors_total", METRICS_PREFIX),
        Unit::Count,
        "Total failed provider submissions"
    );

    describe_counter!(
        format!("{}_webhooks_received_total", METRICS_PREFIX),
        Unit::Count,
        "Total webhook deliveries received"
    );

    describe_counter!(
        format!("{}_webhook_rows_updated_total", METRICS_PREFIX),
        Unit::Count,
        "Total rows resolved by webhook deliveries"
    );

    describe_histogram!(
        format!("{}_submission_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Provider queue submission latency in seconds"
    );

    tracing::info!("Metrics registered");
}

/// Record a provider job submission
pub fn record_submission(kind: &str, duration_secs: f64, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_jobs_submitted_total", METRICS_PREFIX),
        "kind" => kind.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    if success {
        histogram!(
            format!("{}_submission_duration_seconds", METRICS_PREFIX),
            "kind" => kind.to_string()
        )
        .record(duration_secs);
    } else {
        counter!(
            format!("{}_submission_errors_total", METRICS_PREFIX),
            "kind" => kind.to_string()
        )
        .increment(1);
    }
}

/// Record a webhook delivery and how many rows it resolved
pub fn record_webhook(kind: &str, rows_updated: u64) {
    counter!(
        format!("{}_webhooks_received_total", METRICS_PREFIX),
        "kind" => kind.to_string()
    )
    .increment(1);

    counter!(
        format!("{}_webhook_rows_updated_total", METRICS_PREFIX),
        "kind" => kind.to_string()
    )
    .increment(rows_updated);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_buckets_sorted() {
        let mut prev = 0.0;
        for &bucket in LATENCY_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }
    }

    #[test]
    fn test_record_helpers_run() {
        record_submission("train", 0.05, true);
        record_submission("gen", 0.0, false);
        record_webhook("image", 0);
        // Just verify they run without panic
    }
}
