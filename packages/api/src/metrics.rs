//! Prometheus metrics.
//!
//! This module provides:
//! - Prometheus recorder initialization
//! - Metric names and descriptions
//! - Refreshing queue gauges and rendering for `GET /metrics`
//! - Per-request counters and latency histogram

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub const TOTAL_PUSH_COUNT: &str = "scrape_total_push_count";
pub const QUEUE_USAGE: &str = "scrape_queue_usage";
pub const QUEUE_CAPACITY: &str = "scrape_queue_capacity";
pub const HTTP_REQUESTS: &str = "scrape_http_requests_total";
pub const HTTP_REQUEST_DURATION: &str = "scrape_http_request_duration_seconds";

/// The recorder can only be installed once per process.
static PROMETHEUS_HANDLE: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

/// Install the Prometheus recorder and return its handle.
///
/// Later calls return the handle installed by the first one. Returns `None`
/// if a foreign recorder already owns the global slot.
pub fn init_metrics() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get_or_init(install_recorder).clone()
}

fn install_recorder() -> Option<PrometheusHandle> {
    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();

    if metrics::set_global_recorder(recorder).is_err() {
        tracing::warn!("Failed to set global metrics recorder (already set)");
        return None;
    }

    describe_metrics();
    tracing::info!("Prometheus metrics initialized");
    Some(handle)
}

fn describe_metrics() {
    describe_counter!(
        TOTAL_PUSH_COUNT,
        "Number of targets accepted for dispatch"
    );
    describe_gauge!(QUEUE_USAGE, "Jobs currently queued or executing");
    describe_gauge!(QUEUE_CAPACITY, "Maximum number of resident jobs");
    describe_counter!(HTTP_REQUESTS, "HTTP requests served, by status code");
    describe_histogram!(HTTP_REQUEST_DURATION, "HTTP response time in seconds");
}

/// Refresh values that are read from live state rather than recorded on events.
pub fn record_snapshot(capacity: usize, usage: usize, total_count: u64) {
    gauge!(QUEUE_CAPACITY).set(capacity as f64);
    gauge!(QUEUE_USAGE).set(usage as f64);
    counter!(TOTAL_PUSH_COUNT).absolute(total_count);
}

/// Record one served request.
pub fn record_request(status: &str, duration: Duration) {
    counter!(HTTP_REQUESTS, "status" => status.to_string()).increment(1);
    histogram!(HTTP_REQUEST_DURATION).record(duration.as_secs_f64());
}
