// crates/server/src/metrics.rs
//! Application metrics for Prometheus monitoring.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;

/// Global Prometheus handle for rendering metrics.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// Call once at startup, before any metrics are recorded. Returns `true` if
/// initialization succeeded, `false` if already initialized.
pub fn init_metrics() -> bool {
    if PROMETHEUS_HANDLE.get().is_some() {
        return false;
    }

    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();

    if metrics::set_global_recorder(recorder).is_err() {
        tracing::warn!("Failed to set global metrics recorder (already set)");
        return false;
    }
    if PROMETHEUS_HANDLE.set(handle).is_err() {
        tracing::warn!("Failed to store Prometheus handle (already set)");
    }

    describe_metrics();
    tracing::info!("Prometheus metrics initialized");
    true
}

fn describe_metrics() {
    describe_counter!(
        "review_requests_total",
        "Total number of API requests to review endpoints"
    );
    describe_histogram!(
        "review_request_duration_seconds",
        "Duration of API requests in seconds"
    );
    describe_histogram!(
        "ingest_duration_seconds",
        "Duration of heartbeat ingest runs in seconds"
    );
    describe_gauge!(
        "ingest_heartbeats_fetched",
        "Heartbeats fetched by the last ingest run"
    );
}

/// Render current metrics in Prometheus text format.
///
/// Returns `None` if metrics are not initialized.
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|h| h.render())
}

/// Record a completed API request.
pub fn record_request(endpoint: &str, status: &str, duration: std::time::Duration) {
    counter!("review_requests_total", "endpoint" => endpoint.to_string(), "status" => status.to_string())
        .increment(1);
    histogram!("review_request_duration_seconds", "endpoint" => endpoint.to_string())
        .record(duration.as_secs_f64());
}

/// Record a completed (or failed) ingest run.
pub fn record_ingest(outcome: &str, duration: std::time::Duration, heartbeats: Option<u64>) {
    histogram!("ingest_duration_seconds", "outcome" => outcome.to_string())
        .record(duration.as_secs_f64());

    if let Some(count) = heartbeats {
        gauge!("ingest_heartbeats_fetched").set(count as f64);
    }

    tracing::info!(
        outcome,
        duration_secs = duration.as_secs_f64(),
        heartbeats,
        "Ingest run recorded"
    );
}

/// Helper for timing request handlers.
pub struct RequestTimer {
    endpoint: String,
    start: Instant,
}

impl RequestTimer {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            start: Instant::now(),
        }
    }

    /// Finish timing with a successful status.
    pub fn finish_ok(self) {
        record_request(&self.endpoint, "200", self.start.elapsed());
    }

    /// Finish timing with an error status.
    pub fn finish_err(self, status: u16) {
        record_request(&self.endpoint, &status.to_string(), self.start.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_timer() {
        let timer = RequestTimer::new("test_endpoint");
        std::thread::sleep(std::time::Duration::from_millis(1));
        timer.finish_ok();
    }

    #[test]
    fn test_record_ingest_does_not_panic() {
        record_ingest("done", std::time::Duration::from_millis(5), Some(42));
        record_ingest("error", std::time::Duration::from_millis(5), None);
    }
}
