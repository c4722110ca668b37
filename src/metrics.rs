//! Prometheus metrics for poll latency and upstream health.

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::debug;

// === Metric Name Constants ===

/// Poll cycle latency metric name.
pub const METRIC_POLL_CYCLE_LATENCY: &str = "poll_cycle_latency_ms";
/// Market metadata fetch latency metric name.
pub const METRIC_MARKET_FETCH_LATENCY: &str = "market_fetch_latency_ms";
/// Order book fetch latency metric name.
pub const METRIC_BOOK_FETCH_LATENCY: &str = "orderbook_fetch_latency_ms";
/// HTTP request latency metric name.
pub const METRIC_HTTP_REQUEST_LATENCY: &str = "http_request_latency_ms";
/// Completed polls counter metric name.
pub const METRIC_POLLS: &str = "polls_total";
/// Failed polls counter metric name.
pub const METRIC_POLL_FAILURES: &str = "poll_failures_total";
/// Period rollovers counter metric name.
pub const METRIC_ROLLOVERS: &str = "period_rollovers_total";
/// HTTP retries counter metric name.
pub const METRIC_HTTP_RETRIES: &str = "http_retries_total";
/// Spot price lookup failures counter metric name.
pub const METRIC_SPOT_PRICE_FAILURES: &str = "spot_price_failures_total";

/// Install the Prometheus recorder and register metric descriptions.
/// Call once at startup; the handle renders the `/metrics` endpoint.
pub fn init_metrics() -> PrometheusHandle {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("install prometheus recorder");

    describe_histogram!(
        METRIC_POLL_CYCLE_LATENCY,
        "Full poll cycle latency in milliseconds"
    );
    describe_histogram!(
        METRIC_MARKET_FETCH_LATENCY,
        "Market metadata fetch latency in milliseconds"
    );
    describe_histogram!(
        METRIC_BOOK_FETCH_LATENCY,
        "Order book fetch latency in milliseconds"
    );
    describe_histogram!(
        METRIC_HTTP_REQUEST_LATENCY,
        "HTTP request latency in milliseconds"
    );

    describe_counter!(METRIC_POLLS, "Total number of completed poll cycles");
    describe_counter!(METRIC_POLL_FAILURES, "Total number of failed poll cycles");
    describe_counter!(METRIC_ROLLOVERS, "Total number of period rollovers");
    describe_counter!(METRIC_HTTP_RETRIES, "Total number of HTTP request retries");
    describe_counter!(
        METRIC_SPOT_PRICE_FAILURES,
        "Total number of failed spot price lookups"
    );

    debug!("Metrics initialized");
    handle
}

/// Record market metadata fetch latency.
pub fn record_market_fetch_latency(start: Instant) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_MARKET_FETCH_LATENCY).record(latency_ms);
}

/// Record order book fetch latency.
pub fn record_book_fetch_latency(start: Instant, token_id: &str) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_BOOK_FETCH_LATENCY, "token_id" => token_id.to_string()).record(latency_ms);
}

/// Record HTTP request latency.
pub fn record_http_latency(start: Instant, endpoint: &str) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_HTTP_REQUEST_LATENCY, "endpoint" => endpoint.to_string()).record(latency_ms);
}

/// Increment completed polls counter.
pub fn inc_polls() {
    counter!(METRIC_POLLS).increment(1);
}

/// Increment failed polls counter.
pub fn inc_poll_failures() {
    counter!(METRIC_POLL_FAILURES).increment(1);
}

/// Increment period rollovers counter.
pub fn inc_rollovers() {
    counter!(METRIC_ROLLOVERS).increment(1);
}

/// Increment HTTP retries counter.
pub fn inc_http_retries() {
    counter!(METRIC_HTTP_RETRIES).increment(1);
}

/// Increment spot price failures counter.
pub fn inc_spot_price_failures() {
    counter!(METRIC_SPOT_PRICE_FAILURES).increment(1);
}

/// RAII guard for timing operations.
/// Automatically records latency when dropped.
pub struct LatencyTimer {
    start: Instant,
    metric_name: &'static str,
}

impl LatencyTimer {
    /// Create a new latency timer for the given metric.
    pub fn new(metric_name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            metric_name,
        }
    }

    /// Get elapsed time in milliseconds (without recording).
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        let latency_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        histogram!(self.metric_name).record(latency_ms);
    }
}

/// Create a latency timer for a full poll cycle.
pub fn timer_poll_cycle() -> LatencyTimer {
    LatencyTimer::new(METRIC_POLL_CYCLE_LATENCY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn latency_timer_measures_time() {
        let timer = LatencyTimer::new("test_metric");
        sleep(Duration::from_millis(10));
        let elapsed = timer.elapsed_ms();
        assert!(elapsed >= 9.0); // Allow some tolerance
        // Timer will record on drop
    }
}
