//! Metrics collection and exposition.
//!
//! # Metrics
//! - `mux_requests_total` (counter): envelope requests by status
//! - `mux_request_duration_seconds` (histogram): envelope latency
//! - `mux_individual_requests_total` (counter): individual requests by outcome

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a completed envelope request.
pub fn record_envelope(status: u16, start: Instant) {
    let status = status.to_string();
    metrics::counter!("mux_requests_total", "status" => status.clone()).increment(1);
    metrics::histogram!("mux_request_duration_seconds", "status" => status)
        .record(start.elapsed().as_secs_f64());
}

/// Record the outcome of one individual request.
pub fn record_individual_request(outcome: &'static str) {
    metrics::counter!("mux_individual_requests_total", "outcome" => outcome).increment(1);
}
