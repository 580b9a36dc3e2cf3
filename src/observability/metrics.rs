//! Metrics collection and exposition.
//!
//! # Metrics
//! - `vvproxy_requests_total` (counter): requests by method, status, rule
//! - `vvproxy_request_duration_seconds` (histogram): latency by rule
//!
//! # Design Decisions
//! - Exporter is opt-in; without it the macros are no-ops
//! - Labels stay low-cardinality (rule names, not paths)

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one proxied request.
pub fn record_request(method: &str, status: u16, rule: &'static str, start: Instant) {
    ::metrics::counter!(
        "vvproxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "rule" => rule
    )
    .increment(1);

    ::metrics::histogram!("vvproxy_request_duration_seconds", "rule" => rule)
        .record(start.elapsed().as_secs_f64());
}
