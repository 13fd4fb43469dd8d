//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): handler requests by route, status
//! - `gateway_auth_denied_total` (counter): denials by failing check
//! - `gateway_lifecycle_transitions_total` (counter): orchestrator phase changes
//!
//! Recording is a no-op until an exporter is installed.

use std::net::SocketAddr;

use metrics::counter;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(route: &str, status: u16) {
    counter!(
        "gateway_requests_total",
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_auth_denied(check: &'static str) {
    counter!("gateway_auth_denied_total", "check" => check).increment(1);
}

pub fn record_lifecycle_transition(phase: &'static str) {
    counter!("gateway_lifecycle_transitions_total", "phase" => phase).increment(1);
}
