//! Metrics collection and exposition.
//!
//! # Metrics
//! - `pathmux_dispatch_total` (counter): dispatched requests by method, outcome
//! - `pathmux_routes_registered_total` (counter): new routes by method
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - The Prometheus exporter is opt-in and installed by the binary

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter with an HTTP listener on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record the outcome of one dispatch.
pub fn record_dispatch(method: &str, outcome: &'static str) {
    metrics::counter!(
        "pathmux_dispatch_total",
        "method" => method.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record a newly added route.
pub fn record_route_registered(method: &str) {
    metrics::counter!("pathmux_routes_registered_total", "method" => method.to_string())
        .increment(1);
}
