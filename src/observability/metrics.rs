//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, route
//! - `gateway_request_duration_seconds` (histogram): latency by route
//! - `gateway_rate_limited_total` (counter): throttle rejections
//!
//! # Design Decisions
//! - Prometheus exporter on its own listener, separate from proxied traffic
//! - Route id as a label; tables are small and static so cardinality is bounded

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        tracing::error!(error = %e, "Failed to install metrics exporter");
    } else {
        tracing::info!(address = %addr, "Metrics exporter listening");
    }
}

/// Record one finished (or rejected) request.
pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    counter!(
        "gateway_requests_total",
        "method" => method.to_owned(),
        "status" => status.to_string(),
        "route" => route.to_owned()
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds", "route" => route.to_owned())
        .record(start.elapsed().as_secs_f64());
}

/// Record a throttle rejection.
pub fn record_rate_limited() {
    counter!("gateway_rate_limited_total").increment(1);
}
