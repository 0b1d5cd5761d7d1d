//! Metrics collection and exposition.
//!
//! # Metrics
//! - `nano_web_connections_total` (counter): accepted connections
//! - `nano_web_active_connections` (gauge): connections currently held
//! - `nano_web_requests_total` (counter): responses by method, status
//! - `nano_web_request_duration_seconds` (histogram): parse-to-response latency
//! - `nano_web_open_streams` (gauge): registered event streams
//! - `nano_web_stream_pushes_total` (counter): pushes by outcome
//! - `nano_web_rate_limited_total` (counter): requests rejected by the limiter
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until an
//!   exporter is installed
//! - The Prometheus exporter is optional and owns its own HTTP listener

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_connection_opened() {
    counter!("nano_web_connections_total").increment(1);
    gauge!("nano_web_active_connections").increment(1.0);
}

pub fn record_connection_closed() {
    gauge!("nano_web_active_connections").decrement(1.0);
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "nano_web_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("nano_web_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_stream_opened() {
    gauge!("nano_web_open_streams").increment(1.0);
}

pub fn record_stream_closed() {
    gauge!("nano_web_open_streams").decrement(1.0);
}

pub fn record_push(outcome: &'static str) {
    counter!("nano_web_stream_pushes_total", "outcome" => outcome).increment(1);
}

pub fn record_rate_limited() {
    counter!("nano_web_rate_limited_total").increment(1);
}
