//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, country
//! - `gateway_request_duration_seconds` (histogram): latency distribution
//! - `gateway_config_reloads_total` (counter): loads by outcome
//! - `gateway_countries_available` (gauge): countries in the live snapshot
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until
//!   `init_metrics` installs the Prometheus recorder
//! - Country label is `none` when the request never resolved a country

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one completed gateway request.
pub fn record_request(method: &str, status: u16, country: &str, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("country", country.to_string()),
    ];
    metrics::counter!("gateway_requests_total", &labels).increment(1);
    metrics::histogram!("gateway_request_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
}

/// Record one configuration load attempt.
pub fn record_reload(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    metrics::counter!("gateway_config_reloads_total", "outcome" => outcome).increment(1);
}

pub fn set_countries_available(count: usize) {
    metrics::gauge!("gateway_countries_available").set(count as f64);
}
