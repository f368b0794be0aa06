//! Metrics collection and exposition.
//!
//! # Metrics
//! - `bridge_messages_forwarded_total` (counter): messages put and committed outbound
//! - `bridge_duplicates_skipped_total` (counter): redeliveries removed without a put
//! - `bridge_errors_total` (counter): failed cycles entering backoff
//! - `bridge_retry_delay_ms` (gauge): delay of the current backoff
//!
//! All labelled by `pair`. Recording is a no-op until an exporter is installed.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with an HTTP listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_forwarded(pair: &str) {
    metrics::counter!("bridge_messages_forwarded_total", "pair" => pair.to_string()).increment(1);
}

pub fn record_duplicate(pair: &str) {
    metrics::counter!("bridge_duplicates_skipped_total", "pair" => pair.to_string()).increment(1);
}

pub fn record_error(pair: &str) {
    metrics::counter!("bridge_errors_total", "pair" => pair.to_string()).increment(1);
}

pub fn record_retry_delay(pair: &str, delay_ms: u64) {
    metrics::gauge!("bridge_retry_delay_ms", "pair" => pair.to_string()).set(delay_ms as f64);
}
