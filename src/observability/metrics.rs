//! Metrics collection and exposition.
//!
//! # Metrics
//! - `tool_calls_total` (counter): calls by tool, status, error type
//! - `tool_call_duration_seconds` (histogram): end-to-end latency by tool
//! - `tool_output_truncated_total` (counter): truncated results by tool
//! - `audit_write_failures_total` (counter): failed audit sink writes
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until an
//!   exporter is installed
//! - Prometheus exporter is optional and listens on its own address

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(error) => tracing::error!(address = %addr, error = %error, "Failed to install metrics exporter"),
    }
}

pub fn record_tool_call(tool: &str, status: &'static str, error_type: &'static str, latency: Duration) {
    metrics::counter!(
        "tool_calls_total",
        "tool" => tool.to_string(),
        "status" => status,
        "error_type" => error_type
    )
    .increment(1);
    metrics::histogram!("tool_call_duration_seconds", "tool" => tool.to_string())
        .record(latency.as_secs_f64());
}

pub fn record_truncated(tool: &str) {
    metrics::counter!("tool_output_truncated_total", "tool" => tool.to_string()).increment(1);
}

pub fn record_audit_failure() {
    metrics::counter!("audit_write_failures_total").increment(1);
}
