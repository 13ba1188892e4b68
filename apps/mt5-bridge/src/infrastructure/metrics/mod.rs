//! Prometheus Metrics Module
//!
//! Exposes bridge metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Streams**: active sessions, events emitted by type
//! - **Gateway**: terminal gateway request counts by op
//!
//! # Integration
//!
//! Metrics are exposed at `GET /metrics` on the bridge port.

use std::sync::OnceLock;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// # Panics
///
/// Panics if the recorder cannot be installed.
#[allow(clippy::expect_used)]
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let builder = PrometheusBuilder::new();
            let handle = builder
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            register_metrics();
            handle
        })
        .clone()
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_gauge!(
        "mt5_bridge_stream_sessions_active",
        "Number of open bar stream sessions"
    );
    describe_counter!(
        "mt5_bridge_stream_events_total",
        "Total stream events emitted to clients by type"
    );
    describe_counter!(
        "mt5_bridge_gateway_requests_total",
        "Total terminal gateway requests by op"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Update the open stream session count.
pub fn set_stream_sessions(count: f64) {
    gauge!("mt5_bridge_stream_sessions_active").set(count);
}

/// Record one stream event emitted to a client.
pub fn record_stream_event(event_type: &'static str) {
    counter!(
        "mt5_bridge_stream_events_total",
        "type" => event_type
    )
    .increment(1);
}

/// Record one terminal gateway request.
pub fn record_gateway_request(op: &'static str) {
    counter!(
        "mt5_bridge_gateway_requests_total",
        "op" => op
    )
    .increment(1);
}
