//! Infrastructure layer - Adapters and external integrations.

/// Terminal gateway client (TCP, newline-delimited JSON).
pub mod terminal;

/// HTTP surface: router, auth gate, REST handlers, SSE streaming.
pub mod http;

/// Configuration loading.
pub mod config;

/// Tracing subscriber setup.
pub mod telemetry;

/// Prometheus metrics.
pub mod metrics;
