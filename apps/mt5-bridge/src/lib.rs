#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! MT5 Bridge - Local Market Data Bridge
//!
//! A localhost HTTP bridge in front of a MetaTrader 5 terminal. It logs in
//! to the terminal through a gateway socket, serves history and quote
//! lookups over REST, and streams live tick-to-bar aggregation to browser
//! clients over server-sent events.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Core market data types and aggregation, no I/O
//!   - `market`: Timeframes, ticks, bars
//!   - `aggregate`: Tick-to-bar folding
//!   - `streaming`: Sequenced stream events
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Interfaces over the terminal (ticks, history, session)
//!   - `services`: The per-client streaming session driver
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `terminal`: TCP/JSON gateway client implementing the ports
//!   - `http`: axum router, auth gate, REST handlers, SSE encoding
//!   - `config`: Environment-driven configuration
//!   - `telemetry`: Tracing subscriber setup
//!   - `metrics`: Prometheus metrics
//!
//! # Data Flow
//!
//! ```text
//! MT5 terminal ──► gateway socket ──► TerminalClient ──► StreamDriver ──► SSE ──► browser
//!                                           │
//!                                           └────────► REST handlers ──► browser
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core market data types with no external dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::aggregate::{BarAggregator, BarDelta};
pub use domain::market::{Bar, Tick, Timeframe};
pub use domain::streaming::StreamEvent;

// Application services
pub use application::services::{StreamDriver, StreamRequest, StreamSettings};

// Infrastructure config
pub use infrastructure::config::{BridgeConfig, ConfigError};
pub use infrastructure::metrics::init_metrics;
