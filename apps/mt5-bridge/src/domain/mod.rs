//! Domain layer - Core market data types and bar aggregation.
//!
//! No I/O and no external service dependencies live here.

/// Market data records: ticks, bars, timeframes.
pub mod market;

/// Tick-to-bar aggregation state machine.
pub mod aggregate;

/// Stream event types emitted to clients.
pub mod streaming;
