//! Terminal Gateway Integration
//!
//! Client for the MetaTrader terminal's local gateway socket, implementing
//! the application ports. Split into:
//!
//! - `client`: connection management, lazy login, port implementations
//! - `messages`: wire request/response shapes

/// Gateway client and port implementations.
pub mod client;

/// Wire message types.
pub mod messages;

pub use client::TerminalClient;
