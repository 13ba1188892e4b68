//! Configuration
//!
//! Environment-driven settings for the bridge.

/// Settings types and env parsing.
pub mod settings;

pub use settings::{BridgeConfig, ConfigError, ServerSettings, TerminalSettings};
