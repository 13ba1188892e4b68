//! Application Services
//!
//! Use cases orchestrating the domain against the ports.

/// Streaming session driver for live bar streams.
pub mod stream_driver;

pub use stream_driver::{IdleBackoff, StreamDriver, StreamRequest, StreamSettings};
