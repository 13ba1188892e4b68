//! Port Interfaces
//!
//! Contracts the terminal adapter must implement, following the Hexagonal
//! Architecture pattern. The core only ever sees these traits; the
//! process-wide terminal handle is injected where it is needed instead of
//! living behind a module-level global.
//!
//! ## Driven Ports (Outbound)
//!
//! - [`TickSource`]: latest-tick lookup for a symbol
//! - [`HistorySource`]: ordered historical bar fetch
//! - [`TerminalSession`]: idempotent session management and directory calls

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::market::{Bar, Tick, Timeframe};

// =============================================================================
// Errors
// =============================================================================

/// Faults surfaced by the terminal collaborators.
///
/// Everything here is fatal to the operation that raised it; recoverable
/// conditions (absent tick, empty history) are expressed in the `Ok`
/// payloads instead.
#[derive(Debug, thiserror::Error)]
pub enum TerminalError {
    /// The gateway socket could not be reached.
    #[error("terminal gateway unreachable at {addr}: {source}")]
    Connect {
        /// Gateway address that was dialed.
        addr: String,
        /// Underlying socket error.
        #[source]
        source: std::io::Error,
    },

    /// The terminal rejected the login.
    #[error("terminal login failed: {0}")]
    LoginFailed(String),

    /// I/O failure on an established gateway connection.
    #[error("terminal gateway i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The gateway answered with something we could not understand.
    #[error("terminal gateway protocol error: {0}")]
    Protocol(String),

    /// The gateway reported a request-level failure.
    #[error("terminal request failed: {0}")]
    Request(String),
}

// =============================================================================
// Boundary records
// =============================================================================

/// Terminal connection status as reported by the gateway.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TerminalStatus {
    /// Whether the terminal is connected to its broker server.
    pub connected: bool,
    /// Logged-in account number.
    pub account: i64,
    /// Broker server name.
    pub server: String,
}

/// One entry of the terminal's symbol directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolInfo {
    /// Symbol name, e.g. `XAUUSD`.
    pub name: String,
    /// Directory path, e.g. `Forex\Majors\XAUUSD`.
    #[serde(default)]
    pub path: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Whether the symbol is visible in Market Watch.
    #[serde(default)]
    pub visible: bool,
    /// Price digits.
    #[serde(default)]
    pub digits: u32,
}

// =============================================================================
// Ports
// =============================================================================

/// Latest-tick lookup.
///
/// `Ok(None)` means the terminal has no tick for the symbol right now;
/// callers treat that as "no new data", not as a fault.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TickSource: Send + Sync {
    /// Fetch the latest known tick for `symbol`.
    async fn latest_tick(&self, symbol: &str) -> Result<Option<Tick>, TerminalError>;
}

/// Historical bar fetch.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Fetch up to `count` most recent bars, oldest first.
    ///
    /// `count` must already be clamped to `[1, 2000]` by the caller.
    async fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Bar>, TerminalError>;
}

/// Terminal session lifecycle and directory calls.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TerminalSession: Send + Sync {
    /// Initialize and log in if not already done. Idempotent.
    async fn ensure_session(&self) -> Result<(), TerminalError>;

    /// Current terminal connection status.
    async fn status(&self) -> Result<TerminalStatus, TerminalError>;

    /// The terminal's symbol directory.
    async fn list_symbols(&self) -> Result<Vec<SymbolInfo>, TerminalError>;
}
