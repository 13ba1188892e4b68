//! Terminal Gateway Wire Messages
//!
//! Request and response shapes for the terminal-side gateway socket. The
//! protocol is newline-delimited JSON: one request object per line, one
//! response object per line, strictly in order.
//!
//! Every response carries `ok`; failures carry `err` instead of a payload.

use serde::{Deserialize, Serialize};

use crate::application::ports::{SymbolInfo, TerminalStatus};
use crate::domain::market::{Bar, Tick};

// =============================================================================
// Requests
// =============================================================================

/// One request line to the gateway.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum GatewayRequest {
    /// Log in to the broker server.
    Login {
        /// Account number.
        account: i64,
        /// Account password.
        password: String,
        /// Broker server name.
        server: String,
    },
    /// Terminal connection status.
    Status,
    /// Latest tick for a symbol.
    Tick {
        /// Symbol name.
        symbol: String,
    },
    /// Most recent bars for a symbol/timeframe.
    Rates {
        /// Symbol name.
        symbol: String,
        /// Timeframe code, e.g. `M1`.
        timeframe: String,
        /// Number of bars, newest first on the terminal side.
        count: usize,
    },
    /// Symbol directory listing.
    Symbols,
    /// Close the terminal session.
    Shutdown,
}

// =============================================================================
// Responses
// =============================================================================

/// Envelope common to every response line.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayEnvelope {
    /// Whether the request succeeded.
    pub ok: bool,
    /// Failure description when `ok` is false.
    #[serde(default)]
    pub err: Option<String>,
}

/// Payload of a `status` response.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    /// Whether the terminal is connected to its broker.
    #[serde(default)]
    pub connected: bool,
    /// Logged-in account.
    #[serde(default)]
    pub account: i64,
    /// Broker server name.
    #[serde(default)]
    pub server: String,
}

impl From<StatusResponse> for TerminalStatus {
    fn from(r: StatusResponse) -> Self {
        Self {
            connected: r.connected,
            account: r.account,
            server: r.server,
        }
    }
}

/// Payload of a `tick` response. `tick` is null when the terminal has
/// nothing for the symbol.
#[derive(Debug, Clone, Deserialize)]
pub struct TickResponse {
    /// Latest tick, if any.
    #[serde(default)]
    pub tick: Option<Tick>,
}

/// One bar record as the terminal reports it.
#[derive(Debug, Clone, Deserialize)]
pub struct RateRecord {
    /// Bucket start timestamp, epoch seconds.
    pub time: i64,
    /// Open price.
    pub open: f64,
    /// High price.
    pub high: f64,
    /// Low price.
    pub low: f64,
    /// Close price.
    pub close: f64,
    /// Tick volume for the bar.
    #[serde(default)]
    pub tick_volume: u64,
}

impl From<RateRecord> for Bar {
    fn from(r: RateRecord) -> Self {
        Self {
            time: r.time,
            open: r.open,
            high: r.high,
            low: r.low,
            close: r.close,
            volume: r.tick_volume,
        }
    }
}

/// Payload of a `rates` response.
#[derive(Debug, Clone, Deserialize)]
pub struct RatesResponse {
    /// Bars, oldest first.
    #[serde(default)]
    pub bars: Vec<RateRecord>,
}

/// Payload of a `symbols` response.
#[derive(Debug, Clone, Deserialize)]
pub struct SymbolsResponse {
    /// Directory entries.
    #[serde(default)]
    pub symbols: Vec<SymbolInfo>,
}

// =============================================================================
// Tests
// =============================================================================
