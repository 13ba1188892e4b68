//! Terminal Gateway Client
//!
//! Adapter implementing the terminal ports against the gateway socket the
//! terminal exposes locally. One process-wide client is created at startup
//! and injected wherever a port is needed.
//!
//! # Session Flow
//!
//! 1. Connect to the gateway's TCP endpoint
//! 2. Send `{"op":"login","account":...,"password":...,"server":...}`
//! 3. Receive `{"ok":true}` or `{"ok":false,"err":...}`
//!
//! The session is established lazily on first use and reused afterwards;
//! [`TerminalClient::ensure_session`] is idempotent. An I/O failure drops
//! the cached connection so the next call reconnects from scratch. No
//! timeouts are imposed on gateway calls - a hung call hangs only the
//! session that issued it.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::Mutex;

use super::messages::{
    GatewayEnvelope, GatewayRequest, RatesResponse, StatusResponse, SymbolsResponse, TickResponse,
};
use crate::application::ports::{
    HistorySource, SymbolInfo, TerminalError, TerminalSession, TerminalStatus, TickSource,
};
use crate::domain::market::{Bar, Tick, Timeframe};
use crate::infrastructure::config::TerminalSettings;
use crate::infrastructure::metrics;

// =============================================================================
// Connection
// =============================================================================

/// One established gateway connection.
struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Connection {
    /// Send one request line and parse the matching response line.
    async fn call<T: DeserializeOwned>(
        &mut self,
        request: &GatewayRequest,
    ) -> Result<T, TerminalError> {
        let mut line = serde_json::to_string(request)
            .map_err(|e| TerminalError::Protocol(e.to_string()))?;
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await?;

        let mut response = String::new();
        let read = self.reader.read_line(&mut response).await?;
        if read == 0 {
            return Err(TerminalError::Protocol(
                "gateway closed the connection".to_string(),
            ));
        }

        let envelope: GatewayEnvelope = serde_json::from_str(&response)
            .map_err(|e| TerminalError::Protocol(e.to_string()))?;
        if !envelope.ok {
            return Err(TerminalError::Request(
                envelope.err.unwrap_or_else(|| "unspecified".to_string()),
            ));
        }

        serde_json::from_str(&response).map_err(|e| TerminalError::Protocol(e.to_string()))
    }
}

// =============================================================================
// Client
// =============================================================================

/// Process-wide terminal gateway client.
///
/// The connection is guarded by an async mutex: gateway calls are strictly
/// request/response in order, so concurrent sessions serialize on it.
pub struct TerminalClient {
    settings: TerminalSettings,
    conn: Mutex<Option<Connection>>,
}

impl TerminalClient {
    /// Create a client. No connection is made until first use.
    #[must_use]
    pub fn new(settings: TerminalSettings) -> Self {
        Self {
            settings,
            conn: Mutex::new(None),
        }
    }

    /// Connect and log in if the slot is empty. No-op on a live session.
    async fn ensure_locked(&self, slot: &mut Option<Connection>) -> Result<(), TerminalError> {
        if slot.is_some() {
            return Ok(());
        }

        let addr = self.settings.gateway_addr.clone();
        tracing::info!(%addr, "connecting to terminal gateway");
        let stream = TcpStream::connect(&addr)
            .await
            .map_err(|source| TerminalError::Connect { addr, source })?;
        let (read, write) = stream.into_split();
        let mut conn = Connection {
            reader: BufReader::new(read),
            writer: write,
        };

        let login = GatewayRequest::Login {
            account: self.settings.account,
            password: self.settings.password.clone(),
            server: self.settings.server.clone(),
        };
        let _: GatewayEnvelope = conn.call(&login).await.map_err(|e| match e {
            TerminalError::Request(msg) => TerminalError::LoginFailed(msg),
            other => other,
        })?;

        tracing::info!(
            account = self.settings.account,
            server = %self.settings.server,
            "terminal session established"
        );
        *slot = Some(conn);
        Ok(())
    }

    /// Run one request against the (lazily established) session.
    ///
    /// A failed call drops the cached connection so the next one
    /// reconnects.
    async fn call<T: DeserializeOwned>(&self, request: &GatewayRequest) -> Result<T, TerminalError> {
        metrics::record_gateway_request(request.op_name());

        let mut slot = self.conn.lock().await;
        self.ensure_locked(&mut slot).await?;
        let Some(conn) = slot.as_mut() else {
            return Err(TerminalError::Protocol("no gateway session".to_string()));
        };

        match conn.call(request).await {
            Ok(payload) => Ok(payload),
            Err(e) => {
                tracing::warn!(error = %e, "gateway call failed, dropping session");
                *slot = None;
                Err(e)
            }
        }
    }

    /// Best-effort session close for process shutdown.
    pub async fn shutdown(&self) {
        let mut slot = self.conn.lock().await;
        if let Some(conn) = slot.as_mut() {
            let _ = conn.call::<GatewayEnvelope>(&GatewayRequest::Shutdown).await;
        }
        *slot = None;
        tracing::info!("terminal session closed");
    }
}

impl GatewayRequest {
    /// Operation name for metrics labels.
    const fn op_name(&self) -> &'static str {
        match self {
            Self::Login { .. } => "login",
            Self::Status => "status",
            Self::Tick { .. } => "tick",
            Self::Rates { .. } => "rates",
            Self::Symbols => "symbols",
            Self::Shutdown => "shutdown",
        }
    }
}

// =============================================================================
// Port implementations
// =============================================================================

#[async_trait]
impl TickSource for TerminalClient {
    async fn latest_tick(&self, symbol: &str) -> Result<Option<Tick>, TerminalError> {
        let response: TickResponse = self
            .call(&GatewayRequest::Tick {
                symbol: symbol.to_string(),
            })
            .await?;
        Ok(response.tick)
    }
}

#[async_trait]
impl HistorySource for TerminalClient {
    async fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Bar>, TerminalError> {
        let response: RatesResponse = self
            .call(&GatewayRequest::Rates {
                symbol: symbol.to_string(),
                timeframe: timeframe.as_str().to_string(),
                count,
            })
            .await?;
        Ok(response.bars.into_iter().map(Bar::from).collect())
    }
}

#[async_trait]
impl TerminalSession for TerminalClient {
    async fn ensure_session(&self) -> Result<(), TerminalError> {
        let mut slot = self.conn.lock().await;
        self.ensure_locked(&mut slot).await
    }

    async fn status(&self) -> Result<TerminalStatus, TerminalError> {
        let response: StatusResponse = self.call(&GatewayRequest::Status).await?;
        Ok(response.into())
    }

    async fn list_symbols(&self) -> Result<Vec<SymbolInfo>, TerminalError> {
        let response: SymbolsResponse = self.call(&GatewayRequest::Symbols).await?;
        Ok(response.symbols)
    }
}

// =============================================================================
// Tests
// =============================================================================
