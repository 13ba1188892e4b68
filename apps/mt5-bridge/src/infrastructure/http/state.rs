//! Shared HTTP State
//!
//! The router's state: injected terminal ports, configuration, the
//! process shutdown token, and run-time bookkeeping surfaced by
//! `GET /health`.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Instant;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::application::ports::{HistorySource, TerminalSession, TickSource};
use crate::domain::streaming::StreamEvent;
use crate::infrastructure::config::BridgeConfig;
use crate::infrastructure::metrics;

// =============================================================================
// Bridge bookkeeping
// =============================================================================

/// Run-time counters for the bridge process.
#[derive(Debug)]
pub struct BridgeState {
    started_at: Instant,
    sessions_active: AtomicI64,
    events_emitted: AtomicU64,
    last_connected_at: parking_lot::RwLock<Option<DateTime<Utc>>>,
    last_terminal_error: parking_lot::RwLock<Option<String>>,
}

impl Default for BridgeState {
    fn default() -> Self {
        Self {
            started_at: Instant::now(),
            sessions_active: AtomicI64::new(0),
            events_emitted: AtomicU64::new(0),
            last_connected_at: parking_lot::RwLock::new(None),
            last_terminal_error: parking_lot::RwLock::new(None),
        }
    }
}

impl BridgeState {
    /// Seconds since process start.
    #[must_use]
    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// Currently open stream sessions.
    #[must_use]
    pub fn sessions_active(&self) -> i64 {
        self.sessions_active.load(Ordering::Relaxed)
    }

    /// Total stream events emitted since start.
    #[must_use]
    pub fn events_emitted(&self) -> u64 {
        self.events_emitted.load(Ordering::Relaxed)
    }

    /// Most recent successful terminal contact.
    #[must_use]
    pub fn last_connected_at(&self) -> Option<DateTime<Utc>> {
        *self.last_connected_at.read()
    }

    /// Most recent terminal failure, if any.
    #[must_use]
    pub fn last_terminal_error(&self) -> Option<String> {
        self.last_terminal_error.read().clone()
    }

    /// Record a successful terminal interaction.
    pub fn mark_terminal_ok(&self) {
        *self.last_connected_at.write() = Some(Utc::now());
        *self.last_terminal_error.write() = None;
    }

    /// Record a terminal failure.
    pub fn mark_terminal_error(&self, message: String) {
        *self.last_terminal_error.write() = Some(message);
    }

    fn set_session_gauge(&self) {
        #[allow(clippy::cast_precision_loss)]
        metrics::set_stream_sessions(self.sessions_active.load(Ordering::Relaxed) as f64);
    }

    /// A stream session opened.
    pub fn session_opened(&self) {
        self.sessions_active.fetch_add(1, Ordering::Relaxed);
        self.set_session_gauge();
    }

    /// A stream session closed.
    pub fn session_closed(&self) {
        self.sessions_active.fetch_sub(1, Ordering::Relaxed);
        self.set_session_gauge();
    }

    /// An event went out to a stream client.
    pub fn record_event(&self, event: &StreamEvent) {
        self.events_emitted.fetch_add(1, Ordering::Relaxed);
        metrics::record_stream_event(event_label(event));
    }
}

const fn event_label(event: &StreamEvent) -> &'static str {
    match event {
        StreamEvent::Bootstrap { .. } => "bootstrap",
        StreamEvent::BarOpened { .. } => "bar-new",
        StreamEvent::BarUpdated { .. } => "bar-update",
        StreamEvent::Heartbeat => "heartbeat",
        StreamEvent::Error { .. } => "error",
    }
}

/// Decrements the session gauge when a stream is dropped, however it ends.
#[derive(Debug)]
pub struct SessionGuard(Arc<BridgeState>);

impl SessionGuard {
    /// Open a session against the bridge bookkeeping.
    #[must_use]
    pub fn open(state: Arc<BridgeState>) -> Self {
        state.session_opened();
        Self(state)
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.0.session_closed();
    }
}

// =============================================================================
// Router state
// =============================================================================

/// State shared by all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Latest-tick port.
    pub ticks: Arc<dyn TickSource>,
    /// Historical bars port.
    pub history: Arc<dyn HistorySource>,
    /// Session lifecycle / directory port.
    pub terminal: Arc<dyn TerminalSession>,
    /// Bridge configuration.
    pub config: Arc<BridgeConfig>,
    /// Run-time bookkeeping.
    pub bridge: Arc<BridgeState>,
    /// Process shutdown token; stream sessions derive child tokens.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Assemble the router state from injected ports.
    #[must_use]
    pub fn new(
        ticks: Arc<dyn TickSource>,
        history: Arc<dyn HistorySource>,
        terminal: Arc<dyn TerminalSession>,
        config: Arc<BridgeConfig>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            ticks,
            history,
            terminal,
            config,
            bridge: Arc::new(BridgeState::default()),
            shutdown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_guard_balances_the_counter() {
        let state = Arc::new(BridgeState::default());
        assert_eq!(state.sessions_active(), 0);

        let guard = SessionGuard::open(Arc::clone(&state));
        assert_eq!(state.sessions_active(), 1);
        let second = SessionGuard::open(Arc::clone(&state));
        assert_eq!(state.sessions_active(), 2);

        drop(guard);
        drop(second);
        assert_eq!(state.sessions_active(), 0);
    }

    #[test]
    fn terminal_marks_toggle() {
        let state = BridgeState::default();
        state.mark_terminal_error("gone".to_string());
        assert_eq!(state.last_terminal_error().as_deref(), Some("gone"));

        state.mark_terminal_ok();
        assert!(state.last_terminal_error().is_none());
        assert!(state.last_connected_at().is_some());
    }
}
