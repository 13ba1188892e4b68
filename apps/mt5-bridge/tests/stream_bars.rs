//! SSE Streaming Integration Tests
//!
//! Drives `/stream-bars` through the full router and reads frames off the
//! response body: bootstrap first, sequenced bar events after, validation
//! and session failures rejected before any stream starts.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures_util::StreamExt;
use mt5_bridge::application::ports::{
    HistorySource, SymbolInfo, TerminalError, TerminalSession, TerminalStatus, TickSource,
};
use mt5_bridge::domain::market::{Bar, Tick, Timeframe};
use mt5_bridge::infrastructure::config::{BridgeConfig, ServerSettings, TerminalSettings};
use mt5_bridge::infrastructure::http::{self, AppState};
use mt5_bridge::StreamSettings;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

// =============================================================================
// Stub terminal
// =============================================================================

#[derive(Default)]
struct StubTerminal {
    tick: Option<Tick>,
    bars: Vec<Bar>,
    session_error: Option<String>,
}

#[async_trait]
impl TickSource for StubTerminal {
    async fn latest_tick(&self, _symbol: &str) -> Result<Option<Tick>, TerminalError> {
        Ok(self.tick)
    }
}

#[async_trait]
impl HistorySource for StubTerminal {
    async fn fetch_bars(
        &self,
        _symbol: &str,
        _timeframe: Timeframe,
        _count: usize,
    ) -> Result<Vec<Bar>, TerminalError> {
        Ok(self.bars.clone())
    }
}

#[async_trait]
impl TerminalSession for StubTerminal {
    async fn ensure_session(&self) -> Result<(), TerminalError> {
        self.session_error
            .as_ref()
            .map_or(Ok(()), |e| Err(TerminalError::Request(e.clone())))
    }

    async fn status(&self) -> Result<TerminalStatus, TerminalError> {
        Ok(TerminalStatus::default())
    }

    async fn list_symbols(&self) -> Result<Vec<SymbolInfo>, TerminalError> {
        Ok(Vec::new())
    }
}

// =============================================================================
// Harness
// =============================================================================

fn router(terminal: Arc<StubTerminal>) -> Router {
    let config = Arc::new(BridgeConfig {
        server: ServerSettings::default(),
        terminal: TerminalSettings {
            gateway_addr: "127.0.0.1:0".to_string(),
            account: 42,
            password: "pw".to_string(),
            server: "Demo-1".to_string(),
        },
        stream: StreamSettings::default(),
        auth_token: String::new(),
    });
    let state = AppState::new(
        terminal.clone() as Arc<dyn TickSource>,
        terminal.clone() as Arc<dyn HistorySource>,
        terminal as Arc<dyn TerminalSession>,
        config,
        CancellationToken::new(),
    );
    http::router(state)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Read SSE frames off the response body until `want` data frames arrived.
async fn read_data_frames(response: axum::response::Response, want: usize) -> Vec<serde_json::Value> {
    let mut body = response.into_body().into_data_stream();
    let mut buffer = String::new();
    let mut frames = Vec::new();

    while frames.len() < want {
        let chunk = timeout(Duration::from_secs(5), body.next())
            .await
            .expect("timed out waiting for SSE frame")
            .expect("body ended before expected frames")
            .unwrap();
        buffer.push_str(std::str::from_utf8(&chunk).unwrap());

        while let Some(end) = buffer.find("\n\n") {
            let frame: String = buffer.drain(..end + 2).collect();
            for line in frame.lines() {
                if let Some(payload) = line.strip_prefix("data: ") {
                    frames.push(serde_json::from_str(payload).unwrap());
                }
            }
        }
    }
    frames
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn stream_opens_with_a_bootstrap_frame() {
    let terminal = Arc::new(StubTerminal {
        bars: vec![Bar::open_at(60, 10.0, 3)],
        ..StubTerminal::default()
    });
    let response = router(terminal)
        .oneshot(get("/stream-bars?symbol=XAUUSD&timeframe=M1&bars=50"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("text/event-stream")
    );

    let frames = read_data_frames(response, 1).await;
    let bootstrap = &frames[0];
    assert_eq!(bootstrap["type"], "bootstrap");
    assert_eq!(bootstrap["symbol"], "XAUUSD");
    assert_eq!(bootstrap["timeframe"], "M1");
    assert_eq!(bootstrap["bootstrap"], 50);
    assert_eq!(bootstrap["_seq"], 0);
    assert_eq!(bootstrap["bars"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn live_tick_follows_the_bootstrap_in_sequence() {
    let terminal = Arc::new(StubTerminal {
        tick: Some(Tick {
            time: 100,
            last: 10.0,
            volume: 1,
            ..Tick::default()
        }),
        ..StubTerminal::default()
    });
    let response = router(terminal)
        .oneshot(get("/stream-bars?symbol=XAUUSD&timeframe=M1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let frames = read_data_frames(response, 2).await;
    assert_eq!(frames[0]["type"], "bootstrap");
    assert_eq!(frames[0]["_seq"], 0);

    // The stub repeats the same tick; its timestamp dedup means exactly
    // one data event follows the bootstrap.
    assert_eq!(frames[1]["type"], "bar-new");
    assert_eq!(frames[1]["_seq"], 1);
    assert_eq!(frames[1]["bar"]["time"], 60);
    assert_eq!(frames[1]["bar"]["open"], 10.0);
}

#[tokio::test]
async fn unknown_timeframe_is_rejected_before_streaming() {
    let response = router(Arc::new(StubTerminal::default()))
        .oneshot(get("/stream-bars?symbol=XAUUSD&timeframe=M2"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn empty_symbol_is_rejected_before_streaming() {
    let response = router(Arc::new(StubTerminal::default()))
        .oneshot(get("/stream-bars?symbol=%20&timeframe=M1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn session_failure_is_a_rejected_request_not_a_stream() {
    let terminal = Arc::new(StubTerminal {
        session_error: Some("login refused".to_string()),
        ..StubTerminal::default()
    });
    let response = router(terminal)
        .oneshot(get("/stream-bars?symbol=XAUUSD&timeframe=M1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
