//! HTTP Handlers
//!
//! Request handlers for the bridge endpoints. `/health`, `/healthz` and
//! `/metrics` are open probe endpoints; everything else passes the
//! [`BridgeAuth`] gate before touching the terminal.

use std::convert::Infallible;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::http::header::{CACHE_CONTROL, HeaderMap, HeaderValue};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use futures_util::Stream;
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::application::services::{StreamDriver, StreamRequest};
use crate::domain::market::Timeframe;
use crate::infrastructure::metrics;

use super::auth::BridgeAuth;
use super::error::ApiError;
use super::sse;
use super::state::{AppState, SessionGuard};

/// Count clamp for `/history`, matching the bootstrap clamp bounds.
const HISTORY_MAX_BARS: usize = 2000;
const HISTORY_DEFAULT_BARS: usize = 1000;

fn no_store() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers
}

fn parse_timeframe(raw: &str) -> Result<Timeframe, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("unsupported timeframe {raw}")))
}

// =============================================================================
// Probe endpoints
// =============================================================================

/// `GET /health` — terminal status probe.
pub async fn health(State(state): State<AppState>) -> Response {
    match state.terminal.status().await {
        Ok(status) => {
            state.bridge.mark_terminal_ok();
            Json(json!({
                "ok": true,
                "connected": status.connected,
                "account": status.account,
                "server": status.server,
                "uptime_secs": state.bridge.uptime_secs(),
                "streams_active": state.bridge.sessions_active(),
                "events_emitted": state.bridge.events_emitted(),
            }))
            .into_response()
        }
        Err(e) => {
            state.bridge.mark_terminal_error(e.to_string());
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                no_store(),
                Json(json!({ "ok": false, "err": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// `GET /healthz` — liveness probe.
pub async fn healthz() -> &'static str {
    "ok"
}

/// `GET /metrics` — Prometheus exposition.
pub async fn prometheus_metrics() -> Response {
    metrics::get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "metrics recorder not initialized",
            )
                .into_response()
        },
        |handle| handle.render().into_response(),
    )
}

// =============================================================================
// History
// =============================================================================

/// Query parameters for `GET /history`.
#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    /// Symbol to fetch.
    pub symbol: String,
    /// Timeframe code, case-insensitive.
    pub timeframe: String,
    /// Bar count, clamped server-side.
    pub count: Option<usize>,
}

/// `GET /history?symbol&timeframe&count`
pub async fn history(
    _auth: BridgeAuth,
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<Response, ApiError> {
    let timeframe = parse_timeframe(&params.timeframe)?;
    let count = params
        .count
        .unwrap_or(HISTORY_DEFAULT_BARS)
        .clamp(1, HISTORY_MAX_BARS);

    state.terminal.ensure_session().await?;
    tracing::debug!(symbol = %params.symbol, %timeframe, count, "history request");

    let bars = state
        .history
        .fetch_bars(&params.symbol, timeframe, count)
        .await?;
    state.bridge.mark_terminal_ok();

    Ok((
        no_store(),
        Json(json!({
            "symbol": params.symbol,
            "timeframe": timeframe.as_str(),
            "bars": bars,
        })),
    )
        .into_response())
}

// =============================================================================
// Tick
// =============================================================================

/// Query parameters for `GET /tick`.
#[derive(Debug, Deserialize)]
pub struct TickParams {
    /// Symbol to look up.
    pub symbol: String,
}

/// `GET /tick?symbol`
///
/// Outside market hours the terminal often reports no live price; the
/// handler falls back to the last M1 close so quote displays keep showing
/// something, and answers 404 only when even that is unavailable.
pub async fn tick(
    _auth: BridgeAuth,
    State(state): State<AppState>,
    Query(params): Query<TickParams>,
) -> Result<Response, ApiError> {
    state.terminal.ensure_session().await?;

    let live = state.ticks.latest_tick(&params.symbol).await?;
    state.bridge.mark_terminal_ok();

    let (bid, ask, volume, mut time) = live.as_ref().map_or((0.0, 0.0, 0, 0), |t| {
        (t.bid, t.ask, t.volume, t.time)
    });
    let mut best = live.as_ref().and_then(crate::domain::market::Tick::price);

    if best.is_none() {
        let bars = state
            .history
            .fetch_bars(&params.symbol, Timeframe::M1, 1)
            .await?;
        if let Some(last_bar) = bars.last()
            && last_bar.close > 0.0
        {
            best = Some(last_bar.close);
            if time <= 0 {
                time = last_bar.time;
            }
        }
    }

    let Some(best) = best else {
        return Err(ApiError::NotFound(format!(
            "no tick for {}",
            params.symbol
        )));
    };

    Ok((
        no_store(),
        Json(json!({
            "time": time,
            "bid": (bid > 0.0).then_some(bid),
            "ask": (ask > 0.0).then_some(ask),
            "last": best,
            "volume": volume,
        })),
    )
        .into_response())
}

// =============================================================================
// Symbols
// =============================================================================

/// `GET /symbols` — the terminal's symbol directory.
pub async fn symbols(
    _auth: BridgeAuth,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    state.terminal.ensure_session().await?;
    let symbols = state.terminal.list_symbols().await?;
    state.bridge.mark_terminal_ok();
    Ok(Json(json!({ "symbols": symbols })).into_response())
}

// =============================================================================
// Stream
// =============================================================================

/// Query parameters for `GET /stream-bars`.
#[derive(Debug, Deserialize)]
pub struct StreamParams {
    /// Symbol to stream.
    pub symbol: String,
    /// Timeframe code, case-insensitive.
    pub timeframe: String,
    /// Bootstrap bar count, clamped server-side.
    pub bars: Option<usize>,
}

/// `GET /stream-bars?symbol&timeframe&bars`
///
/// Validates the request and ensures the terminal session up front, so
/// pre-stream failures surface as plain rejected requests. Once the SSE
/// response starts, faults travel in-band as `error` events instead.
pub async fn stream_bars(
    _auth: BridgeAuth,
    State(state): State<AppState>,
    Query(params): Query<StreamParams>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let timeframe = parse_timeframe(&params.timeframe)?;
    if params.symbol.trim().is_empty() {
        return Err(ApiError::BadRequest("symbol must not be empty".to_string()));
    }

    if let Err(e) = state.terminal.ensure_session().await {
        state.bridge.mark_terminal_error(e.to_string());
        return Err(e.into());
    }
    state.bridge.mark_terminal_ok();

    let request = StreamRequest {
        symbol: params.symbol,
        timeframe,
        bootstrap: state.config.stream.clamp_bootstrap(params.bars),
    };

    let (tx, rx) = mpsc::channel(state.config.stream.channel_capacity);
    let driver = StreamDriver::new(
        state.ticks.clone(),
        state.history.clone(),
        state.config.stream.clone(),
        state.shutdown.child_token(),
    );
    tokio::spawn(driver.run(request, tx));

    let guard = SessionGuard::open(state.bridge.clone());
    let bridge = state.bridge.clone();
    let stream = ReceiverStream::new(rx).map(move |event| {
        let _keep_open = &guard;
        bridge.record_event(&event);
        Ok::<_, Infallible>(sse::encode(&event))
    });

    // The driver already emits fixed-period heartbeats; no extra SSE
    // keep-alive layer on top.
    Ok(Sse::new(stream))
}
