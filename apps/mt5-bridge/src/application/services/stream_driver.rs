//! Streaming Session Driver
//!
//! Drives one client's bar stream: bootstraps a historical series, then
//! polls the tick source, folds new ticks through the [`BarAggregator`] and
//! emits sequenced events into the session's channel.
//!
//! One driver task per client connection. The session state (aggregator,
//! sequence counter, idle delay, last tick timestamp) is owned exclusively
//! by the task - single writer, no locking. Cancellation is cooperative:
//! the disconnect signal is checked once per loop iteration and the idle
//! sleep itself is cancellation-aware.
//!
//! The idle delay ramps additively while the market is quiet (min 50ms,
//! +20ms per idle iteration, capped at 300ms) and snaps back to the
//! minimum on any activity. A fixed-period heartbeat keeps the transport
//! alive independently of the ramp and never consumes a sequence number.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{HistorySource, TerminalError, TickSource};
use crate::domain::aggregate::{BarAggregator, BarDelta};
use crate::domain::market::Timeframe;
use crate::domain::streaming::StreamEvent;

// =============================================================================
// Settings
// =============================================================================

/// Timing and sizing knobs for streaming sessions.
#[derive(Debug, Clone)]
pub struct StreamSettings {
    /// Idle delay after an activity iteration.
    pub idle_min: Duration,
    /// Additive idle ramp step per quiet iteration.
    pub idle_step: Duration,
    /// Idle delay cap.
    pub idle_max: Duration,
    /// Fixed heartbeat period.
    pub heartbeat_interval: Duration,
    /// Bootstrap bar count used when the client does not ask for one.
    pub default_bootstrap_bars: usize,
    /// Upper clamp for the bootstrap bar count.
    pub max_bootstrap_bars: usize,
    /// Capacity of a session's event channel.
    pub channel_capacity: usize,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            idle_min: Duration::from_millis(50),
            idle_step: Duration::from_millis(20),
            idle_max: Duration::from_millis(300),
            heartbeat_interval: Duration::from_secs(10),
            default_bootstrap_bars: 300,
            max_bootstrap_bars: 2000,
            channel_capacity: 64,
        }
    }
}

impl StreamSettings {
    /// Effective bootstrap count for a client-supplied request.
    #[must_use]
    pub fn clamp_bootstrap(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_bootstrap_bars)
            .clamp(1, self.max_bootstrap_bars)
    }
}

// =============================================================================
// Request
// =============================================================================

/// Parameters a session was opened with. Fixed for the session's lifetime.
#[derive(Debug, Clone)]
pub struct StreamRequest {
    /// Symbol to stream.
    pub symbol: String,
    /// Timeframe deriving the bucket width.
    pub timeframe: Timeframe,
    /// Effective (already clamped) bootstrap bar count.
    pub bootstrap: usize,
}

// =============================================================================
// Idle backoff
// =============================================================================

/// Additive idle ramp with a floor and a cap.
///
/// Monotonically non-decreasing across consecutive quiet iterations, reset
/// to the floor on any activity.
#[derive(Debug, Clone)]
pub struct IdleBackoff {
    delay: Duration,
    min: Duration,
    step: Duration,
    max: Duration,
}

impl IdleBackoff {
    /// Create a ramp starting at its floor.
    #[must_use]
    pub const fn new(min: Duration, step: Duration, max: Duration) -> Self {
        Self {
            delay: min,
            min,
            step,
            max,
        }
    }

    /// Current delay.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// One quiet iteration: grow toward the cap.
    pub fn bump(&mut self) {
        self.delay = (self.delay + self.step).min(self.max);
    }

    /// Activity observed: snap back to the floor.
    pub fn reset(&mut self) {
        self.delay = self.min;
    }
}

impl From<&StreamSettings> for IdleBackoff {
    fn from(settings: &StreamSettings) -> Self {
        Self::new(settings.idle_min, settings.idle_step, settings.idle_max)
    }
}

// =============================================================================
// Driver
// =============================================================================

/// Owns one streaming session from bootstrap to close.
pub struct StreamDriver {
    ticks: Arc<dyn TickSource>,
    history: Arc<dyn HistorySource>,
    settings: StreamSettings,
    cancel: CancellationToken,
}

impl StreamDriver {
    /// Create a driver over the injected terminal ports.
    #[must_use]
    pub fn new(
        ticks: Arc<dyn TickSource>,
        history: Arc<dyn HistorySource>,
        settings: StreamSettings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            ticks,
            history,
            settings,
            cancel,
        }
    }

    /// Run the session until disconnect, cancellation, or a fatal fault.
    ///
    /// A fault that occurs after streaming began is reported once as an
    /// in-band [`StreamEvent::Error`] and the session closes; nothing is
    /// emitted after it. Disconnect and cancellation close silently.
    pub async fn run(self, request: StreamRequest, tx: mpsc::Sender<StreamEvent>) {
        let session = uuid::Uuid::new_v4();
        tracing::info!(
            %session,
            symbol = %request.symbol,
            timeframe = %request.timeframe,
            bootstrap = request.bootstrap,
            "stream session started"
        );

        match self.stream(&request, &tx).await {
            Ok(()) => {
                tracing::info!(%session, "stream session closed");
            }
            Err(e) => {
                tracing::warn!(%session, error = %e, "stream session failed");
                let _ = tx
                    .send(StreamEvent::Error {
                        message: e.to_string(),
                    })
                    .await;
            }
        }
    }

    async fn stream(
        &self,
        request: &StreamRequest,
        tx: &mpsc::Sender<StreamEvent>,
    ) -> Result<(), TerminalError> {
        let mut aggregator = BarAggregator::new(request.timeframe);

        // Bootstrap. A failed or empty history fetch degrades to an empty
        // series instead of failing the session.
        let bars = match self
            .history
            .fetch_bars(&request.symbol, request.timeframe, request.bootstrap)
            .await
        {
            Ok(bars) => bars,
            Err(e) => {
                tracing::warn!(
                    symbol = %request.symbol,
                    error = %e,
                    "history bootstrap failed, starting empty"
                );
                Vec::new()
            }
        };
        if let Some(last) = bars.last() {
            aggregator.seed(*last);
        }

        let mut seq: u64 = 0;
        if tx
            .send(StreamEvent::Bootstrap {
                symbol: request.symbol.clone(),
                timeframe: request.timeframe,
                bars,
                bootstrap: request.bootstrap,
                seq,
            })
            .await
            .is_err()
        {
            return Ok(());
        }

        let mut last_tick_time: i64 = 0;
        let mut idle = IdleBackoff::from(&self.settings);
        let mut heartbeat_at = Instant::now() + self.settings.heartbeat_interval;

        loop {
            if self.cancel.is_cancelled() || tx.is_closed() {
                return Ok(());
            }

            let tick = self.ticks.latest_tick(&request.symbol).await?;
            match tick {
                Some(tick) if tick.time != 0 && tick.time != last_tick_time => {
                    last_tick_time = tick.time;
                    if let Some(delta) = aggregator.apply(&tick) {
                        seq += 1;
                        let event = match delta {
                            BarDelta::Opened(bar) => StreamEvent::BarOpened { bar, seq },
                            BarDelta::Updated(bar) => StreamEvent::BarUpdated { bar, seq },
                        };
                        if tx.send(event).await.is_err() {
                            return Ok(());
                        }
                        idle.reset();
                    } else {
                        idle.bump();
                    }
                }
                _ => idle.bump(),
            }

            if Instant::now() >= heartbeat_at {
                if tx.send(StreamEvent::Heartbeat).await.is_err() {
                    return Ok(());
                }
                heartbeat_at = Instant::now() + self.settings.heartbeat_interval;
            }

            tokio::select! {
                () = self.cancel.cancelled() => return Ok(()),
                () = tokio::time::sleep(idle.delay()) => {}
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;
    use crate::application::ports::{MockHistorySource, MockTickSource};
    use crate::domain::market::{Bar, Tick};

    fn tick(time: i64, last: f64) -> Tick {
        Tick {
            time,
            last,
            volume: 1,
            ..Tick::default()
        }
    }

    /// Tick source that plays a script, then repeats its final entry.
    fn scripted_ticks(script: Vec<Option<Tick>>) -> MockTickSource {
        let queue = Mutex::new(VecDeque::from(script));
        let mut ticks = MockTickSource::new();
        ticks.expect_latest_tick().returning(move |_| {
            let mut queue = queue.lock().unwrap();
            let next = if queue.len() > 1 {
                queue.pop_front().flatten()
            } else {
                queue.front().cloned().flatten()
            };
            Ok(next)
        });
        ticks
    }

    fn empty_history() -> MockHistorySource {
        let mut history = MockHistorySource::new();
        history.expect_fetch_bars().returning(|_, _, _| Ok(Vec::new()));
        history
    }

    fn test_settings() -> StreamSettings {
        StreamSettings::default()
    }

    fn spawn_driver(
        ticks: MockTickSource,
        history: MockHistorySource,
        request: StreamRequest,
    ) -> (mpsc::Receiver<StreamEvent>, CancellationToken) {
        let cancel = CancellationToken::new();
        let driver = StreamDriver::new(
            Arc::new(ticks),
            Arc::new(history),
            test_settings(),
            cancel.clone(),
        );
        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(driver.run(request, tx));
        (rx, cancel)
    }

    fn request(bootstrap: usize) -> StreamRequest {
        StreamRequest {
            symbol: "XAUUSD".to_string(),
            timeframe: Timeframe::M1,
            bootstrap,
        }
    }

    #[test]
    fn backoff_ramps_additively_to_cap() {
        let mut idle = IdleBackoff::new(
            Duration::from_millis(50),
            Duration::from_millis(20),
            Duration::from_millis(300),
        );
        assert_eq!(idle.delay(), Duration::from_millis(50));

        let mut previous = idle.delay();
        for _ in 0..30 {
            idle.bump();
            assert!(idle.delay() >= previous);
            previous = idle.delay();
        }
        assert_eq!(idle.delay(), Duration::from_millis(300));

        idle.reset();
        assert_eq!(idle.delay(), Duration::from_millis(50));
    }

    #[test]
    fn bootstrap_clamp() {
        let settings = StreamSettings::default();
        assert_eq!(settings.clamp_bootstrap(Some(5000)), 2000);
        assert_eq!(settings.clamp_bootstrap(Some(0)), 1);
        assert_eq!(settings.clamp_bootstrap(Some(250)), 250);
        assert_eq!(settings.clamp_bootstrap(None), 300);
    }

    #[tokio::test(start_paused = true)]
    async fn bootstrap_event_opens_the_sequence() {
        let history_bar = Bar::open_at(60, 10.0, 3);
        let mut history = MockHistorySource::new();
        history
            .expect_fetch_bars()
            .withf(|symbol, tf, count| symbol == "XAUUSD" && *tf == Timeframe::M1 && *count == 2000)
            .returning(move |_, _, _| Ok(vec![history_bar]));

        let ticks = scripted_ticks(vec![None]);
        let (mut rx, cancel) = spawn_driver(ticks, history, request(2000));

        match rx.recv().await.unwrap() {
            StreamEvent::Bootstrap {
                symbol,
                bars,
                bootstrap,
                seq,
                ..
            } => {
                assert_eq!(symbol, "XAUUSD");
                assert_eq!(bars, vec![history_bar]);
                assert_eq!(bootstrap, 2000);
                assert_eq!(seq, 0);
            }
            other => panic!("expected bootstrap, got {other:?}"),
        }
        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn data_events_are_strictly_sequenced() {
        let ticks = scripted_ticks(vec![
            Some(tick(100, 10.0)),
            Some(tick(110, 12.0)),
            Some(tick(110, 12.0)), // duplicate timestamp, must not emit
            Some(tick(161, 8.0)),
            None,
        ]);
        let (mut rx, cancel) = spawn_driver(ticks, empty_history(), request(300));

        let mut data = Vec::new();
        while data.len() < 4 {
            match rx.recv().await.unwrap() {
                StreamEvent::Heartbeat => {}
                event => data.push(event),
            }
        }
        cancel.cancel();

        let seqs: Vec<u64> = data.iter().filter_map(StreamEvent::seq).collect();
        assert_eq!(seqs, vec![0, 1, 2, 3]);

        assert!(matches!(&data[0], StreamEvent::Bootstrap { bars, .. } if bars.is_empty()));
        match &data[1] {
            StreamEvent::BarOpened { bar, .. } => {
                assert_eq!(bar.time, 60);
                assert_eq!(bar.open, 10.0);
            }
            other => panic!("expected bar open, got {other:?}"),
        }
        match &data[2] {
            StreamEvent::BarUpdated { bar, .. } => {
                assert_eq!(bar.high, 12.0);
                assert_eq!(bar.close, 12.0);
            }
            other => panic!("expected bar update, got {other:?}"),
        }
        match &data[3] {
            StreamEvent::BarOpened { bar, .. } => {
                assert_eq!(bar.time, 120);
                assert_eq!(bar.open, 8.0);
            }
            other => panic!("expected second bar open, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeats_never_consume_sequence_numbers() {
        // Quiet for long enough to cross the heartbeat deadline, then one
        // tick. Its sequence number must follow the bootstrap's directly.
        let mut script: Vec<Option<Tick>> = vec![None; 80];
        script.push(Some(tick(100, 10.0)));
        let ticks = scripted_ticks(script);
        let (mut rx, cancel) = spawn_driver(ticks, empty_history(), request(300));

        let mut saw_heartbeat = false;
        loop {
            match rx.recv().await.unwrap() {
                StreamEvent::Heartbeat => saw_heartbeat = true,
                StreamEvent::Bootstrap { seq, .. } => assert_eq!(seq, 0),
                StreamEvent::BarOpened { seq, .. } => {
                    assert_eq!(seq, 1);
                    break;
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert!(saw_heartbeat, "quiet stretch must produce heartbeats");
        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_the_stream_cleanly() {
        let ticks = scripted_ticks(vec![Some(tick(100, 10.0))]);
        let (mut rx, cancel) = spawn_driver(ticks, empty_history(), request(300));

        // Bootstrap plus the first data event.
        assert!(matches!(
            rx.recv().await.unwrap(),
            StreamEvent::Bootstrap { .. }
        ));
        assert!(matches!(
            rx.recv().await.unwrap(),
            StreamEvent::BarOpened { .. }
        ));

        cancel.cancel();

        // Drain: no error event, channel just closes.
        while let Some(event) = rx.recv().await {
            assert!(!matches!(event, StreamEvent::Error { .. }));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_receiver_terminates_the_session() {
        let ticks = scripted_ticks(vec![Some(tick(100, 10.0))]);
        let driver = StreamDriver::new(
            Arc::new(ticks),
            Arc::new(empty_history()),
            test_settings(),
            CancellationToken::new(),
        );
        let (tx, rx) = mpsc::channel(64);
        let handle = tokio::spawn(driver.run(request(300), tx));
        drop(rx);

        // The driver must observe the closed channel and finish on its own,
        // without cancellation.
        tokio::time::timeout(Duration::from_secs(30), handle)
            .await
            .expect("driver kept running after the receiver was dropped")
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn poll_fault_emits_one_error_then_closes() {
        let mut ticks = MockTickSource::new();
        ticks
            .expect_latest_tick()
            .returning(|_| Err(TerminalError::Request("terminal gone".to_string())));
        let (mut rx, _cancel) = spawn_driver(ticks, empty_history(), request(300));

        assert!(matches!(
            rx.recv().await.unwrap(),
            StreamEvent::Bootstrap { .. }
        ));
        match rx.recv().await.unwrap() {
            StreamEvent::Error { message } => {
                assert!(message.contains("terminal gone"));
            }
            other => panic!("expected error event, got {other:?}"),
        }
        assert!(rx.recv().await.is_none(), "nothing may follow the error");
    }

    #[tokio::test(start_paused = true)]
    async fn failed_bootstrap_degrades_to_empty_series() {
        let mut history = MockHistorySource::new();
        history
            .expect_fetch_bars()
            .returning(|_, _, _| Err(TerminalError::Request("history down".to_string())));
        let ticks = scripted_ticks(vec![None]);
        let (mut rx, cancel) = spawn_driver(ticks, history, request(300));

        match rx.recv().await.unwrap() {
            StreamEvent::Bootstrap { bars, seq, .. } => {
                assert!(bars.is_empty());
                assert_eq!(seq, 0);
            }
            other => panic!("expected bootstrap, got {other:?}"),
        }
        cancel.cancel();
    }
}
