//! Tick-to-Bar Aggregation
//!
//! Pure state transition from `(current bar, current bucket index, tick)` to
//! `(updated bar, updated bucket index, delta)`. The aggregator holds exactly
//! one open bar; a tick whose bucket index differs from the current one
//! replaces it in place. The replaced bar is not re-emitted: consumers must
//! treat the last update for a bucket as its final state.
//!
//! Timestamp deduplication is intentionally not handled here - the session
//! driver filters duplicate-timestamp ticks before folding.

use crate::domain::market::{Bar, Tick, Timeframe};

// =============================================================================
// Delta
// =============================================================================

/// Outcome of folding one tick into the aggregator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BarDelta {
    /// The tick started a new bucket; the carried bar is freshly opened.
    Opened(Bar),
    /// The tick updated the current bucket in place.
    Updated(Bar),
}

impl BarDelta {
    /// The bar carried by this delta.
    #[must_use]
    pub const fn bar(&self) -> Bar {
        match self {
            Self::Opened(bar) | Self::Updated(bar) => *bar,
        }
    }
}

// =============================================================================
// Aggregator
// =============================================================================

/// Folds an irregular tick sequence into time-bucketed OHLCV bars.
///
/// The bucket width is fixed for the aggregator's lifetime, derived once
/// from the session's timeframe.
#[derive(Debug)]
pub struct BarAggregator {
    timeframe: Timeframe,
    current: Option<Bar>,
    bucket: Option<i64>,
}

impl BarAggregator {
    /// Create an empty aggregator for one timeframe.
    #[must_use]
    pub const fn new(timeframe: Timeframe) -> Self {
        Self {
            timeframe,
            current: None,
            bucket: None,
        }
    }

    /// Seed the current bar and bucket index from a historical bar.
    pub fn seed(&mut self, bar: Bar) {
        self.bucket = Some(self.timeframe.bucket_index(bar.time));
        self.current = Some(bar);
    }

    /// The current open bar, if any.
    #[must_use]
    pub const fn current(&self) -> Option<&Bar> {
        self.current.as_ref()
    }

    /// Fold one tick into the aggregator.
    ///
    /// A tick with no usable price is a no-op and leaves all state
    /// untouched. This transition never fails.
    pub fn apply(&mut self, tick: &Tick) -> Option<BarDelta> {
        let price = tick.price()?;
        let bidx = self.timeframe.bucket_index(tick.time);

        if self.bucket != Some(bidx) {
            let bar = Bar::open_at(
                bidx * self.timeframe.bucket_secs(),
                price,
                tick.volume,
            );
            self.bucket = Some(bidx);
            self.current = Some(bar);
            return Some(BarDelta::Opened(bar));
        }

        let bar = self.current.as_mut()?;
        bar.fold(price, tick.volume);
        Some(BarDelta::Updated(*bar))
    }
}

// =============================================================================
// Tests
// =============================================================================
