//! Market Data Records
//!
//! Fixed-shape tick and bar records plus the timeframe table. Every field
//! has a defined default so "no data" is an explicit state rather than a
//! missing attribute: a zero price field means "unknown", and
//! [`Tick::price`] turns that into an explicit `Option`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// =============================================================================
// Timeframe
// =============================================================================

/// Chart timeframe codes supported by the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum Timeframe {
    M1,
    M5,
    M15,
    M30,
    H1,
    H4,
    D1,
    W1,
    MN1,
}

impl Timeframe {
    /// Bucket width of this timeframe in seconds.
    ///
    /// D1/W1/MN1 are calendar approximations (86400 / 604800 / 2592000),
    /// matching the terminal's own bucket table.
    #[must_use]
    pub const fn bucket_secs(self) -> i64 {
        match self {
            Self::M1 => 60,
            Self::M5 => 300,
            Self::M15 => 900,
            Self::M30 => 1800,
            Self::H1 => 3600,
            Self::H4 => 14400,
            Self::D1 => 86_400,
            Self::W1 => 604_800,
            Self::MN1 => 2_592_000,
        }
    }

    /// Timeframe code as sent to the terminal gateway.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::M1 => "M1",
            Self::M5 => "M5",
            Self::M15 => "M15",
            Self::M30 => "M30",
            Self::H1 => "H1",
            Self::H4 => "H4",
            Self::D1 => "D1",
            Self::W1 => "W1",
            Self::MN1 => "MN1",
        }
    }

    /// All supported timeframes.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::M1,
            Self::M5,
            Self::M15,
            Self::M30,
            Self::H1,
            Self::H4,
            Self::D1,
            Self::W1,
            Self::MN1,
        ]
    }

    /// Bucket index of a timestamp under this timeframe.
    #[must_use]
    pub const fn bucket_index(self, time: i64) -> i64 {
        time.div_euclid(self.bucket_secs())
    }

    /// Align a timestamp down to this timeframe's bucket boundary.
    #[must_use]
    pub const fn align(self, time: i64) -> i64 {
        self.bucket_index(time) * self.bucket_secs()
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unsupported timeframe code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported timeframe {0}")]
pub struct ParseTimeframeError(pub String);

impl FromStr for Timeframe {
    type Err = ParseTimeframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "M1" => Ok(Self::M1),
            "M5" => Ok(Self::M5),
            "M15" => Ok(Self::M15),
            "M30" => Ok(Self::M30),
            "H1" => Ok(Self::H1),
            "H4" => Ok(Self::H4),
            "D1" => Ok(Self::D1),
            "W1" => Ok(Self::W1),
            "MN1" => Ok(Self::MN1),
            _ => Err(ParseTimeframeError(s.to_string())),
        }
    }
}

// =============================================================================
// Tick
// =============================================================================

/// A point-in-time market observation from the terminal.
///
/// Price fields use `0.0` for "unknown"; `volume` is the traded volume
/// increment since the previous tick. Ticks are transient inputs, never
/// retained once folded into a bar.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Tick {
    /// Source-clock timestamp, epoch seconds.
    pub time: i64,
    /// Best bid price (0.0 = unknown).
    #[serde(default)]
    pub bid: f64,
    /// Best ask price (0.0 = unknown).
    #[serde(default)]
    pub ask: f64,
    /// Last trade price (0.0 = unknown).
    #[serde(default)]
    pub last: f64,
    /// Traded volume increment.
    #[serde(default)]
    pub volume: u64,
}

impl Tick {
    /// Effective price for bar aggregation.
    ///
    /// Prefers `last`, falls back to `bid`, and yields `None` when neither
    /// is positive - the tick carries no usable price and must be skipped.
    #[must_use]
    pub fn price(&self) -> Option<f64> {
        if self.last > 0.0 {
            Some(self.last)
        } else if self.bid > 0.0 {
            Some(self.bid)
        } else {
            None
        }
    }
}

// =============================================================================
// Bar
// =============================================================================

/// An OHLCV aggregate over one bucket of wall-clock time.
///
/// `time` is the bucket start and is always an exact multiple of the
/// timeframe's bucket width.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Bucket start timestamp, epoch seconds.
    pub time: i64,
    /// First price observed in the bucket.
    pub open: f64,
    /// Highest price observed in the bucket.
    pub high: f64,
    /// Lowest price observed in the bucket.
    pub low: f64,
    /// Most recent price observed in the bucket.
    pub close: f64,
    /// Cumulative tick volume in the bucket.
    pub volume: u64,
}

impl Bar {
    /// Open a new bar from the first price in a bucket.
    #[must_use]
    pub const fn open_at(time: i64, price: f64, volume: u64) -> Self {
        Self {
            time,
            open: price,
            high: price,
            low: price,
            close: price,
            volume,
        }
    }

    /// Fold a price/volume observation into this bar.
    pub fn fold(&mut self, price: f64, volume: u64) {
        if price > self.high {
            self.high = price;
        }
        if price < self.low {
            self.low = price;
        }
        self.close = price;
        self.volume += volume;
    }

    /// Check the OHLC ordering invariant.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.low <= self.open
            && self.low <= self.close
            && self.high >= self.open
            && self.high >= self.close
    }
}

// =============================================================================
// Tests
// =============================================================================
