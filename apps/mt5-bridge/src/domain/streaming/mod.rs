//! Stream Event Types
//!
//! Events emitted by a streaming session, in emission order. Data events
//! carry a sequence number that increases by exactly one per event across
//! the life of a session; heartbeats are a distinct variant and never
//! consume a sequence number, so consumers can treat any gap in `seq` as a
//! protocol violation.

use crate::domain::market::{Bar, Timeframe};

/// One event on a bar stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Initial snapshot: the historical bar series the session started from.
    Bootstrap {
        /// Symbol the session was opened with.
        symbol: String,
        /// Timeframe the session was opened with.
        timeframe: Timeframe,
        /// Historical bars, oldest first. May be empty.
        bars: Vec<Bar>,
        /// Effective (clamped) bootstrap count that was requested upstream.
        bootstrap: usize,
        /// Always 0 - the bootstrap opens the sequence.
        seq: u64,
    },
    /// A tick started a new bucket.
    BarOpened {
        /// The freshly opened bar.
        bar: Bar,
        /// Sequence number of this data event.
        seq: u64,
    },
    /// A tick updated the current bucket in place.
    BarUpdated {
        /// Current state of the open bar.
        bar: Bar,
        /// Sequence number of this data event.
        seq: u64,
    },
    /// Keep-alive marker, out of band with respect to the data sequence.
    Heartbeat,
    /// Terminal fault; the session closes right after emitting this.
    Error {
        /// Human-readable fault description.
        message: String,
    },
}

impl StreamEvent {
    /// Sequence number, for data events only.
    #[must_use]
    pub const fn seq(&self) -> Option<u64> {
        match self {
            Self::Bootstrap { seq, .. }
            | Self::BarOpened { seq, .. }
            | Self::BarUpdated { seq, .. } => Some(*seq),
            Self::Heartbeat | Self::Error { .. } => None,
        }
    }
}
