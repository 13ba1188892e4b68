//! SSE Wire Encoding
//!
//! Maps [`StreamEvent`] values onto the server-sent-events wire. Data
//! events become unnamed `data:` frames carrying a JSON object with a
//! `type` discriminator and a `_seq` field; heartbeats become the SSE
//! comment `:hb`, invisible to `EventSource` consumers but enough to keep
//! intermediaries from timing the connection out.

use axum::response::sse::Event;
use serde_json::json;

use crate::domain::streaming::StreamEvent;

/// Encode one stream event as an SSE frame.
#[must_use]
pub fn encode(event: &StreamEvent) -> Event {
    match event {
        StreamEvent::Bootstrap {
            symbol,
            timeframe,
            bars,
            bootstrap,
            seq,
        } => data_frame(&json!({
            "type": "bootstrap",
            "symbol": symbol,
            "timeframe": timeframe.as_str(),
            "bars": bars,
            "bootstrap": bootstrap,
            "_seq": seq,
        })),
        StreamEvent::BarOpened { bar, seq } => data_frame(&json!({
            "type": "bar-new",
            "bar": bar,
            "_seq": seq,
        })),
        StreamEvent::BarUpdated { bar, seq } => data_frame(&json!({
            "type": "bar-update",
            "bar": bar,
            "_seq": seq,
        })),
        StreamEvent::Heartbeat => Event::default().comment("hb"),
        StreamEvent::Error { message } => data_frame(&json!({
            "type": "error",
            "message": message,
        })),
    }
}

fn data_frame(value: &serde_json::Value) -> Event {
    // serde_json string output never contains raw newlines, so the payload
    // always fits a single data line.
    Event::default().data(value.to_string())
}
