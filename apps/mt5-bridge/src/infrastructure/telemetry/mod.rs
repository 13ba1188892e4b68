//! Tracing Subscriber Setup
//!
//! Structured logging via `tracing` with an env-filter and a fmt layer.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Log level directives (default: `mt5_bridge=info`)

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize the global tracing subscriber.
///
/// # Panics
///
/// Panics if a static filter directive fails to parse, which cannot happen
/// for the directives used here.
#[allow(clippy::expect_used)]
pub fn init() {
    let env_filter = EnvFilter::from_default_env()
        .add_directive(
            "mt5_bridge=info"
                .parse()
                .expect("static directive 'mt5_bridge=info' is valid"),
        )
        .add_directive(
            "tower_http=info"
                .parse()
                .expect("static directive 'tower_http=info' is valid"),
        )
        .add_directive(
            "hyper=warn"
                .parse()
                .expect("static directive 'hyper=warn' is valid"),
        );

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
