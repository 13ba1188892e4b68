//! MT5 Bridge Binary
//!
//! Starts the local market data bridge.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin mt5-bridge
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `MT5_ACCOUNT`: Terminal account number
//! - `MT5_PASSWORD`: Terminal account password
//! - `MT5_SERVER`: Broker server name
//!
//! ## Optional
//! - `MT5_GATEWAY_ADDR`: Terminal gateway socket (default: 127.0.0.1:5002)
//! - `BRIDGE_HOST`: Bind host (default: 127.0.0.1)
//! - `BRIDGE_PORT`: Bind port (default: 5001)
//! - `BRIDGE_TOKEN`: Shared auth token; empty disables the gate
//! - `BRIDGE_ALLOWED_ORIGIN`: CORS origin (default: <http://localhost:3000>)
//! - `BRIDGE_HEARTBEAT_SECS`: Stream heartbeat period (default: 10)
//! - `BRIDGE_IDLE_MIN_MS` / `BRIDGE_IDLE_STEP_MS` / `BRIDGE_IDLE_MAX_MS`:
//!   Idle poll ramp (defaults: 50 / 20 / 300)
//! - `BRIDGE_DEFAULT_BOOTSTRAP_BARS` / `BRIDGE_MAX_BOOTSTRAP_BARS`:
//!   Bootstrap sizing (defaults: 300 / 2000)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;

use mt5_bridge::application::ports::{HistorySource, TerminalSession, TickSource};
use mt5_bridge::infrastructure::http::{self, AppState};
use mt5_bridge::infrastructure::telemetry;
use mt5_bridge::infrastructure::terminal::TerminalClient;
use mt5_bridge::{BridgeConfig, init_metrics};
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    telemetry::init();

    tracing::info!("Starting MT5 bridge");

    let _metrics_handle = init_metrics();

    let config = Arc::new(BridgeConfig::from_env()?);
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    let terminal = Arc::new(TerminalClient::new(config.terminal.clone()));

    let state = AppState::new(
        terminal.clone() as Arc<dyn TickSource>,
        terminal.clone() as Arc<dyn HistorySource>,
        terminal.clone() as Arc<dyn TerminalSession>,
        Arc::clone(&config),
        shutdown_token.clone(),
    );
    let app = http::router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "bridge listening");

    let serve_shutdown = shutdown_token.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            await_shutdown(serve_shutdown).await;
        })
        .await?;

    terminal.shutdown().await;

    tracing::info!("Bridge stopped");
    Ok(())
}

/// Load `.env`, walking up from the working directory when needed.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

fn log_config(config: &BridgeConfig) {
    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        gateway = %config.terminal.gateway_addr,
        auth = !config.auth_token.is_empty(),
        "Configuration loaded"
    );
    tracing::debug!(
        heartbeat_secs = config.stream.heartbeat_interval.as_secs(),
        idle_min_ms = config.stream.idle_min.as_millis(),
        idle_max_ms = config.stream.idle_max.as_millis(),
        default_bootstrap = config.stream.default_bootstrap_bars,
        max_bootstrap = config.stream.max_bootstrap_bars,
        "Stream settings"
    );
}

/// Wait for Ctrl+C or SIGTERM, then cancel the shutdown token.
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();
}
