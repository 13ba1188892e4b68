//! Bridge Configuration Settings
//!
//! Configuration types for the bridge, loaded from environment variables.

use std::time::Duration;

use crate::application::services::StreamSettings;

/// Terminal gateway connection and login settings.
#[derive(Clone)]
pub struct TerminalSettings {
    /// Gateway socket address, e.g. `127.0.0.1:5002`.
    pub gateway_addr: String,
    /// Account number to log in with.
    pub account: i64,
    /// Account password.
    pub password: String,
    /// Broker server name.
    pub server: String,
}

impl std::fmt::Debug for TerminalSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalSettings")
            .field("gateway_addr", &self.gateway_addr)
            .field("account", &self.account)
            .field("password", &"[REDACTED]")
            .field("server", &self.server)
            .finish()
    }
}

/// HTTP server settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Bind host. Local bridge, so loopback by default.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Allowed CORS origin for the web frontend.
    pub allowed_origin: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5001,
            allowed_origin: "http://localhost:3000".to_string(),
        }
    }
}

/// Complete bridge configuration.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// HTTP server settings.
    pub server: ServerSettings,
    /// Terminal gateway settings.
    pub terminal: TerminalSettings,
    /// Streaming session timing and sizing.
    pub stream: StreamSettings,
    /// Shared bridge token; empty disables the auth gate.
    pub auth_token: String,
}

impl BridgeConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required terminal credentials are missing or
    /// malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let account_raw = std::env::var("MT5_ACCOUNT")
            .map_err(|_| ConfigError::MissingEnvVar("MT5_ACCOUNT".to_string()))?;
        let account: i64 = account_raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue("MT5_ACCOUNT".to_string(), account_raw))?;

        let password = std::env::var("MT5_PASSWORD")
            .map_err(|_| ConfigError::MissingEnvVar("MT5_PASSWORD".to_string()))?;
        if password.is_empty() {
            return Err(ConfigError::EmptyValue("MT5_PASSWORD".to_string()));
        }

        let server = std::env::var("MT5_SERVER")
            .map_err(|_| ConfigError::MissingEnvVar("MT5_SERVER".to_string()))?;
        if server.is_empty() {
            return Err(ConfigError::EmptyValue("MT5_SERVER".to_string()));
        }

        let terminal = TerminalSettings {
            gateway_addr: std::env::var("MT5_GATEWAY_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:5002".to_string()),
            account,
            password,
            server,
        };

        let defaults = ServerSettings::default();
        let http = ServerSettings {
            host: std::env::var("BRIDGE_HOST").unwrap_or(defaults.host),
            port: parse_env_u16("BRIDGE_PORT", defaults.port),
            allowed_origin: std::env::var("BRIDGE_ALLOWED_ORIGIN").unwrap_or(defaults.allowed_origin),
        };

        let stream_defaults = StreamSettings::default();
        let stream = StreamSettings {
            idle_min: parse_env_duration_millis("BRIDGE_IDLE_MIN_MS", stream_defaults.idle_min),
            idle_step: parse_env_duration_millis("BRIDGE_IDLE_STEP_MS", stream_defaults.idle_step),
            idle_max: parse_env_duration_millis("BRIDGE_IDLE_MAX_MS", stream_defaults.idle_max),
            heartbeat_interval: parse_env_duration_secs(
                "BRIDGE_HEARTBEAT_SECS",
                stream_defaults.heartbeat_interval,
            ),
            default_bootstrap_bars: parse_env_usize(
                "BRIDGE_DEFAULT_BOOTSTRAP_BARS",
                stream_defaults.default_bootstrap_bars,
            ),
            max_bootstrap_bars: parse_env_usize(
                "BRIDGE_MAX_BOOTSTRAP_BARS",
                stream_defaults.max_bootstrap_bars,
            ),
            channel_capacity: parse_env_usize(
                "BRIDGE_STREAM_CHANNEL_CAPACITY",
                stream_defaults.channel_capacity,
            ),
        };

        Ok(Self {
            server: http,
            terminal,
            stream,
            auth_token: std::env::var("BRIDGE_TOKEN").unwrap_or_default(),
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Environment variable could not be parsed.
    #[error("environment variable {0} has invalid value {1:?}")]
    InvalidValue(String, String),
}

fn parse_env_u16(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_duration_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

fn parse_env_duration_millis(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}
