//! Service configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::EventsError;

/// Top-level service configuration.
///
/// Loaded once at startup via [`EventsConfig::from_env`].
#[derive(Debug, Clone)]
pub struct EventsConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:5100`).
    pub listen_addr: SocketAddr,

    /// Path of the WebSocket upgrade endpoint.
    pub ws_path: String,

    /// Outbound queue length per WebSocket session. Events beyond this are
    /// dropped for that session.
    pub queue_length: usize,

    /// How long shutdown waits for sessions to drain.
    pub shutdown_timeout: Duration,

    /// Emit JSON log lines instead of human-readable ones.
    pub json_logs: bool,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 5100)),
            ws_path: "/admin/ws".to_string(),
            queue_length: 250,
            shutdown_timeout: Duration::from_secs(30),
            json_logs: false,
        }
    }
}

impl EventsConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to defaults when a variable is not set. Calls
    /// `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// | Variable                    | Default       |
    /// |-----------------------------|---------------|
    /// | `LISTEN_ADDR`               | `0.0.0.0:5100`|
    /// | `ADMIN_EVENTS_PATH`         | `/admin/ws`   |
    /// | `ADMIN_EVENTS_QUEUE_LENGTH` | `250`         |
    /// | `SHUTDOWN_TIMEOUT_SECS`     | `30`          |
    /// | `LOG_FORMAT`                | `text`        |
    ///
    /// # Errors
    ///
    /// Returns [`EventsError::InvalidConfig`] if `LISTEN_ADDR` is set but
    /// cannot be parsed as a [`SocketAddr`].
    pub fn from_env() -> Result<Self, EventsError> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let listen_addr = match std::env::var("LISTEN_ADDR") {
            Ok(raw) => raw.parse::<SocketAddr>().map_err(|err| {
                EventsError::InvalidConfig {
                    key: "LISTEN_ADDR",
                    message: err.to_string(),
                }
            })?,
            Err(_) => defaults.listen_addr,
        };

        let ws_path = std::env::var("ADMIN_EVENTS_PATH")
            .ok()
            .map(|p| normalize_path(&p))
            .unwrap_or(defaults.ws_path);

        let queue_length = parse_env("ADMIN_EVENTS_QUEUE_LENGTH", defaults.queue_length).max(1);
        let shutdown_timeout = Duration::from_secs(parse_env(
            "SHUTDOWN_TIMEOUT_SECS",
            defaults.shutdown_timeout.as_secs(),
        ));
        let json_logs = std::env::var("LOG_FORMAT")
            .is_ok_and(|v| v.eq_ignore_ascii_case("json"));

        Ok(Self {
            listen_addr,
            ws_path,
            queue_length,
            shutdown_timeout,
            json_logs,
        })
    }
}

/// Ensures a route path starts with exactly one `/`.
fn normalize_path(path: &str) -> String {
    format!("/{}", path.trim().trim_start_matches('/'))
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
