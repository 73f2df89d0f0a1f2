//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use common::RetryPolicy;

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT` — `text` or `json` (default: `text`)
/// - `DATABASE_URL` — PostgreSQL event log; in-memory when unset
/// - `PROJECTION_PARTITIONS` — checkpoint partitions (default: `1`)
/// - `PROJECTION_POLL_INTERVAL_MS` — projector poll interval (default: `250`)
/// - `COMMAND_TIMEOUT_MS` — per-command deadline (default: `5000`)
/// - `RETRY_MAX_ATTEMPTS` — attempts for transient failures (default: `5`)
/// - `RETRY_INITIAL_DELAY_MS` — first backoff delay (default: `50`)
///
/// Unparsable values fall back to the default.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub projection_partitions: u32,
    pub projection_poll_interval: Duration,
    pub command_timeout: Duration,
    pub retry_max_attempts: u32,
    pub retry_initial_delay: Duration,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT")
                .and_then(|f| f.parse().ok())
                .unwrap_or(defaults.log_format),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            projection_partitions: lookup("PROJECTION_PARTITIONS")
                .and_then(|p| p.parse().ok())
                .filter(|p| *p > 0)
                .unwrap_or(defaults.projection_partitions),
            projection_poll_interval: parsed("PROJECTION_POLL_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.projection_poll_interval),
            command_timeout: parsed("COMMAND_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.command_timeout),
            retry_max_attempts: lookup("RETRY_MAX_ATTEMPTS")
                .and_then(|n| n.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.retry_max_attempts),
            retry_initial_delay: parsed("RETRY_INITIAL_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_initial_delay),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Backoff used by the projector and the bid adapter.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_max_attempts, self.retry_initial_delay)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            projection_partitions: 1,
            projection_poll_interval: projections::DEFAULT_POLL_INTERVAL,
            command_timeout: domain::DEFAULT_COMMAND_TIMEOUT,
            retry_max_attempts: 5,
            retry_initial_delay: Duration::from_millis(50),
        }
    }
}
