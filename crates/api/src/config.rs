//! Application configuration loaded from environment variables.

use std::time::Duration;

use domain::{DEFAULT_MAX_ATTEMPTS, RegressionPolicy};
use notify::DEFAULT_SUBSCRIBER_BUFFER;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid value for {key}: '{value}'")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` (default `0.0.0.0`) and `PORT` (default `3000`)
/// - `RUST_LOG`: tracing filter (default `info`)
/// - `DELAY_THRESHOLD_MINUTES`: age at which the scheduled scan flags an
///   open order (default `20`)
/// - `DELAY_SCAN_INTERVAL_SECS`: scan cadence, `0` turns the scheduler off
///   (default `60`)
/// - `SUBSCRIBER_BUFFER`: per-observer notification queue (default `256`)
/// - `REGRESSION_POLICY`: `permit`, `reject` or `clear_timestamps`
/// - `COMMAND_MAX_ATTEMPTS`: optimistic-concurrency retries (default `16`)
/// - `DIRECTORY_FILE`: JSON seed for products, tables and waiters
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub delay_threshold_minutes: u32,
    pub delay_scan_interval_secs: u64,
    pub subscriber_buffer: usize,
    pub regression_policy: RegressionPolicy,
    pub command_max_attempts: u32,
    pub directory_file: Option<String>,
}

impl Config {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`; unset keys take their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parsed(&lookup, "PORT", defaults.port)?,
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            delay_threshold_minutes: parsed(
                &lookup,
                "DELAY_THRESHOLD_MINUTES",
                defaults.delay_threshold_minutes,
            )?,
            delay_scan_interval_secs: parsed(
                &lookup,
                "DELAY_SCAN_INTERVAL_SECS",
                defaults.delay_scan_interval_secs,
            )?,
            subscriber_buffer: parsed(&lookup, "SUBSCRIBER_BUFFER", defaults.subscriber_buffer)?,
            regression_policy: parsed(&lookup, "REGRESSION_POLICY", defaults.regression_policy)?,
            command_max_attempts: parsed(
                &lookup,
                "COMMAND_MAX_ATTEMPTS",
                defaults.command_max_attempts,
            )?,
            directory_file: lookup("DIRECTORY_FILE").filter(|path| !path.is_empty()),
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// `None` when the delay scheduler is turned off.
    pub fn delay_scan_interval(&self) -> Option<Duration> {
        (self.delay_scan_interval_secs > 0)
            .then(|| Duration::from_secs(self.delay_scan_interval_secs))
    }
}

fn parsed<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError { key, value }),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            delay_threshold_minutes: 20,
            delay_scan_interval_secs: 60,
            subscriber_buffer: DEFAULT_SUBSCRIBER_BUFFER,
            regression_policy: RegressionPolicy::default(),
            command_max_attempts: DEFAULT_MAX_ATTEMPTS,
            directory_file: None,
        }
    }
}
