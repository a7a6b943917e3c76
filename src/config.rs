//! Configuration System
//!
//! Provides hierarchical configuration loading from:
//! - config.toml (default configuration)
//! - config.local.toml (git-ignored local overrides)
//! - Environment variables (`FACTGRAPH_*` prefix)
//!
//! ## Example
//!
//! ```toml
//! # config.toml
//! [store]
//! max_attempts = 5
//!
//! [dispatch]
//! fuel_limit = 10000
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! FACTGRAPH_STORE__MAX_ATTEMPTS=8
//! FACTGRAPH_DISPATCH__FUEL_LIMIT=5000
//! ```

use crate::store::RetryPolicy;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Retry/backoff parameters for the fact store (§4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl StoreConfig {
    pub fn to_retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

fn default_max_attempts() -> u32 {
    5
}
fn default_initial_delay_ms() -> u64 {
    10
}
fn default_max_delay_ms() -> u64 {
    500
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// Trigger-dispatch safeguards (§4.7/§9: optional fuel counter against
/// non-terminating re-entrant dispatch chains).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// `None` disables the limit (dispatch runs to quiescence unbounded).
    #[serde(default = "default_fuel_limit")]
    pub fuel_limit: Option<u64>,
}

fn default_fuel_limit() -> Option<u64> {
    Some(10_000)
}

impl Default for DispatchConfig {
    fn default() -> Self {
        DispatchConfig {
            fuel_limit: default_fuel_limit(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// Merges in order:
    /// 1. `config.toml` (base configuration)
    /// 2. `config.local.toml` (local overrides, git-ignored)
    /// 3. Environment variables (`FACTGRAPH_*` prefix)
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("config.toml"))
            .merge(Toml::file("config.local.toml"))
            .merge(Env::prefixed("FACTGRAPH_").split("__"))
            .extract()
    }

    /// Load configuration from a specific file path.
    pub fn from_file(path: &str) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("FACTGRAPH_").split("__"))
            .extract()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            store: StoreConfig::default(),
            dispatch: DispatchConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_retry_budget() {
        let config = Config::default();
        assert_eq!(config.store.max_attempts, 5);
        assert_eq!(config.dispatch.fuel_limit, Some(10_000));
    }

    #[test]
    fn retry_policy_round_trips() {
        let config = Config::default();
        let policy = config.store.to_retry_policy();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.initial_delay, Duration::from_millis(10));
    }

    #[test]
    fn serializes_to_expected_sections() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("[store]"));
        assert!(toml_str.contains("[dispatch]"));
        assert!(toml_str.contains("[logging]"));
    }
}
