use crate::error::{Error, Result};
use crate::probe::transport::ProbeTimeouts;
use crate::probe::validator::DEFAULT_TARGET_URL;
use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Validator configuration
    pub validator: ValidatorConfig,
    /// Batch runner configuration
    pub runner: RunnerConfig,
    /// Logging configuration
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorConfig {
    /// URL whose host/port every tunnel is opened to
    pub target_url: String,
    /// Connect timeout in seconds (0 = no timeout)
    pub connect_timeout: u64,
    /// Send/receive timeout in seconds (0 = no timeout)
    pub read_timeout: u64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            target_url: DEFAULT_TARGET_URL.to_string(),
            connect_timeout: 10,
            read_timeout: 10,
        }
    }
}

impl ValidatorConfig {
    pub fn timeouts(&self) -> ProbeTimeouts {
        ProbeTimeouts {
            connect: seconds(self.connect_timeout),
            read: seconds(self.read_timeout),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Number of proxies validated concurrently
    pub workers: usize,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level (debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            validator: ValidatorConfig {
                target_url: get_env_or("PROXY_CHECK_TARGET_URL", DEFAULT_TARGET_URL),
                connect_timeout: get_env_or("PROXY_CHECK_CONNECT_TIMEOUT", "10")
                    .parse()
                    .map_err(|_| {
                        Error::InvalidConfig(
                            "PROXY_CHECK_CONNECT_TIMEOUT must be a number of seconds".into(),
                        )
                    })?,
                read_timeout: get_env_or("PROXY_CHECK_READ_TIMEOUT", "10")
                    .parse()
                    .map_err(|_| {
                        Error::InvalidConfig(
                            "PROXY_CHECK_READ_TIMEOUT must be a number of seconds".into(),
                        )
                    })?,
            },
            runner: RunnerConfig {
                workers: get_env_or("PROXY_CHECK_WORKERS", "16")
                    .parse::<usize>()
                    .map_err(|_| {
                        Error::InvalidConfig("PROXY_CHECK_WORKERS must be a valid number".into())
                    })?
                    .max(1),
            },
            log: LogConfig {
                level: get_env_or("LOG_LEVEL", "info"),
                format: get_env_or("LOG_FORMAT", "pretty"),
            },
        })
    }
}

fn seconds(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Get environment variable with a default value
fn get_env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
