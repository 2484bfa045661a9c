//! Configuration management for the scheduler
//!
//! Values are layered, lowest precedence first: built-in defaults, an optional
//! TOML file, `HSCHED_*` environment variables, then command-line flags (applied
//! by the binary).

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::models::{SCHEDULER_GROUP, URL_FOUND_SUBJECT, URL_TODO_SUBJECT};
use crate::scheduler::RefreshPolicy;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Upper bound for `bus.max_in_flight`
pub const MAX_IN_FLIGHT_LIMIT: usize = 4096;

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Message bus configuration
    pub bus: BusConfig,

    /// Resource index API configuration
    pub index: IndexConfig,

    /// Scheduling policy
    pub scheduler: SchedulerConfig,

    /// Ops server configuration
    pub server: ServerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// NATS JetStream configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// NATS server URI
    pub nats_uri: String,

    /// JetStream stream holding both subjects
    pub stream: String,

    /// Subject carrying discovered URLs
    pub inbound_subject: String,

    /// Subject receiving schedule requests
    pub outbound_subject: String,

    /// Consumer group; instances sharing it split the inbound work
    pub group: String,

    /// Maximum handlers running at once per instance
    pub max_in_flight: usize,

    /// Seconds before an unacknowledged delivery is redelivered
    pub ack_wait_secs: u64,

    /// Seconds the bus waits before redelivering a nacked message
    pub nack_delay_secs: u64,

    /// Delivery attempts before the bus gives up on a message
    pub max_deliver: i64,

    /// Seconds a message may stay in the stream unacknowledged (0 = no limit)
    pub max_age_secs: u64,
}

/// Resource index API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Base URI of the index API
    pub api_uri: String,

    /// Bearer token (optional)
    pub api_token: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Scheduling policy configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Minimum age before an indexed URL is crawled again (`"7days"`, `"12h"`).
    /// Unset, empty or unparsable disables re-crawling.
    pub refresh_delay: Option<String>,
}

/// Ops server configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address for `/health` and `/metrics`; the server is off when unset
    pub metrics_addr: Option<SocketAddr>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Config {
    /// Defaults overridden by the environment
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Load configuration from a file
    ///
    /// Missing keys keep their default values.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from an optional file, then apply the environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Override values with `HSCHED_*` environment variables
    ///
    /// Unset variables leave the current value alone; numeric variables that
    /// do not parse are ignored.
    pub fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("HSCHED_NATS_URI") {
            self.bus.nats_uri = v;
        }
        if let Ok(v) = std::env::var("HSCHED_STREAM") {
            self.bus.stream = v;
        }
        if let Ok(v) = std::env::var("HSCHED_GROUP") {
            self.bus.group = v;
        }
        if let Some(v) = env_parse::<usize>("HSCHED_MAX_IN_FLIGHT") {
            self.bus.max_in_flight = v;
        }
        if let Some(v) = env_parse::<u64>("HSCHED_STREAM_MAX_AGE") {
            self.bus.max_age_secs = v;
        }

        if let Ok(v) = std::env::var("HSCHED_API_URI") {
            self.index.api_uri = v;
        }
        if let Ok(v) = std::env::var("HSCHED_API_TOKEN") {
            self.index.api_token = Some(v).filter(|t| !t.is_empty());
        }
        if let Some(v) = env_parse::<u64>("HSCHED_INDEX_TIMEOUT") {
            self.index.timeout_secs = v;
        }

        if let Ok(v) = std::env::var("HSCHED_REFRESH_DELAY") {
            self.scheduler.refresh_delay = Some(v);
        }

        if let Some(v) = env_parse::<SocketAddr>("HSCHED_METRICS_ADDR") {
            self.server.metrics_addr = Some(v);
        }

        if let Ok(v) = std::env::var("HSCHED_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Ok(v) = std::env::var("HSCHED_LOG_FORMAT") {
            self.logging.format = v;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bus.nats_uri.trim().is_empty() {
            return Err(invalid("nats_uri must not be empty"));
        }

        if self.bus.inbound_subject.is_empty() || self.bus.outbound_subject.is_empty() {
            return Err(invalid("bus subjects must not be empty"));
        }

        if self.bus.inbound_subject == self.bus.outbound_subject {
            return Err(invalid(format!(
                "inbound and outbound subjects must differ (both are {})",
                self.bus.inbound_subject
            )));
        }

        if self.bus.stream.is_empty() || self.bus.group.is_empty() {
            return Err(invalid("stream and group must not be empty"));
        }

        if self.bus.max_in_flight == 0 || self.bus.max_in_flight > MAX_IN_FLIGHT_LIMIT {
            return Err(invalid(format!(
                "max_in_flight must be between 1 and {MAX_IN_FLIGHT_LIMIT}, got {}",
                self.bus.max_in_flight
            )));
        }

        if self.bus.ack_wait_secs == 0 {
            return Err(invalid("ack_wait_secs must be greater than 0"));
        }

        if self.bus.max_deliver == 0 {
            return Err(invalid("max_deliver must be positive, or negative for unlimited"));
        }

        let api_uri = self.index.api_uri.trim();
        if api_uri.is_empty() {
            return Err(invalid("api_uri must not be empty"));
        }
        match url::Url::parse(api_uri) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => {
                return Err(invalid(format!(
                    "api_uri must be http or https, got {}",
                    url.scheme()
                )))
            }
            Err(e) => return Err(invalid(format!("api_uri is not a valid URL: {e}"))),
        }

        if self.index.timeout_secs == 0 {
            return Err(invalid("index timeout must be greater than 0"));
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            return Err(invalid(format!(
                "log format must be text or json, got {}",
                self.logging.format
            )));
        }

        Ok(())
    }

    /// Effective refresh policy
    #[must_use]
    pub fn refresh_policy(&self) -> RefreshPolicy {
        RefreshPolicy::from_option(self.scheduler.refresh_delay.as_deref())
    }

    /// Get index request timeout as Duration
    #[must_use]
    pub fn index_timeout(&self) -> Duration {
        Duration::from_secs(self.index.timeout_secs)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

impl BusConfig {
    /// Maximum message age in the stream, `None` when unlimited
    #[must_use]
    pub fn max_age(&self) -> Option<Duration> {
        (self.max_age_secs > 0).then(|| Duration::from_secs(self.max_age_secs))
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            nats_uri: String::from("nats://localhost:4222"),
            stream: String::from("CRAWLER"),
            inbound_subject: String::from(URL_FOUND_SUBJECT),
            outbound_subject: String::from(URL_TODO_SUBJECT),
            group: String::from(SCHEDULER_GROUP),
            max_in_flight: 16,
            ack_wait_secs: 30,
            nack_delay_secs: 5,
            max_deliver: 10,
            max_age_secs: 7 * 24 * 3600,
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            api_uri: String::from("http://localhost:15005"),
            api_token: None,
            timeout_secs: 10,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}
