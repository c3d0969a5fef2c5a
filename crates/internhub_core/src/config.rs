//! Runtime configuration for the data-access layer.
//!
//! Values come from `INTERNHUB_*` environment variables. Blank values count
//! as unset and fall back to defaults.

use crate::breaker::{BreakerConfig, DEFAULT_FAILURE_THRESHOLD, DEFAULT_RESET_TIMEOUT};
use crate::docstore::{FailFastPolicy, DEFAULT_CEILING};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::Duration;

pub const DATABASE_URL_KEY: &str = "INTERNHUB_DATABASE_URL";
pub const DOCUMENT_URI_KEY: &str = "INTERNHUB_DOCUMENT_URI";
pub const DOCUMENT_DATABASE_KEY: &str = "INTERNHUB_DOCUMENT_DATABASE";
pub const BREAKER_FAILURES_KEY: &str = "INTERNHUB_BREAKER_FAILURES";
pub const BREAKER_COOLDOWN_KEY: &str = "INTERNHUB_BREAKER_COOLDOWN_SECS";
pub const DOCUMENT_TIMEOUT_KEY: &str = "INTERNHUB_DOCUMENT_TIMEOUT_MS";
pub const LOG_LEVEL_KEY: &str = "INTERNHUB_LOG_LEVEL";
pub const LOG_DIR_KEY: &str = "INTERNHUB_LOG_DIR";

const DEFAULT_DATABASE_URL: &str = "internhub.sqlite3";
const DEFAULT_DOCUMENT_URI: &str = "http://localhost:5984";
const DEFAULT_DOCUMENT_DATABASE: &str = "internhub";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidNumber { key: &'static str, value: String },
    OutOfRange { key: &'static str, reason: &'static str },
    Empty { key: &'static str },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidNumber { key, value } => {
                write!(f, "{key} must be a whole number, got `{value}`")
            }
            Self::OutOfRange { key, reason } => write!(f, "{key} {reason}"),
            Self::Empty { key } => write!(f, "{key} cannot be empty"),
        }
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessConfig {
    /// File path, `sqlite://<path>` or `:memory:`.
    pub relational_url: String,
    /// `http(s)://` for a CouchDB-compatible server, `memory://` in-process.
    pub document_uri: String,
    pub document_database: String,
    pub breaker: BreakerConfig,
    pub fail_fast: FailFastPolicy,
    pub log_level: Option<String>,
    pub log_dir: Option<String>,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            relational_url: DEFAULT_DATABASE_URL.to_string(),
            document_uri: DEFAULT_DOCUMENT_URI.to_string(),
            document_database: DEFAULT_DOCUMENT_DATABASE.to_string(),
            breaker: BreakerConfig::default(),
            fail_fast: FailFastPolicy::default(),
            log_level: None,
            log_dir: None,
        }
    }
}

impl AccessConfig {
    /// Fully in-process configuration: in-memory SQLite and document engine.
    pub fn in_memory() -> Self {
        Self {
            relational_url: ":memory:".to_string(),
            document_uri: "memory://".to_string(),
            ..Self::default()
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Parses configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let failure_threshold =
            parse_number(BREAKER_FAILURES_KEY, read(BREAKER_FAILURES_KEY))?
                .unwrap_or(DEFAULT_FAILURE_THRESHOLD);
        if failure_threshold == 0 {
            return Err(ConfigError::OutOfRange {
                key: BREAKER_FAILURES_KEY,
                reason: "must be at least 1",
            });
        }

        let reset_timeout = parse_number::<u64>(BREAKER_COOLDOWN_KEY, read(BREAKER_COOLDOWN_KEY))?
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_RESET_TIMEOUT);

        let ceiling = match parse_number::<u64>(DOCUMENT_TIMEOUT_KEY, read(DOCUMENT_TIMEOUT_KEY))? {
            Some(0) => {
                return Err(ConfigError::OutOfRange {
                    key: DOCUMENT_TIMEOUT_KEY,
                    reason: "must be greater than 0",
                })
            }
            Some(millis) => Duration::from_millis(millis),
            None => DEFAULT_CEILING,
        };

        Ok(Self {
            relational_url: read(DATABASE_URL_KEY)
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            document_uri: read(DOCUMENT_URI_KEY)
                .unwrap_or_else(|| DEFAULT_DOCUMENT_URI.to_string()),
            document_database: read(DOCUMENT_DATABASE_KEY)
                .unwrap_or_else(|| DEFAULT_DOCUMENT_DATABASE.to_string()),
            breaker: BreakerConfig {
                failure_threshold,
                reset_timeout,
            },
            fail_fast: FailFastPolicy::uniform(ceiling),
            log_level: read(LOG_LEVEL_KEY),
            log_dir: read(LOG_DIR_KEY),
        })
    }

    /// Rejects values that parse but cannot be used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.relational_url.trim().is_empty() {
            return Err(ConfigError::Empty {
                key: DATABASE_URL_KEY,
            });
        }
        if self.document_uri.trim().is_empty() {
            return Err(ConfigError::Empty {
                key: DOCUMENT_URI_KEY,
            });
        }
        if self.document_database.trim().is_empty() {
            return Err(ConfigError::Empty {
                key: DOCUMENT_DATABASE_KEY,
            });
        }
        if self.breaker.failure_threshold == 0 {
            return Err(ConfigError::OutOfRange {
                key: BREAKER_FAILURES_KEY,
                reason: "must be at least 1",
            });
        }
        Ok(())
    }
}

fn parse_number<T: FromStr>(key: &'static str, raw: Option<String>) -> Result<Option<T>, ConfigError> {
    raw.map(|value| {
        value
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { key, value })
    })
    .transpose()
}
