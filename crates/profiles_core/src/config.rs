//! Process configuration loaded from environment variables.
//!
//! # Responsibility
//! - Resolve database path, logging and timeout settings for binaries.
//!
//! # Invariants
//! - `PROFILES_DB_PATH` is required; every other key has a default.
//! - `PROFILES_LOG_DIR`, when set, must be absolute.

use crate::db::DbOptions;
use crate::logging::{default_log_level, normalize_level};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DB_PATH: &str = "PROFILES_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "PROFILES_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "PROFILES_LOG_DIR";
pub const ENV_BUSY_TIMEOUT_MS: &str = "PROFILES_BUSY_TIMEOUT_MS";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "PROFILES_REQUEST_TIMEOUT_MS";

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    InvalidNumber { key: &'static str, value: String },
    InvalidLogLevel(String),
    RelativeLogDir(PathBuf),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(key) => write!(f, "missing required setting {key}"),
            Self::InvalidNumber { key, value } => {
                write!(f, "{key} must be a non-negative integer, got `{value}`")
            }
            Self::InvalidLogLevel(message) => write!(f, "{message}"),
            Self::RelativeLogDir(path) => write!(
                f,
                "{ENV_LOG_DIR} must be an absolute path, got `{}`",
                path.display()
            ),
        }
    }
}

impl Error for ConfigError {}

/// Resolved settings for a profiles process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub log_level: &'static str,
    /// `None` logs to stderr.
    pub log_dir: Option<PathBuf>,
    pub busy_timeout: Duration,
    /// Deadline applied to each request context; `None` means no deadline.
    pub request_timeout: Option<Duration>,
}

impl AppConfig {
    /// Loads settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads settings through `lookup`, which returns the raw value per key.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let db_path = read(ENV_DB_PATH)
            .map(PathBuf::from)
            .ok_or(ConfigError::Missing(ENV_DB_PATH))?;

        let log_level = match read(ENV_LOG_LEVEL) {
            Some(value) => normalize_level(&value).map_err(ConfigError::InvalidLogLevel)?,
            None => default_log_level(),
        };

        let log_dir = read(ENV_LOG_DIR).map(PathBuf::from);
        if let Some(dir) = &log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::RelativeLogDir(dir.clone()));
            }
        }

        let busy_timeout_ms = match read(ENV_BUSY_TIMEOUT_MS) {
            Some(value) => parse_millis(ENV_BUSY_TIMEOUT_MS, value)?,
            None => DEFAULT_BUSY_TIMEOUT_MS,
        };
        let request_timeout = read(ENV_REQUEST_TIMEOUT_MS)
            .map(|value| parse_millis(ENV_REQUEST_TIMEOUT_MS, value))
            .transpose()?
            .map(Duration::from_millis);

        Ok(Self {
            db_path,
            log_level,
            log_dir,
            busy_timeout: Duration::from_millis(busy_timeout_ms),
            request_timeout,
        })
    }

    pub fn db_options(&self) -> DbOptions {
        DbOptions {
            busy_timeout: self.busy_timeout,
        }
    }
}

fn parse_millis(key: &'static str, value: String) -> Result<u64, ConfigError> {
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidNumber { key, value })
}
