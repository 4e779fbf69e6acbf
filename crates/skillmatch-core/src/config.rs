//! Layered configuration loading using figment.
//!
//! Sources (highest wins):
//! 1. Environment variables (`SKILLMATCH_*` prefix, `__` as separator)
//! 2. `skillmatch.toml` in the working directory, or the file given explicitly
//! 3. Built-in defaults
//!
//! `SKILLMATCH_STORE__PATH` -> `store.path`, `SKILLMATCH_ALLOCATION__MAX_ATTEMPTS`
//! -> `allocation.max_attempts`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::RetryPolicy;

pub const DEFAULT_CONFIG_FILE: &str = "skillmatch.toml";
pub const ENV_PREFIX: &str = "SKILLMATCH_";
/// Log filter override read by the binary; not a config key.
pub const LOG_ENV: &str = "SKILLMATCH_LOG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Figment(#[from] figment::Error),

    #[error("Configuration file {0} does not exist")]
    MissingFile(PathBuf),

    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StoreConfig {
    pub path: PathBuf,
    pub lock_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("skillmatch.json"),
            lock_timeout_ms: 5_000,
        }
    }
}

impl StoreConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AllocationConfig {
    pub max_attempts: u32,
    pub retry_base_delay_ms: u64,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_base_delay_ms: 10,
        }
    }
}

impl AllocationConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.retry_base_delay_ms),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub allocation: AllocationConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl EngineConfig {
    /// Load from defaults, the config file and the environment.
    ///
    /// With `explicit = Some(path)` the file must exist; otherwise
    /// `skillmatch.toml` is used when present.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let config: Self = Self::figment(explicit)?.extract()?;
        config.check()?;
        Ok(config)
    }

    /// Build the provider chain. Public so callers can layer more providers on top.
    pub fn figment(explicit: Option<&Path>) -> Result<Figment, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        match explicit {
            Some(path) if !path.is_file() => {
                return Err(ConfigError::MissingFile(path.to_path_buf()));
            }
            Some(path) => figment = figment.merge(Toml::file(path)),
            None => {
                let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                if local.is_file() {
                    figment = figment.merge(Toml::file(local));
                }
            }
        }

        Ok(figment.merge(Env::prefixed(ENV_PREFIX).ignore(&["log"]).split("__")))
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.store.path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "store.path".into(),
                reason: "must not be empty".into(),
            });
        }
        if self.allocation.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "allocation.max_attempts".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}
