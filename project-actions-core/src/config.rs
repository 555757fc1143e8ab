//! Registry configuration
//!
//! A [`RegistryConfig`] can be built in code, read from the environment, or
//! parsed from JSON:
//!
//! ```json
//! {
//!   "capacity": 128,
//!   "history": 50,
//!   "log": { "include_patterns": ["*Error"], "exclude_patterns": [] }
//! }
//! ```
//!
//! Missing fields fall back to their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::action_log::{split_patterns, ActionLoggerConfig, ActionLoggerMiddleware};
use crate::error::ConfigError;

/// Default per-channel buffer, in events
pub const DEFAULT_CAPACITY: usize = 64;

/// Environment variable overriding [`RegistryConfig::capacity`]
pub const ENV_CAPACITY: &str = "PROJECT_ACTIONS_CAPACITY";
/// Environment variable with comma-separated include patterns
pub const ENV_LOG_INCLUDE: &str = "PROJECT_ACTIONS_LOG_INCLUDE";
/// Environment variable with comma-separated exclude patterns
pub const ENV_LOG_EXCLUDE: &str = "PROJECT_ACTIONS_LOG_EXCLUDE";
/// Environment variable overriding [`RegistryConfig::history`]
pub const ENV_HISTORY: &str = "PROJECT_ACTIONS_HISTORY";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Buffered events per channel before slow listeners start lagging
    pub capacity: usize,
    /// Which actions reach the log
    pub log: ActionLoggerConfig,
    /// Keep the last N logged actions in memory
    pub history: Option<usize>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            log: ActionLoggerConfig::default(),
            history: None,
        }
    }
}

impl RegistryConfig {
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_log(mut self, log: ActionLoggerConfig) -> Self {
        self.log = log;
        self
    }

    pub fn with_history(mut self, history: usize) -> Self {
        self.history = Some(history);
        self
    }

    /// Defaults overridden by `PROJECT_ACTIONS_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Like [`from_env`](Self::from_env) with an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_CAPACITY) {
            config.capacity = parse_env(ENV_CAPACITY, &raw)?;
        }
        if let Some(raw) = lookup(ENV_HISTORY) {
            config.history = Some(parse_env(ENV_HISTORY, &raw)?);
        }
        if let Some(raw) = lookup(ENV_LOG_INCLUDE) {
            config.log.include_patterns = split_patterns(&raw);
        }
        if let Some(raw) = lookup(ENV_LOG_EXCLUDE) {
            config.log.exclude_patterns = split_patterns(&raw);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Broadcast channels cannot be created with zero capacity
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::InvalidCapacity);
        }
        Ok(())
    }

    /// Logger middleware described by this config
    pub fn logger(&self) -> ActionLoggerMiddleware {
        match self.history {
            Some(history) => ActionLoggerMiddleware::with_history(self.log.clone(), history),
            None => ActionLoggerMiddleware::new(self.log.clone()),
        }
    }
}

fn parse_env(var: &'static str, raw: &str) -> Result<usize, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        var,
        value: raw.to_string(),
    })
}
