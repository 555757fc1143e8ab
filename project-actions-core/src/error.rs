//! Error types

use thiserror::Error;

/// Errors from resolving actions by name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("unknown action: {0:?}")]
    UnknownAction(String),
}

/// Errors from receiving on an [`ActionListener`](crate::ActionListener)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ListenError {
    /// The listener fell behind and the oldest events were overwritten
    #[error("listener lagged behind, {0} events skipped")]
    Lagged(u64),

    /// Every handle to the registry has been dropped
    #[error("registry closed")]
    Closed,
}

/// Errors from loading a [`RegistryConfig`](crate::RegistryConfig)
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("channel capacity must be greater than zero")]
    InvalidCapacity,

    #[error("invalid value {value:?} for {var}")]
    InvalidEnv { var: &'static str, value: String },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
}
