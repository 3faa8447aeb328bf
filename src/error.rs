//! Crate-level error types outside the sidecar core.

use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A variable is set but its value cannot be used.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// A variable is set but is not valid UTF-8.
    #[error("Environment variable {key} is not valid UTF-8")]
    NotUnicode { key: String },
}
