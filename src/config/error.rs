//! Configuration error types

use std::path::PathBuf;

use thiserror::Error;

/// Failures while locating, merging or checking settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Required configuration file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Sources merged but do not fit [`Settings`](super::Settings)
    #[error("Failed to deserialize configuration: {0}")]
    Deserialize(#[source] config::ConfigError),

    #[error("Validation error: {field} - {message}")]
    ValidationError {
        /// Dotted path of the offending key, e.g. `server.port`
        field: String,
        message: String,
    },

    #[error("Invalid environment '{0}'. Valid values are: development, test, staging, production")]
    InvalidEnvironment(String),

    #[error("{0} and {1} cannot both be set")]
    ConflictingSources(&'static str, &'static str),

    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

impl ConfigError {
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        ConfigError::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }
}
