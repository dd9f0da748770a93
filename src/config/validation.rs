//! Configuration validation logic
//!
//! Range and format checks for every configuration section. Each check
//! reports the dotted key it guards so the message points at the file entry.

use crate::config::error::ConfigError;
use crate::config::settings::{
    DatabaseConfig, FileSettings, LoggerSettings, ServerConfig, Settings, StorageBackend,
};

const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

const VALID_LOG_FORMATS: &[&str] = &["full", "compact", "json"];

const VALID_URL_SCHEMES: &[&str] = &["postgres://", "postgresql://"];

fn ensure(ok: bool, field: &str, message: impl Into<String>) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            field: field.to_string(),
            message: message.into(),
        })
    }
}

impl ServerConfig {
    /// Port in 1..=65535, non-empty host, non-zero request timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure(
            self.port != 0,
            "server.port",
            "Port must be between 1 and 65535.",
        )?;
        ensure(
            !self.host.trim().is_empty(),
            "server.host",
            "Host must not be empty.",
        )?;
        ensure(
            self.request_timeout > 0,
            "server.request_timeout",
            "Request timeout must be greater than 0 seconds.",
        )
    }
}

impl DatabaseConfig {
    /// Connection settings only matter for the postgres backend; the
    /// in-memory backend accepts anything here.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend == StorageBackend::Memory {
            return Ok(());
        }

        ensure(
            !self.url.is_empty(),
            "database.url",
            "Database URL is required for the postgres backend.",
        )?;
        ensure(
            VALID_URL_SCHEMES
                .iter()
                .any(|scheme| self.url.starts_with(scheme)),
            "database.url",
            "Expected postgres://[user:password@]host[:port]/database",
        )?;
        ensure(
            self.max_connections > 0,
            "database.max_connections",
            "Max connections must be greater than 0.",
        )?;
        ensure(
            self.min_connections > 0,
            "database.min_connections",
            "Min connections must be greater than 0.",
        )?;
        ensure(
            self.min_connections <= self.max_connections,
            "database.min_connections",
            format!(
                "Min connections ({}) cannot exceed max connections ({}).",
                self.min_connections, self.max_connections
            ),
        )?;
        ensure(
            self.connection_timeout > 0,
            "database.connection_timeout",
            "Connection timeout must be greater than 0 seconds.",
        )
    }
}

impl FileSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        ensure(
            !self.enabled || !self.path.trim().is_empty(),
            "logger.file.path",
            "File path is required when file logging is enabled.",
        )?;
        ensure(
            VALID_LOG_FORMATS.contains(&self.format.to_lowercase().as_str()),
            "logger.file.format",
            format!(
                "Invalid log format '{}'. Valid formats are: {}",
                self.format,
                VALID_LOG_FORMATS.join(", ")
            ),
        )
    }
}

impl LoggerSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure(
            VALID_LOG_LEVELS.contains(&self.level.to_lowercase().as_str()),
            "logger.level",
            format!(
                "Invalid log level '{}'. Valid levels are: {}",
                self.level,
                VALID_LOG_LEVELS.join(", ")
            ),
        )?;

        self.file.validate()
    }
}

impl Settings {
    /// Validate all configuration settings, returning the first error found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.database.validate()?;
        self.logger.validate()
    }
}
