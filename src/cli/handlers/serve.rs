//! Serve command handler
//!
//! Handles `serve --dry-run` and hands real startup to [`crate::server::Server`].

use crate::config::{StorageBackend, settings::Settings};
use crate::error::AppResult;
use crate::server::Server;

/// Handler for the serve command
pub struct ServeCommandHandler {
    config: Settings,
}

impl ServeCommandHandler {
    /// Create a new serve command handler
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    /// Execute the serve command
    ///
    /// With `dry_run` the configuration is validated and reported without
    /// binding a socket or opening database connections.
    ///
    /// # Errors
    /// - Configuration validation errors
    /// - Server startup errors (if not dry-run)
    pub async fn execute(self, dry_run: bool) -> AppResult<()> {
        if dry_run {
            return self.validate_only();
        }

        Server::new(self.config)
            .run()
            .await
            .map_err(|source| crate::error::AppError::Internal { source })
    }

    /// Validate configuration without starting the server
    pub fn validate_only(&self) -> AppResult<()> {
        self.config.validate()?;

        println!("✓ Configuration is valid");
        println!("✓ Server would bind to: {}", self.config.server.address());
        match self.config.database.backend {
            StorageBackend::Postgres => println!(
                "✓ PostgreSQL pool: {}-{} connections",
                self.config.database.min_connections, self.config.database.max_connections
            ),
            StorageBackend::Memory => println!("✓ In-memory storage (data is not persisted)"),
        }
        println!("✓ Logger level: {}", self.config.logger.level);

        println!("Dry run completed successfully");
        Ok(())
    }

    /// Get the configuration
    pub fn config(&self) -> &Settings {
        &self.config
    }
}
