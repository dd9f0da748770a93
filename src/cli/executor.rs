//! Command executor for dispatching CLI commands
//!
//! Entry point for running a parsed command once configuration is loaded.

use super::handlers::ServeCommandHandler;
use super::parser::{Cli, Commands};
use crate::config::settings::Settings;
use crate::error::{AppError, AppResult};

/// Execute a CLI command with the given settings
///
/// No subcommand behaves like `serve`.
///
/// # Errors
/// Returns errors from command handlers or argument validation failures
pub async fn execute_command(cli: &Cli, settings: Settings) -> AppResult<()> {
    cli.validate().map_err(|reason| AppError::Validation {
        field: "cli_arguments".to_string(),
        reason,
    })?;

    let dry_run = match cli.command {
        Some(Commands::Serve { dry_run, .. }) => dry_run,
        None => false,
    };

    ServeCommandHandler::new(settings).execute(dry_run).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn create_valid_config() -> Settings {
        let mut config = Settings::default();
        config.database.url = "postgres://localhost/test".to_string();
        config
    }

    #[tokio::test]
    async fn test_execute_serve_dry_run() {
        let cli = Cli::try_parse_from(["userbase", "serve", "--dry-run"]).unwrap();
        assert!(execute_command(&cli, create_valid_config()).await.is_ok());
    }

    #[tokio::test]
    async fn test_execute_rejects_conflicting_flags() {
        // Built by hand since clap refuses the combination while parsing
        let cli = Cli {
            command: Some(Commands::Serve {
                host: None,
                port: None,
                dry_run: true,
                in_memory: false,
            }),
            config: None,
            env: None,
            verbose: true,
            quiet: true,
        };

        let err = execute_command(&cli, create_valid_config()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { field, .. } if field == "cli_arguments"));
    }
}
