//! Logger Module
//!
//! Built on `tracing-subscriber` with support for:
//! - Console output with color control
//! - File output in Full, Compact or JSON format

pub mod config;

pub use config::*;

use std::fs::{File, OpenOptions};
use std::io::IsTerminal;
use std::path::Path;
use std::sync::Mutex;

use tracing::Subscriber;
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    filter::LevelFilter,
    fmt,
    layer::{Layered, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
};

/// Subscriber the file layer is stacked on.
type FilteredRegistry = Layered<EnvFilter, Registry>;

type FileLayer = Box<dyn Layer<FilteredRegistry> + Send + Sync>;

/// Initialize the global subscriber with the given configuration
pub fn init_logger(config: LoggerConfig) -> anyhow::Result<()> {
    build_subscriber(&config)?.try_init()?;

    tracing::debug!(
        level = %config.level,
        console = config.console.enabled,
        file = config.file.enabled,
        file_format = config.file.format.as_str(),
        "Logger initialized"
    );

    Ok(())
}

/// Builds the subscriber without installing it.
///
/// The file layer goes first: span fields are formatted by the first layer,
/// so a colored console layer in front would leak ANSI codes into the file.
/// See: https://github.com/tokio-rs/tracing/issues/1817
fn build_subscriber(
    config: &LoggerConfig,
) -> anyhow::Result<impl Subscriber + Send + Sync + 'static> {
    config.validate()?;

    // `RUST_LOG` directives refine the configured level, e.g. `diesel=debug`
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(config.parse_level()?).into())
        .from_env_lossy();

    let file = if config.file.enabled {
        Some(file_layer(&config.file)?)
    } else {
        None
    };
    let console = if config.console.enabled {
        Some(console_layer(&config.console))
    } else {
        None
    };

    Ok(tracing_subscriber::registry()
        .with(filter)
        .with(file)
        .with(console))
}

/// Opens the log file, creating parent directories as needed.
pub(crate) fn open_log_file(path: &Path, append: bool) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    OpenOptions::new()
        .create(true)
        .write(true)
        .append(append)
        .truncate(!append)
        .open(path)
}

fn console_layer<S>(config: &ConsoleConfig) -> fmt::Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_ansi(config.colored && std::io::stdout().is_terminal())
        .with_target(true)
        .with_level(true)
}

fn file_layer(config: &FileConfig) -> std::io::Result<FileLayer> {
    let writer = Mutex::new(open_log_file(&config.path, config.append)?);
    let layer = fmt::layer().with_ansi(false).with_target(true);

    Ok(match config.format {
        LogFormat::Full => layer.with_writer(writer).boxed(),
        LogFormat::Compact => layer.compact().with_writer(writer).boxed(),
        LogFormat::Json => layer.json().with_writer(writer).boxed(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_open_log_file_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/deeper/app.log");

        let file = open_log_file(&path, true);
        assert!(file.is_ok());
        assert!(path.exists());
    }

    #[test]
    fn test_open_log_file_truncates_without_append() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        std::fs::write(&path, "previous run\n").unwrap();

        let mut file = open_log_file(&path, false).unwrap();
        file.write_all(b"fresh\n").unwrap();
        drop(file);

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "fresh\n");
    }

    #[test]
    fn test_open_log_file_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        std::fs::write(&path, "first\n").unwrap();

        let mut file = open_log_file(&path, true).unwrap();
        file.write_all(b"second\n").unwrap();
        drop(file);

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn test_init_logger_rejects_all_outputs_disabled() {
        let mut config = LoggerConfig::default();
        config.console.enabled = false;
        config.file.enabled = false;
        assert!(init_logger(config).is_err());
    }

    #[test]
    fn test_console_and_file_together_write_every_format() {
        for format in [LogFormat::Full, LogFormat::Compact, LogFormat::Json] {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("app.log");

            let mut config = LoggerConfig::default();
            config.console.enabled = true;
            config.file = FileConfig::new(true, path.clone(), false, format).unwrap();

            let subscriber = build_subscriber(&config).unwrap();
            tracing::subscriber::with_default(subscriber, || {
                tracing::info!(user_id = 7, "user created");
            });

            let written = std::fs::read_to_string(&path).unwrap();
            assert!(written.contains("user created"), "{format:?}: {written}");
            assert!(!written.contains('\u{1b}'), "{format:?} leaked ANSI codes");
        }
    }

    #[test]
    fn test_file_only_subscriber_respects_level() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");

        let mut config = LoggerConfig::default();
        config.level = "warn".to_string();
        config.console.enabled = false;
        config.file = FileConfig::new(true, path.clone(), false, LogFormat::Compact).unwrap();

        let subscriber = build_subscriber(&config).unwrap();
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("quiet");
            tracing::warn!("loud");
        });

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("loud"));
        assert!(!written.contains("quiet"));
    }
}
