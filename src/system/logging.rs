//! Logging system initialization
//!
//! Sets up the tracing subscriber from the `[logging]` section.

use tracing_appender::non_blocking::WorkerGuard;

use crate::config::LoggingConfig;
use crate::errors::{MetricsError, Result};

/// Initialize logging system based on configuration
///
/// `RUST_LOG`, when set, overrides `config.level`.
///
/// # Returns
/// * `WorkerGuard` - Must be kept alive for the duration of the program
///   to ensure non-blocking log writes are flushed
///
/// # Errors
/// * If the log file cannot be opened
/// * If the filter directive is invalid
/// * If a global subscriber is already installed
pub fn init_logging(config: &LoggingConfig) -> Result<WorkerGuard> {
    let to_file = config.file.as_ref().is_some_and(|f| !f.is_empty());

    let writer: Box<dyn std::io::Write + Send + Sync> = match &config.file {
        Some(log_file) if !log_file.is_empty() => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_file)?;
            Box::new(file)
        }
        _ => Box::new(std::io::stdout()),
    };

    let (non_blocking_writer, guard) = tracing_appender::non_blocking(writer);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&config.level))
        .map_err(|e| {
            MetricsError::config(format!("invalid log level '{}': {}", config.level, e))
        })?;

    let subscriber_builder = tracing_subscriber::fmt()
        .with_writer(non_blocking_writer)
        .with_env_filter(filter)
        .with_level(true)
        .with_ansi(!to_file);

    let installed = if config.format == "json" {
        subscriber_builder.json().try_init()
    } else {
        subscriber_builder.try_init()
    };
    if let Err(e) = installed {
        let message = format!("failed to install logger: {}", e);
        return Err(MetricsError::config(message));
    }

    Ok(guard)
}
