//! Logging setup
//!
//! Installs the global `tracing` subscriber: an `EnvFilter` (where `RUST_LOG`
//! wins over the configured level), a stderr layer, and an optional
//! daily-rotated file layer. Stdout is left alone for responses.

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::config::LoggingConfig;

/// File name prefix for rotated log files
const LOG_FILE_PREFIX: &str = "deduction-oracle.log";

/// Build the filter: `RUST_LOG` if set, the configured level otherwise
fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(directives)
            .with_context(|| format!("invalid {} directives", EnvFilter::DEFAULT_ENV)),
        _ => EnvFilter::try_new(&config.level)
            .with_context(|| format!("invalid log level '{}'", config.level)),
    }
}

/// Initialize the global subscriber
///
/// Returns the file writer's guard when a log directory is configured; keep
/// it alive until shutdown or buffered records are lost.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = env_filter(config)?;

    let stderr_layer = if config.json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .boxed()
    } else {
        fmt::layer().with_writer(std::io::stderr).with_target(true).boxed()
    };

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("global tracing subscriber already installed")?;

    tracing::debug!(level = %config.level, json = config.json, "Logging initialized");
    Ok(guard)
}
