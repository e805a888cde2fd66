//! Logging setup for both subcommands

use crate::settings::LogFormat;
use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const LOG_FILE_NAME: &str = "mlb-stats.log";
const DEFAULT_FILTER: &str = "info";

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the default `info` filter. When `directory` is set,
/// events are also appended (without ANSI colors) to `mlb-stats.log` there;
/// keep the returned guard alive until exit so buffered lines are flushed.
pub fn init_logging(format: LogFormat, directory: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
        .context("Failed to create env filter")?;

    let stdout_layer = match format {
        // Production: JSON structured logging
        LogFormat::Json => fmt::layer().json().boxed(),
        // Development: Pretty formatting with colors
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
    };

    let (file_layer, guard) = match directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, LOG_FILE_NAME));
            let layer = fmt::layer().with_writer(writer).with_ansi(false).boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}
