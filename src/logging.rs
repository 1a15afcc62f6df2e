//! Tracing setup: console output plus `combined.log` and `error.log` files.

use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, filter::LevelFilter, fmt, prelude::*};

pub const SERVICE_NAME: &str = "calculator-service";

/// Keeps the background log writers alive; drop it only at shutdown.
pub struct LogGuards {
    _combined: WorkerGuard,
    _errors: WorkerGuard,
}

/// Install the global subscriber. `RUST_LOG` overrides the default `info` level.
pub fn init(log_dir: &Path) -> Result<LogGuards> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let (combined_writer, combined_guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(log_dir, "combined.log"));
    let (error_writer, error_guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(log_dir, "error.log"));

    let env_filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_filter(env_filter()))
        .with(
            fmt::layer()
                .json()
                .with_writer(combined_writer)
                .with_filter(env_filter()),
        )
        .with(
            fmt::layer()
                .json()
                .with_writer(error_writer)
                .with_filter(LevelFilter::ERROR),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(LogGuards {
        _combined: combined_guard,
        _errors: error_guard,
    })
}
