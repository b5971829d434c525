//! Tracing setup.
//!
//! `local` logs human-readable lines, `prod` logs JSON. When a log directory
//! is configured, a daily-rotated JSON file is written as well.

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

const LOG_FILE_PREFIX: &str = "gitnotes.log";

/// Install the global subscriber.
///
/// Filter precedence: `cli_level`, then `RUST_LOG`, then `config_level`.
/// The returned guard must stay alive for file output to be flushed.
pub fn init(
    environment: &str,
    config_level: &str,
    cli_level: Option<&str>,
    dir: Option<&Path>,
) -> Result<Option<WorkerGuard>> {
    let filter = match cli_level {
        Some(level) => EnvFilter::try_new(level),
        None => EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(config_level)),
    }
    .unwrap_or_else(|_| EnvFilter::new("info"));

    let console = match environment {
        "prod" => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed(),
        _ => fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    let (file, guard) = match dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log directory: {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(guard)
}
