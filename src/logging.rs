//! Tracing setup for the `distill` binary.
//!
//! Compact lines go to stderr, filtered by `RUST_LOG` (default `distill=warn`,
//! `distill=debug` with `--verbose`). When a log directory is given, every
//! event at info level or above is also appended as JSON to `distill.log`.

use anyhow::{Context, Result, anyhow};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

pub const LOG_FILE: &str = "distill.log";

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop; keep it alive for the
/// whole command.
pub fn init(verbose: bool, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let stderr_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(stderr_directive(verbose)));
    let stderr = fmt::layer()
        .compact()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(stderr_filter);

    let (file, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
            let appender = tracing_appender::rolling::never(dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(EnvFilter::new(file_directive(verbose)));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr)
        .with(file)
        .try_init()
        .map_err(|err| anyhow!(err.to_string()))?;

    Ok(guard)
}

fn stderr_directive(verbose: bool) -> &'static str {
    if verbose { "distill=debug" } else { "distill=warn" }
}

fn file_directive(verbose: bool) -> &'static str {
    if verbose { "distill=debug" } else { "distill=info" }
}
