//! Logging setup.

use anyhow::Result;
use std::path::Path;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "info,sunroof=debug";

/// File name prefix for the daily-rolling log.
pub const LOG_FILE_PREFIX: &str = "sunroof.log";

/// Creates the daily-rolling file writer under `logs_dir`.
///
/// The returned guard flushes buffered lines when dropped and must be kept
/// alive for as long as logging should reach the file.
pub fn create_file_writer(logs_dir: &Path) -> Result<(NonBlocking, WorkerGuard)> {
    std::fs::create_dir_all(logs_dir)?;
    let appender = tracing_appender::rolling::daily(logs_dir, LOG_FILE_PREFIX);
    Ok(tracing_appender::non_blocking(appender))
}

/// Installs the global subscriber: console output plus, when `logs_dir` is
/// given, `logs_dir/sunroof.log.YYYY-MM-DD`.
///
/// A subscriber that is already installed is left in place.
pub fn init_logging(logs_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let (file_layer, guard) = match logs_dir {
        Some(dir) => {
            let (writer, guard) = create_file_writer(dir)?;
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .try_init();

    if installed.is_err() {
        tracing::debug!("[Logging] Subscriber already installed; keeping it");
    }

    Ok(guard)
}
