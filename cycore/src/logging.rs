//! Tracing setup for the launcher binary.

use std::path::Path;

use cycore_shared::errors::{CycoreError, CycoreResult};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const LOG_FILE_PREFIX: &str = "cycore-qemu.log";

/// Install the global subscriber.
///
/// Filter comes from `RUST_LOG`, falling back to `default_level`. With
/// `log_dir`, events also go to a daily-rolling file; keep the returned guard
/// alive until exit or buffered lines are lost.
pub fn init_logging(default_level: &str, log_dir: Option<&Path>) -> CycoreResult<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| CycoreError::Options(format!("invalid log filter: {}", e)))?;

    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(true);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| CycoreError::Internal(format!("failed to install logger: {}", e)))?;

    Ok(guard)
}
