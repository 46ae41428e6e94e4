//! Logging infrastructure
//!
//! File-based tracing under the local data directory, with an EnvFilter
//! override (`ADSHELL_LOG=debug`). SECURITY: operation code never logs
//! payloads; the executor redacts the session password before errors
//! reach any log line.

use crate::constants::{APP_DIR_NAME, LOG_FILE_NAME};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
        .join("logs")
}

/// Initialize logging to the adshell log file.
///
/// Returns a guard that must be kept alive for the duration of the
/// program to ensure all logs are flushed to disk.
pub fn init_logging() -> WorkerGuard {
    let dir = log_dir();
    let _ = std::fs::create_dir_all(&dir);

    let file_appender = tracing_appender::rolling::never(&dir, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_env("ADSHELL_LOG")
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    guard
}
