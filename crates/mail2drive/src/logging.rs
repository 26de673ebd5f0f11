//! Process-wide logging setup.
//!
//! Log lines (timestamp, level, message) go to stdout and to a log file.
//! `log` records emitted by dependencies and the mail adapter are bridged into
//! the same subscriber.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Failed to install tracing subscriber: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("Failed to bridge log records: {0}")]
    LogBridge(#[from] log::SetLoggerError),

    #[error("Cannot open log file '{path}': {reason}")]
    File { path: PathBuf, reason: String },
}

/// Installs the global subscriber. Call once, before anything logs.
///
/// If the log file cannot be opened, logging continues on stdout only and a
/// warning is emitted.
pub fn init(log_file: &Path) -> Result<(), LoggingError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stdout);

    let (file_layer, file_error) = match file_appender(log_file) {
        Ok(appender) => (
            Some(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(appender),
            ),
            None,
        ),
        Err(e) => (None, Some(e)),
    };

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer);

    tracing::subscriber::set_global_default(subscriber)?;
    tracing_log::LogTracer::init()?;

    if let Some(e) = file_error {
        tracing::warn!("{}; logging to stdout only", e);
    }

    Ok(())
}

/// Opens (creating parent directories as needed) a non-rotating appender.
fn file_appender(path: &Path) -> Result<RollingFileAppender, LoggingError> {
    let file_error = |reason: String| LoggingError::File {
        path: path.to_path_buf(),
        reason,
    };

    let (dir, name) =
        split_log_path(path).ok_or_else(|| file_error("path has no file name".to_string()))?;

    std::fs::create_dir_all(&dir).map_err(|e| file_error(e.to_string()))?;

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(name.to_string_lossy().into_owned())
        .build(&dir)
        .map_err(|e| file_error(e.to_string()))
}

/// Splits a log path into its directory (`.` when bare) and file name.
fn split_log_path(path: &Path) -> Option<(PathBuf, OsString)> {
    let name = path.file_name()?.to_os_string();
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Some((dir, name))
}
