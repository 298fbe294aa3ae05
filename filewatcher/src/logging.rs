//! Logging setup.
//!
//! Events go to stderr and to `filewatcher.log` in the configured log
//! directory. `RUST_LOG`, when set, overrides the configured level.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingSettings;

/// Log file name inside the log directory.
pub const LOG_FILE_NAME: &str = "filewatcher.log";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to create log directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("invalid log level '{level}': {message}")]
    InvalidLevel { level: String, message: String },

    #[error("a global subscriber is already installed: {0}")]
    AlreadyInstalled(String),
}

/// Flushes the file writer when dropped. Keep it alive for the life of the
/// process.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file: WorkerGuard,
    log_file: PathBuf,
}

impl LoggingGuard {
    pub fn log_file(&self) -> &Path {
        &self.log_file
    }
}

/// Build the level filter: `RUST_LOG` if set, else `level`.
pub fn build_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level).map_err(|e| LoggingError::InvalidLevel {
        level: level.to_string(),
        message: e.to_string(),
    })
}

/// Install the global subscriber.
pub fn init_logging(settings: &LoggingSettings) -> Result<LoggingGuard, LoggingError> {
    std::fs::create_dir_all(&settings.directory).map_err(|source| LoggingError::CreateDir {
        path: settings.directory.clone(),
        source,
    })?;

    let filter = build_filter(&settings.level)?;

    let appender = tracing_appender::rolling::never(&settings.directory, LOG_FILE_NAME);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .try_init()
        .map_err(|e| LoggingError::AlreadyInstalled(e.to_string()))?;

    Ok(LoggingGuard {
        _file: guard,
        log_file: settings.directory.join(LOG_FILE_NAME),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_rejected() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let err = build_filter("filewatcher=loud").unwrap_err();
        assert!(matches!(err, LoggingError::InvalidLevel { .. }));
    }

    #[test]
    fn test_valid_levels() {
        for level in ["info", "debug", "filewatcher=trace,warn"] {
            assert!(build_filter(level).is_ok(), "{}", level);
        }
    }
}
