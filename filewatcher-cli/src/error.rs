//! CLI error type.

use std::fmt;

use filewatcher::app::AppError;
use filewatcher::config::ConfigError;
use filewatcher::logging::LoggingError;

/// Errors reported by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Bad or incomplete configuration.
    Config(String),

    /// The application could not start.
    App(AppError),

    /// Logging could not be initialised.
    Logging(LoggingError),

    /// Failed to create the Tokio runtime or install the signal handler.
    Runtime(String),

    /// The sync ran but not every file completed.
    SyncIncomplete { failed: usize, cancelled: usize },
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::App(e) => write!(f, "{}", e),
            CliError::Logging(e) => write!(f, "Failed to initialise logging: {}", e),
            CliError::Runtime(msg) => write!(f, "Runtime error: {}", msg),
            CliError::SyncIncomplete { failed, cancelled } => write!(
                f,
                "Sync incomplete: {} failed, {} cancelled",
                failed, cancelled
            ),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::App(e) => Some(e),
            CliError::Logging(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<AppError> for CliError {
    fn from(e: AppError) -> Self {
        CliError::App(e)
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e)
    }
}
