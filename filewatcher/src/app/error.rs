//! Application error types.

use std::fmt;

use crate::config::ConfigError;
use crate::path::PathError;

/// Errors that prevent a sync from starting.
#[derive(Debug)]
pub enum AppError {
    /// The configuration is incomplete or invalid.
    Config(ConfigError),

    /// The downloads root could not be created.
    Destination(PathError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(e) => write!(f, "Configuration error: {}", e),
            AppError::Destination(e) => {
                write!(f, "Failed to prepare downloads directory: {}", e)
            }
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(e) => Some(e),
            AppError::Destination(e) => Some(e),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::Config(e)
    }
}

impl From<PathError> for AppError {
    fn from(e: PathError) -> Self {
        AppError::Destination(e)
    }
}
