//! User configuration.
//!
//! Settings live in `config.ini` under the user configuration directory.
//! Values given on the command line take precedence over the file, and the
//! file over built-in defaults.

mod file;
mod keys;

pub use file::{
    config_file_path, ConfigError, ConfigFile, DaemonSettings, LoggingSettings, TransferSettings,
    DEFAULT_DAEMON_NAME, DEFAULT_LOG_LEVEL,
};
pub use keys::ConfigKey;
