//! INI configuration file.
//!
//! ```ini
//! [daemon]
//! name = filewatcher
//! server = files.lan
//! port = 4040
//! client_id = filewatcher
//! downloads_path = /home/me/Downloads/filewatcher
//! rsync_server = sync@files.lan
//! max_downloads = 2
//! retry_interval_ms = 1000
//!
//! [transfer]
//! program = rsync
//! remote_shell = ssh
//!
//! [logging]
//! level = info
//! directory = /home/me/.local/share/filewatcher/logs
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use crate::connection::{SupervisorConfig, DEFAULT_RETRY_INTERVAL};
use crate::download::{
    TransferTool, DEFAULT_MAX_CONCURRENT, DEFAULT_PROGRAM, DEFAULT_REMOTE_SHELL,
};
use crate::path::remove_trailing_slash;
use crate::protocol::DEFAULT_CLIENT_ID;

/// Default daemon name written to logs at startup.
pub const DEFAULT_DAEMON_NAME: &str = "filewatcher";

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Errors loading, validating or saving the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("{0} is required")]
    MissingValue(&'static str),

    #[error("unknown configuration key '{0}'")]
    UnknownKey(String),
}

/// Path of the configuration file: `<config dir>/filewatcher/config.ini`.
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.ini")
}

fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("filewatcher")
}

fn default_downloads_path() -> PathBuf {
    dirs::download_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("filewatcher")
}

fn default_log_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("filewatcher")
        .join("logs")
}

/// `[daemon]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonSettings {
    pub name: String,
    pub server: String,
    pub port: u16,
    pub client_id: String,
    pub downloads_path: PathBuf,
    pub rsync_server: String,
    pub max_downloads: usize,
    pub retry_interval: Duration,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_DAEMON_NAME.to_string(),
            server: String::new(),
            port: 0,
            client_id: DEFAULT_CLIENT_ID.to_string(),
            downloads_path: default_downloads_path(),
            rsync_server: String::new(),
            max_downloads: DEFAULT_MAX_CONCURRENT,
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }
}

/// `[transfer]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSettings {
    pub program: PathBuf,
    pub remote_shell: String,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_PROGRAM),
            remote_shell: DEFAULT_REMOTE_SHELL.to_string(),
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    pub level: String,
    pub directory: PathBuf,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            directory: default_log_directory(),
        }
    }
}

/// The whole configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub daemon: DaemonSettings,
    pub transfer: TransferSettings,
    pub logging: LoggingSettings,
}

impl ConfigFile {
    /// Load from [`config_file_path`].
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let ini = Ini::load_from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    /// Build from a parsed INI document, filling gaps with defaults.
    pub fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(section) = ini.section(Some("daemon")) {
            let daemon = &mut config.daemon;
            if let Some(v) = section.get("name") {
                daemon.name = v.trim().to_string();
            }
            if let Some(v) = section.get("server") {
                daemon.server = v.trim().to_string();
            }
            if let Some(v) = section.get("port") {
                daemon.port = parse_number("daemon.port", v)?;
            }
            if let Some(v) = section.get("client_id") {
                daemon.client_id = v.trim().to_string();
            }
            if let Some(v) = section.get("downloads_path") {
                daemon.downloads_path = parse_directory(v);
            }
            if let Some(v) = section.get("rsync_server") {
                daemon.rsync_server = v.trim().to_string();
            }
            if let Some(v) = section.get("max_downloads") {
                daemon.max_downloads = parse_number::<usize>("daemon.max_downloads", v)?.max(1);
            }
            if let Some(v) = section.get("retry_interval_ms") {
                daemon.retry_interval =
                    Duration::from_millis(parse_number("daemon.retry_interval_ms", v)?);
            }
        }

        if let Some(section) = ini.section(Some("transfer")) {
            if let Some(v) = section.get("program") {
                config.transfer.program = PathBuf::from(v.trim());
            }
            if let Some(v) = section.get("remote_shell") {
                config.transfer.remote_shell = v.trim().to_string();
            }
        }

        if let Some(section) = ini.section(Some("logging")) {
            if let Some(v) = section.get("level") {
                config.logging.level = v.trim().to_string();
            }
            if let Some(v) = section.get("directory") {
                config.logging.directory = parse_directory(v);
            }
        }

        Ok(config)
    }

    /// Render as an INI document.
    pub fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        let daemon = &self.daemon;
        ini.with_section(Some("daemon"))
            .set("name", daemon.name.as_str())
            .set("server", daemon.server.as_str())
            .set("port", daemon.port.to_string())
            .set("client_id", daemon.client_id.as_str())
            .set("downloads_path", daemon.downloads_path.display().to_string())
            .set("rsync_server", daemon.rsync_server.as_str())
            .set("max_downloads", daemon.max_downloads.to_string())
            .set(
                "retry_interval_ms",
                daemon.retry_interval.as_millis().to_string(),
            );
        ini.with_section(Some("transfer"))
            .set("program", self.transfer.program.display().to_string())
            .set("remote_shell", self.transfer.remote_shell.as_str());
        ini.with_section(Some("logging"))
            .set("level", self.logging.level.as_str())
            .set("directory", self.logging.directory.display().to_string());
        ini
    }

    /// Save to [`config_file_path`].
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Save to `path`, creating its directory.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        self.to_ini().write_to_file(path).map_err(write_err)
    }

    /// Check that everything needed to run a sync is present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.daemon.server.is_empty() {
            return Err(ConfigError::MissingValue("daemon.server"));
        }
        if self.daemon.port == 0 {
            return Err(ConfigError::MissingValue("daemon.port"));
        }
        if self.daemon.rsync_server.is_empty() {
            return Err(ConfigError::MissingValue("daemon.rsync_server"));
        }
        Ok(())
    }

    /// Connection settings for the supervisor.
    pub fn supervisor_config(&self) -> SupervisorConfig {
        SupervisorConfig::new(self.daemon.server.clone(), self.daemon.port)
            .with_client_id(self.daemon.client_id.clone())
            .with_retry_interval(self.daemon.retry_interval)
    }

    /// The transfer tool for the configured rsync host.
    pub fn transfer_tool(&self) -> TransferTool {
        TransferTool::rsync(self.daemon.rsync_server.clone())
            .with_program(self.transfer.program.clone())
            .with_remote_shell(self.transfer.remote_shell.clone())
    }
}

pub(crate) fn parse_number<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: e.to_string(),
        })
}

pub(crate) fn parse_directory(value: &str) -> PathBuf {
    PathBuf::from(remove_trailing_slash(value.trim()))
}
