//! Addressable configuration keys (`section.key`) for `config get/set/list`.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use super::file::{parse_directory, parse_number, ConfigError, ConfigFile};

/// A single configuration setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    DaemonName,
    DaemonServer,
    DaemonPort,
    DaemonClientId,
    DaemonDownloadsPath,
    DaemonRsyncServer,
    DaemonMaxDownloads,
    DaemonRetryIntervalMs,
    TransferProgram,
    TransferRemoteShell,
    LoggingLevel,
    LoggingDirectory,
}

const ALL_KEYS: [ConfigKey; 12] = [
    ConfigKey::DaemonName,
    ConfigKey::DaemonServer,
    ConfigKey::DaemonPort,
    ConfigKey::DaemonClientId,
    ConfigKey::DaemonDownloadsPath,
    ConfigKey::DaemonRsyncServer,
    ConfigKey::DaemonMaxDownloads,
    ConfigKey::DaemonRetryIntervalMs,
    ConfigKey::TransferProgram,
    ConfigKey::TransferRemoteShell,
    ConfigKey::LoggingLevel,
    ConfigKey::LoggingDirectory,
];

impl ConfigKey {
    /// Every key, in file order.
    pub fn all() -> &'static [ConfigKey] {
        &ALL_KEYS
    }

    /// Full `section.key` name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::DaemonName => "daemon.name",
            Self::DaemonServer => "daemon.server",
            Self::DaemonPort => "daemon.port",
            Self::DaemonClientId => "daemon.client_id",
            Self::DaemonDownloadsPath => "daemon.downloads_path",
            Self::DaemonRsyncServer => "daemon.rsync_server",
            Self::DaemonMaxDownloads => "daemon.max_downloads",
            Self::DaemonRetryIntervalMs => "daemon.retry_interval_ms",
            Self::TransferProgram => "transfer.program",
            Self::TransferRemoteShell => "transfer.remote_shell",
            Self::LoggingLevel => "logging.level",
            Self::LoggingDirectory => "logging.directory",
        }
    }

    /// Whether a run refuses to start while this key is unset.
    pub fn is_required(&self) -> bool {
        matches!(
            self,
            Self::DaemonServer | Self::DaemonPort | Self::DaemonRsyncServer
        )
    }

    pub fn section(&self) -> &'static str {
        self.split().0
    }

    pub fn key_name(&self) -> &'static str {
        self.split().1
    }

    fn split(&self) -> (&'static str, &'static str) {
        let name = self.name();
        name.split_once('.').unwrap_or((name, ""))
    }

    /// Current value rendered as text. Unset strings render empty.
    pub fn get(&self, config: &ConfigFile) -> String {
        let daemon = &config.daemon;
        match self {
            Self::DaemonName => daemon.name.clone(),
            Self::DaemonServer => daemon.server.clone(),
            Self::DaemonPort if daemon.port == 0 => String::new(),
            Self::DaemonPort => daemon.port.to_string(),
            Self::DaemonClientId => daemon.client_id.clone(),
            Self::DaemonDownloadsPath => daemon.downloads_path.display().to_string(),
            Self::DaemonRsyncServer => daemon.rsync_server.clone(),
            Self::DaemonMaxDownloads => daemon.max_downloads.to_string(),
            Self::DaemonRetryIntervalMs => daemon.retry_interval.as_millis().to_string(),
            Self::TransferProgram => config.transfer.program.display().to_string(),
            Self::TransferRemoteShell => config.transfer.remote_shell.clone(),
            Self::LoggingLevel => config.logging.level.clone(),
            Self::LoggingDirectory => config.logging.directory.display().to_string(),
        }
    }

    /// Parse `value` and store it.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        let daemon = &mut config.daemon;
        match self {
            Self::DaemonName => daemon.name = value.trim().to_string(),
            Self::DaemonServer => daemon.server = value.trim().to_string(),
            Self::DaemonPort => daemon.port = parse_number(self.name(), value)?,
            Self::DaemonClientId => daemon.client_id = value.trim().to_string(),
            Self::DaemonDownloadsPath => daemon.downloads_path = parse_directory(value),
            Self::DaemonRsyncServer => daemon.rsync_server = value.trim().to_string(),
            Self::DaemonMaxDownloads => {
                daemon.max_downloads = parse_number::<usize>(self.name(), value)?.max(1)
            }
            Self::DaemonRetryIntervalMs => {
                daemon.retry_interval = Duration::from_millis(parse_number(self.name(), value)?)
            }
            Self::TransferProgram => config.transfer.program = PathBuf::from(value.trim()),
            Self::TransferRemoteShell => config.transfer.remote_shell = value.trim().to_string(),
            Self::LoggingLevel => config.logging.level = value.trim().to_string(),
            Self::LoggingDirectory => config.logging.directory = parse_directory(value),
        }
        Ok(())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ALL_KEYS
            .iter()
            .copied()
            .find(|key| key.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}
