//! Common types and utilities shared across CLI commands.

use std::path::{Path, PathBuf};
use std::time::Duration;

use filewatcher::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Resolve the configuration file location: `--config` > default.
pub fn resolve_config_path(cli_path: Option<PathBuf>) -> PathBuf {
    cli_path.unwrap_or_else(config_file_path)
}

/// Load configuration from `path`, defaults if the file does not exist.
pub fn load_config(path: &Path) -> Result<ConfigFile, CliError> {
    Ok(ConfigFile::load_from(path)?)
}

/// Settings that may be overridden on the command line.
#[derive(Debug, Default, Clone, clap::Args)]
pub struct Overrides {
    /// Inventory server host
    #[arg(long)]
    pub server: Option<String>,

    /// Inventory server port
    #[arg(long)]
    pub port: Option<u16>,

    /// rsync host (user@host)
    #[arg(long)]
    pub rsync_server: Option<String>,

    /// Local downloads directory
    #[arg(long)]
    pub downloads: Option<PathBuf>,

    /// Maximum simultaneous transfers
    #[arg(long)]
    pub max_downloads: Option<usize>,

    /// Identity sent to the server
    #[arg(long)]
    pub client_id: Option<String>,

    /// Delay between connection attempts, in milliseconds
    #[arg(long)]
    pub retry_interval_ms: Option<u64>,

    /// Log level or filter (e.g. debug, filewatcher=trace)
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Overrides {
    /// Apply CLI values on top of the file configuration.
    pub fn apply(self, config: &mut ConfigFile) {
        let daemon = &mut config.daemon;
        if let Some(server) = self.server {
            daemon.server = server;
        }
        if let Some(port) = self.port {
            daemon.port = port;
        }
        if let Some(rsync_server) = self.rsync_server {
            daemon.rsync_server = rsync_server;
        }
        if let Some(downloads) = self.downloads {
            daemon.downloads_path = downloads;
        }
        if let Some(max) = self.max_downloads {
            daemon.max_downloads = max.max(1);
        }
        if let Some(client_id) = self.client_id {
            daemon.client_id = client_id;
        }
        if let Some(ms) = self.retry_interval_ms {
            daemon.retry_interval = Duration::from_millis(ms);
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_file_values() {
        let mut config = ConfigFile::default();
        config.daemon.server = "from-file".to_string();
        config.daemon.port = 1000;

        Overrides {
            server: Some("from-cli".to_string()),
            max_downloads: Some(0),
            ..Default::default()
        }
        .apply(&mut config);

        assert_eq!(config.daemon.server, "from-cli");
        assert_eq!(config.daemon.port, 1000);
        assert_eq!(config.daemon.max_downloads, 1);
    }

    #[test]
    fn test_load_missing_config_uses_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let config = load_config(&temp.path().join("config.ini")).unwrap();
        assert_eq!(config, ConfigFile::default());
    }
}
