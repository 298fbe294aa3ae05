//! Application bootstrap implementation.

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::error::AppError;
use crate::config::ConfigFile;
use crate::connection::{ConnectionSupervisor, SupervisorOutcome};
use crate::download::DownloadScheduler;
use crate::path::create_directory;

/// A configured file-sync client.
#[derive(Debug)]
pub struct FileWatcherApp {
    config: ConfigFile,
    supervisor: ConnectionSupervisor,
}

impl FileWatcherApp {
    /// Validate `config`, prepare the downloads root and wire the components.
    ///
    /// Fails without connecting anywhere if the configuration is incomplete
    /// or the downloads root cannot be created.
    pub async fn start(config: ConfigFile) -> Result<Self, AppError> {
        config.validate()?;

        let daemon = &config.daemon;
        info!(
            name = %daemon.name,
            version = crate::VERSION,
            server = %daemon.server,
            port = daemon.port,
            rsync_server = %daemon.rsync_server,
            "Starting daemon"
        );

        if let Err(e) = create_directory(&daemon.downloads_path).await {
            error!(
                path = %daemon.downloads_path.display(),
                error = %e,
                "Cannot create downloads directory"
            );
            return Err(AppError::Destination(e));
        }
        info!(path = %daemon.downloads_path.display(), "Downloads directory ready");

        let scheduler = DownloadScheduler::new(
            daemon.downloads_path.clone(),
            config.transfer_tool(),
            daemon.max_downloads,
        );
        let supervisor = ConnectionSupervisor::new(config.supervisor_config(), scheduler);

        Ok(Self { config, supervisor })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn supervisor(&self) -> &ConnectionSupervisor {
        &self.supervisor
    }

    /// Run one sync cycle until it finishes or `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) -> SupervisorOutcome {
        let outcome = self.supervisor.run(cancel).await;
        match &outcome {
            SupervisorOutcome::Synced { report, attempts } => {
                info!(name = %self.config.daemon.name, attempts, %report, "Daemon finished");
            }
            SupervisorOutcome::Cancelled { attempts } => {
                info!(name = %self.config.daemon.name, attempts, "Daemon stopped");
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(downloads: std::path::PathBuf) -> ConfigFile {
        let mut config = ConfigFile::default();
        config.daemon.server = "127.0.0.1".to_string();
        config.daemon.port = 4040;
        config.daemon.rsync_server = "sync@files.lan".to_string();
        config.daemon.downloads_path = downloads;
        config
    }

    #[tokio::test]
    async fn test_start_creates_downloads_root() {
        let temp = tempfile::tempdir().unwrap();
        let downloads = temp.path().join("a").join("b");

        let app = FileWatcherApp::start(config(downloads.clone())).await.unwrap();

        assert!(downloads.is_dir());
        assert_eq!(app.supervisor().scheduler().destination_root(), downloads);
        assert_eq!(app.supervisor().config().port, 4040);
    }

    #[tokio::test]
    async fn test_start_fails_when_root_is_a_file() {
        let temp = tempfile::tempdir().unwrap();
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();

        let err = FileWatcherApp::start(config(blocker.join("dl")))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Destination(_)));
    }

    #[tokio::test]
    async fn test_start_rejects_incomplete_config() {
        let err = FileWatcherApp::start(ConfigFile::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
