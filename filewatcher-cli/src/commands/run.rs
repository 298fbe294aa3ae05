//! Run command - one sync cycle against the inventory server.

use filewatcher::app::FileWatcherApp;
use filewatcher::connection::SupervisorOutcome;
use filewatcher::logging::init_logging;
use tokio_util::sync::CancellationToken;

use super::common::{load_config, Overrides};
use crate::error::CliError;

/// Run the sync.
pub fn run(config_path: &std::path::Path, overrides: Overrides) -> Result<(), CliError> {
    let mut config = load_config(config_path)?;
    overrides.apply(&mut config);
    config.validate()?;

    let _logging = init_logging(&config.logging)?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            tracing::info!("Interrupt received, cancelling");
            cancel.cancel();
        })
        .map_err(|e| CliError::Runtime(format!("failed to install Ctrl-C handler: {}", e)))?;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Runtime(e.to_string()))?;

    let outcome = runtime.block_on(async {
        let app = FileWatcherApp::start(config).await?;
        Ok::<_, CliError>(app.run(cancel.clone()).await)
    })?;

    finish(outcome, cancel.is_cancelled())
}

/// Report the outcome and pick the exit status.
///
/// A user interrupt is not a failure, even when it cut transfers short. Files
/// that failed on their own still fail the run.
fn finish(outcome: SupervisorOutcome, interrupted: bool) -> Result<(), CliError> {
    match outcome {
        SupervisorOutcome::Synced { report, .. } if report.is_success() => {
            println!("{}", report);
            Ok(())
        }
        SupervisorOutcome::Synced { report, .. } if interrupted && report.failed() == 0 => {
            println!("Interrupted: {}", report);
            println!("Unfinished files resume on the next run.");
            Ok(())
        }
        SupervisorOutcome::Synced { report, .. } => {
            println!("{}", report);
            Err(CliError::SyncIncomplete {
                failed: report.failed(),
                cancelled: report.cancelled(),
            })
        }
        SupervisorOutcome::Cancelled { attempts } => {
            println!("Cancelled after {} connection attempt(s)", attempts);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use filewatcher::download::{DownloadResult, DownloadState, SyncReport};

    fn report(states: &[DownloadState]) -> SyncReport {
        SyncReport::new(
            states
                .iter()
                .map(|state| DownloadResult {
                    progress: None,
                    exit_code: None,
                    state: *state,
                    local_path: PathBuf::from("/dl/x"),
                    file_size: 0,
                })
                .collect(),
        )
    }

    fn synced(states: &[DownloadState]) -> SupervisorOutcome {
        SupervisorOutcome::Synced {
            report: report(states),
            attempts: 1,
        }
    }

    #[test]
    fn test_interrupted_transfers_exit_cleanly() {
        let outcome = synced(&[DownloadState::Complete, DownloadState::Cancelled]);
        assert!(finish(outcome, true).is_ok());
    }

    #[test]
    fn test_interrupt_does_not_hide_failures() {
        let outcome = synced(&[DownloadState::Error, DownloadState::Cancelled]);
        let err = finish(outcome, true).unwrap_err();
        assert!(matches!(
            err,
            CliError::SyncIncomplete {
                failed: 1,
                cancelled: 1
            }
        ));
    }

    #[test]
    fn test_failed_files_fail_the_run() {
        let outcome = synced(&[DownloadState::Complete, DownloadState::Error]);
        assert!(matches!(
            finish(outcome, false),
            Err(CliError::SyncIncomplete { failed: 1, .. })
        ));
    }

    #[test]
    fn test_cancelled_before_manifest_is_ok() {
        assert!(finish(SupervisorOutcome::Cancelled { attempts: 3 }, true).is_ok());
    }
}
