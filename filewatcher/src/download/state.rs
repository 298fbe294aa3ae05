//! Download state machine and terminal results.

use std::fmt;
use std::path::PathBuf;

/// Lifecycle of a single transfer.
///
/// ```text
/// Pending ──► Downloading ──► Complete
///    │             │      ──► Error
///    └─────────────┴──────► Cancelled / Error / Complete
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DownloadState {
    /// Waiting for a ticket or for the tool to start work.
    Pending,
    /// The tool has echoed the filename and is moving bytes.
    Downloading,
    /// The tool exited successfully.
    Complete,
    /// The tool failed, reported an error, or could not be started.
    Error,
    /// Cancellation was observed before the tool finished.
    Cancelled,
}

impl DownloadState {
    /// Whether no further transition can occur.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error | Self::Cancelled)
    }

    /// Whether moving from `self` to `next` is allowed.
    pub fn can_transition_to(self, next: DownloadState) -> bool {
        match (self, next) {
            (from, _) if from.is_terminal() => false,
            (Self::Pending, Self::Downloading) => true,
            (_, to) => to.is_terminal(),
        }
    }
}

impl fmt::Display for DownloadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Downloading => "downloading",
            Self::Complete => "complete",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Final outcome of one transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    /// Last reported percentage (0-100), if any was seen.
    pub progress: Option<u8>,
    /// Exit code of the transfer tool, when it exited normally.
    pub exit_code: Option<i32>,
    /// Terminal state.
    pub state: DownloadState,
    /// Destination on local disk.
    pub local_path: PathBuf,
    /// Bytes reported by the tool.
    pub file_size: u64,
}

impl DownloadResult {
    /// A result for an entry that failed before any process was spawned.
    pub fn failed(local_path: PathBuf) -> Self {
        Self {
            progress: Some(0),
            exit_code: None,
            state: DownloadState::Error,
            local_path,
            file_size: 0,
        }
    }

    /// Whether the transfer completed.
    pub fn is_complete(&self) -> bool {
        self.state == DownloadState::Complete
    }
}
