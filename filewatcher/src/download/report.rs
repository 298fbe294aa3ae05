//! Summary of a completed sync.

use std::fmt;

use super::state::{DownloadResult, DownloadState};

/// Aggregate outcome of one sync cycle.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// Every result, in manifest order.
    pub results: Vec<DownloadResult>,
}

impl SyncReport {
    pub fn new(results: Vec<DownloadResult>) -> Self {
        Self { results }
    }

    fn count(&self, state: DownloadState) -> usize {
        self.results.iter().filter(|r| r.state == state).count()
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn completed(&self) -> usize {
        self.count(DownloadState::Complete)
    }

    pub fn failed(&self) -> usize {
        self.count(DownloadState::Error)
    }

    pub fn cancelled(&self) -> usize {
        self.count(DownloadState::Cancelled)
    }

    /// Sum of reported sizes of completed files.
    pub fn bytes_completed(&self) -> u64 {
        self.results
            .iter()
            .filter(|r| r.is_complete())
            .map(|r| r.file_size)
            .sum()
    }

    /// Whether every file completed.
    pub fn is_success(&self) -> bool {
        self.completed() == self.total()
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} files: {} complete, {} failed, {} cancelled ({} bytes)",
            self.total(),
            self.completed(),
            self.failed(),
            self.cancelled(),
            self.bytes_completed()
        )
    }
}
