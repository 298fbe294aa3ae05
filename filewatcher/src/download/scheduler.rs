//! Bounded-concurrency download scheduling.
//!
//! The scheduler turns manifest entries into [`TransferWorker`]s, one per
//! entry, each spawned immediately and admitted through a shared
//! [`AdmissionPool`]. Scheduling returns a [`PendingDownload`] per entry;
//! [`join_all`] waits for all of them. A failed entry never cancels its
//! siblings.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::admission::AdmissionPool;
use super::command::TransferTool;
use super::state::{DownloadResult, DownloadState};
use super::worker::TransferWorker;
use crate::path::create_parent_directories;
use crate::protocol::ManifestEntry;

/// Schedules transfers for manifest entries.
#[derive(Debug, Clone)]
pub struct DownloadScheduler {
    destination_root: PathBuf,
    tool: Arc<TransferTool>,
    pool: AdmissionPool,
}

impl DownloadScheduler {
    /// Create a scheduler writing below `destination_root`, running at most
    /// `max_concurrent` transfers at once.
    pub fn new(
        destination_root: impl Into<PathBuf>,
        tool: TransferTool,
        max_concurrent: usize,
    ) -> Self {
        Self {
            destination_root: destination_root.into(),
            tool: Arc::new(tool),
            pool: AdmissionPool::new(max_concurrent),
        }
    }

    pub fn destination_root(&self) -> &Path {
        &self.destination_root
    }

    /// The admission pool shared by every worker of this scheduler.
    pub fn pool(&self) -> &AdmissionPool {
        &self.pool
    }

    /// Start one transfer per entry.
    ///
    /// Parent directories are created before each worker is spawned. An entry
    /// whose directory cannot be created is logged and resolves to an
    /// [`DownloadState::Error`] result without spawning anything.
    pub async fn schedule(
        &self,
        entries: Vec<ManifestEntry>,
        cancel: &CancellationToken,
    ) -> Vec<PendingDownload> {
        info!(
            files = entries.len(),
            max_concurrent = self.pool.capacity(),
            destination = %self.destination_root.display(),
            "Scheduling downloads"
        );

        let mut pending = Vec::with_capacity(entries.len());

        for entry in entries {
            let local_path = entry.local_path(&self.destination_root);

            if let Err(e) = create_parent_directories(&local_path).await {
                error!(remote = %entry, error = %e, "Skipping download");
                pending.push(PendingDownload::resolved(DownloadResult::failed(local_path)));
                continue;
            }

            debug!(remote = %entry, local = %local_path.display(), "Queued download");
            let worker = TransferWorker::new(entry, local_path.clone(), Arc::clone(&self.tool));
            let handle = tokio::spawn(worker.run(self.pool.clone(), cancel.clone()));
            pending.push(PendingDownload::running(local_path, handle));
        }

        pending
    }
}

/// A download that has been scheduled but may not have finished.
#[derive(Debug)]
pub struct PendingDownload {
    local_path: PathBuf,
    inner: PendingInner,
}

#[derive(Debug)]
enum PendingInner {
    Running(JoinHandle<DownloadResult>),
    Resolved(DownloadResult),
}

impl PendingDownload {
    fn running(local_path: PathBuf, handle: JoinHandle<DownloadResult>) -> Self {
        Self {
            local_path,
            inner: PendingInner::Running(handle),
        }
    }

    fn resolved(result: DownloadResult) -> Self {
        Self {
            local_path: result.local_path.clone(),
            inner: PendingInner::Resolved(result),
        }
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// Wait for the terminal result.
    ///
    /// A worker task that panicked resolves to an error result; one aborted
    /// by runtime shutdown resolves to a cancelled result.
    pub async fn join(self) -> DownloadResult {
        match self.inner {
            PendingInner::Resolved(result) => result,
            PendingInner::Running(handle) => match handle.await {
                Ok(result) => result,
                Err(e) if e.is_cancelled() => {
                    warn!(local = %self.local_path.display(), "Download task aborted");
                    DownloadResult {
                        state: DownloadState::Cancelled,
                        progress: None,
                        ..DownloadResult::failed(self.local_path)
                    }
                }
                Err(e) => {
                    error!(
                        local = %self.local_path.display(),
                        error = %e,
                        "Download task panicked"
                    );
                    DownloadResult::failed(self.local_path)
                }
            },
        }
    }
}

/// Wait for every pending download, keeping schedule order.
pub async fn join_all(pending: Vec<PendingDownload>) -> Vec<DownloadResult> {
    futures::future::join_all(pending.into_iter().map(PendingDownload::join)).await
}
