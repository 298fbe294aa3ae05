//! A single rsync transfer.
//!
//! A [`TransferWorker`] waits for an admission ticket, runs the transfer tool
//! for one manifest entry, feeds both of its output streams through a
//! [`TransferTracker`] and resolves to exactly one [`DownloadResult`].
//!
//! ```text
//! acquire ticket ──► spawn ──► read stdout/stderr + wait ──► drain ──► result
//!      │               │              │
//!      │               │              └── cancelled: kill, reap ──► Cancelled
//!      │               └── spawn failed ─────────────────────────► Error
//!      └── cancelled while queued ───────────────────────────────► Cancelled
//! ```
//!
//! The process is reaped as soon as it exits. Output still buffered in the
//! pipes is read for a short while afterwards, but a descendant that keeps
//! the pipes open (an ssh control master, say) does not hold the result.
//!
//! The ticket is a local binding of [`TransferWorker::run`], so it is
//! released when the function returns on any of these paths.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::process::Child;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::admission::AdmissionPool;
use super::command::TransferTool;
use super::lines::LineReader;
use super::parser::{OutputEvent, OutputStream, TransferTracker};
use super::state::DownloadResult;
use crate::protocol::ManifestEntry;

/// How long output is still read after the transfer process exits.
const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_millis(250);

/// Drives one external transfer to a terminal result.
#[derive(Debug)]
pub struct TransferWorker {
    entry: ManifestEntry,
    local_path: PathBuf,
    tool: Arc<TransferTool>,
}

impl TransferWorker {
    pub fn new(entry: ManifestEntry, local_path: PathBuf, tool: Arc<TransferTool>) -> Self {
        Self {
            entry,
            local_path,
            tool,
        }
    }

    pub fn remote_path(&self) -> &Path {
        &self.entry.absolute
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// Run the transfer to completion, failure or cancellation.
    pub async fn run(self, pool: AdmissionPool, cancel: CancellationToken) -> DownloadResult {
        let mut tracker = TransferTracker::new(self.entry.file_name());

        let _ticket = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(remote = %self.entry, "Cancelled while waiting for a transfer slot");
                tracker.cancelled();
                return self.result(&tracker, None);
            }
            ticket = pool.acquire() => match ticket {
                Some(ticket) => ticket,
                None => {
                    error!(remote = %self.entry, "Admission pool closed");
                    tracker.spawn_failed();
                    return self.result(&tracker, None);
                }
            },
        };

        let mut cmd = self.tool.command(&self.entry.absolute, &self.local_path);
        debug!(
            program = %self.tool.program.display(),
            args = ?self.tool.args(&self.entry.absolute, &self.local_path),
            "Spawning transfer"
        );

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                error!(
                    remote = %self.entry,
                    program = %self.tool.program.display(),
                    error = %e,
                    "Failed to start transfer"
                );
                tracker.spawn_failed();
                return self.result(&tracker, None);
            }
        };

        let (stdout, stderr) = match (child.stdout.take(), child.stderr.take()) {
            (Some(stdout), Some(stderr)) => (stdout, stderr),
            _ => {
                error!(remote = %self.entry, "Transfer output streams unavailable");
                terminate(&mut child).await;
                tracker.spawn_failed();
                return self.result(&tracker, None);
            }
        };

        let mut out_lines = LineReader::new(stdout);
        let mut err_lines = LineReader::new(stderr);
        let mut out_open = true;
        let mut err_open = true;
        // Set once the process has been reaped. Descendants may still hold
        // the pipes open, so output is only drained until `drain_deadline`.
        let mut exited: Option<Option<i32>> = None;
        let mut drain_deadline = Instant::now();

        let exit_code = loop {
            if let Some(code) = exited {
                if !out_open && !err_open {
                    break code;
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled(), if exited.is_none() => {
                    terminate(&mut child).await;
                    tracker.cancelled();
                    info!(remote = %self.entry, "Transfer cancelled");
                    return self.result(&tracker, None);
                }
                line = out_lines.next_line(), if out_open => match line {
                    Ok(Some(line)) => self.observe(&mut tracker, OutputStream::Stdout, &line),
                    Ok(None) => out_open = false,
                    Err(e) => {
                        debug!(remote = %self.entry, error = %e, "Transfer stdout closed");
                        out_open = false;
                    }
                },
                line = err_lines.next_line(), if err_open => match line {
                    Ok(Some(line)) => self.observe(&mut tracker, OutputStream::Stderr, &line),
                    Ok(None) => err_open = false,
                    Err(e) => {
                        debug!(remote = %self.entry, error = %e, "Transfer stderr closed");
                        err_open = false;
                    }
                },
                status = child.wait(), if exited.is_none() => {
                    let code = match status {
                        Ok(status) => status.code(),
                        Err(e) => {
                            warn!(
                                remote = %self.entry,
                                error = %e,
                                "Failed to collect transfer exit status"
                            );
                            None
                        }
                    };
                    exited = Some(code);
                    drain_deadline = Instant::now() + OUTPUT_DRAIN_TIMEOUT;
                }
                _ = tokio::time::sleep_until(drain_deadline), if exited.is_some() => {
                    debug!(
                        remote = %self.entry,
                        "Transfer output still open after exit, likely held by a child process"
                    );
                    break exited.flatten();
                }
            }
        };

        tracker.exited(exit_code);
        let result = self.result(&tracker, exit_code);

        if result.is_complete() {
            info!(
                remote = %self.entry,
                local = %self.local_path.display(),
                bytes = result.file_size,
                "Download complete"
            );
        } else {
            warn!(
                remote = %self.entry,
                state = %result.state,
                exit_code = ?exit_code,
                "Download failed"
            );
        }

        result
    }

    fn observe(&self, tracker: &mut TransferTracker, stream: OutputStream, line: &str) {
        if stream == OutputStream::Stderr && !line.trim().is_empty() {
            debug!(remote = %self.entry, "rsync stderr: {}", line);
        }

        match tracker.apply(stream, line) {
            OutputEvent::Started => {
                info!(remote = %self.entry, local = %self.local_path.display(), "Download started");
            }
            OutputEvent::Progress { bytes, percent } => {
                trace!(remote = %self.entry, bytes, percent, "Download progress");
            }
            OutputEvent::Transferred { sent, received } => {
                debug!(remote = %self.entry, sent, received, "Transfer totals");
            }
            OutputEvent::TotalSize(size) => {
                debug!(remote = %self.entry, size, "Total size reported");
            }
            OutputEvent::FileFailed => {
                error!(remote = %self.entry, "rsync reported the file as failed");
            }
            OutputEvent::ConnectionClosed { bytes_received } => {
                warn!(
                    remote = %self.entry,
                    bytes_received,
                    "Connection closed before the transfer finished"
                );
            }
            OutputEvent::BrokenPipe { address, port } => {
                warn!(
                    remote = %self.entry,
                    address = %address,
                    port,
                    "SSH connection lost (retryable)"
                );
            }
            OutputEvent::Ignored => {}
        }
    }

    fn result(&self, tracker: &TransferTracker, exit_code: Option<i32>) -> DownloadResult {
        DownloadResult {
            progress: tracker.progress(),
            exit_code,
            state: tracker.state(),
            local_path: self.local_path.clone(),
            file_size: tracker.file_size(),
        }
    }
}

/// Kill the child and reap it.
///
/// Killing a process that already exited is not an error.
async fn terminate(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        debug!(error = %e, "Transfer process already exited");
    }
    if let Err(e) = child.wait().await {
        debug!(error = %e, "Failed to reap transfer process");
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::download::DownloadState;
    use crate::path::FilePath;
    use std::time::{Duration, Instant};

    /// A `/bin/sh` script standing in for rsync. The rsync arguments follow
    /// the script path and are ignored.
    fn fake_tool(dir: &Path, name: &str, body: &str) -> Arc<TransferTool> {
        let script = dir.join(name);
        std::fs::write(&script, format!("{}\n", body)).unwrap();
        Arc::new(
            TransferTool::rsync("sync@files.lan")
                .with_program("/bin/sh")
                .with_program_args([script.display().to_string()]),
        )
    }

    fn worker(tool: Arc<TransferTool>, dir: &Path) -> TransferWorker {
        let entry = FilePath::new("/srv/data/b.txt", "/srv/data");
        let local = entry.local_path(dir);
        TransferWorker::new(entry, local, tool)
    }

    #[tokio::test]
    async fn test_successful_transfer() {
        let temp = tempfile::tempdir().unwrap();
        let tool = fake_tool(
            temp.path(),
            "ok.sh",
            "echo b.txt\nprintf '  6000  50%%  1.2MB/s  0:00:01\\r 12000 100%%  1.2MB/s  0:00:02\\n'\n\
             echo 'total size is 12000  speedup is 1.00'\nexit 0",
        );

        let result = worker(tool, temp.path())
            .run(AdmissionPool::new(1), CancellationToken::new())
            .await;

        assert_eq!(result.state, DownloadState::Complete);
        assert_eq!(result.progress, Some(100));
        assert_eq!(result.exit_code, Some(0));
        assert_eq!(result.file_size, 12000);
        assert_eq!(result.local_path, temp.path().join("b.txt"));
    }

    #[tokio::test]
    async fn test_clean_exit_without_output() {
        let temp = tempfile::tempdir().unwrap();
        let tool = fake_tool(temp.path(), "silent.sh", "exit 0");

        let result = worker(tool, temp.path())
            .run(AdmissionPool::new(1), CancellationToken::new())
            .await;

        assert_eq!(result.state, DownloadState::Complete);
        assert_eq!(result.progress, Some(100));
    }

    #[tokio::test]
    async fn test_nonzero_exit_reports_bytes_received() {
        let temp = tempfile::tempdir().unwrap();
        let tool = fake_tool(
            temp.path(),
            "closed.sh",
            "echo b.txt\n\
             echo 'rsync: connection unexpectedly closed (812 bytes received so far) [receiver]' >&2\n\
             exit 12",
        );

        let result = worker(tool, temp.path())
            .run(AdmissionPool::new(1), CancellationToken::new())
            .await;

        assert_eq!(result.state, DownloadState::Error);
        assert_eq!(result.exit_code, Some(12));
        assert_eq!(result.file_size, 812);
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let temp = tempfile::tempdir().unwrap();
        let tool = Arc::new(
            TransferTool::rsync("h").with_program(temp.path().join("does-not-exist")),
        );
        let pool = AdmissionPool::new(1);

        let result = worker(tool, temp.path())
            .run(pool.clone(), CancellationToken::new())
            .await;

        assert_eq!(result.state, DownloadState::Error);
        assert_eq!(result.progress, Some(0));
        assert_eq!(result.exit_code, None);
        assert_eq!(pool.available(), 1);
    }

    #[tokio::test]
    async fn test_cancel_while_downloading() {
        let temp = tempfile::tempdir().unwrap();
        let tool = fake_tool(temp.path(), "slow.sh", "echo b.txt\nexec sleep 30");
        let pool = AdmissionPool::new(1);
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(worker(tool, temp.path()).run(pool.clone(), cancel.clone()));
        tokio::time::sleep(Duration::from_millis(200)).await;

        let started = Instant::now();
        cancel.cancel();
        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(result.state, DownloadState::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(pool.available(), 1);
    }

    #[tokio::test]
    async fn test_exit_resolves_while_background_child_holds_output() {
        let temp = tempfile::tempdir().unwrap();
        let tool = fake_tool(temp.path(), "forks.sh", "echo b.txt\nsleep 5 &\nexit 0");
        let pool = AdmissionPool::new(1);
        let started = Instant::now();

        let result = tokio::time::timeout(
            Duration::from_secs(4),
            worker(tool, temp.path()).run(pool.clone(), CancellationToken::new()),
        )
        .await
        .unwrap();

        assert_eq!(result.state, DownloadState::Complete);
        assert_eq!(result.exit_code, Some(0));
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(pool.in_flight(), 0);
        assert_eq!(pool.available(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_ticket_admits_queued_worker() {
        let temp = tempfile::tempdir().unwrap();
        let slow = fake_tool(temp.path(), "slow.sh", "echo b.txt\nexec sleep 30");
        let quick = fake_tool(temp.path(), "quick.sh", "echo b.txt\nexit 0");
        let pool = AdmissionPool::new(1);

        let slow_cancel = CancellationToken::new();
        let slow_handle =
            tokio::spawn(worker(slow, temp.path()).run(pool.clone(), slow_cancel.clone()));
        tokio::time::sleep(Duration::from_millis(100)).await;

        let quick_handle =
            tokio::spawn(worker(quick, temp.path()).run(pool.clone(), CancellationToken::new()));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!quick_handle.is_finished());

        slow_cancel.cancel();
        let slow_result = slow_handle.await.unwrap();
        let quick_result = tokio::time::timeout(Duration::from_secs(5), quick_handle)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(slow_result.state, DownloadState::Cancelled);
        assert_eq!(quick_result.state, DownloadState::Complete);
    }

    #[tokio::test]
    async fn test_cancel_before_admission() {
        let temp = tempfile::tempdir().unwrap();
        let tool = fake_tool(temp.path(), "ok.sh", "exit 0");
        let pool = AdmissionPool::new(1);
        let _held = pool.try_acquire().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = worker(tool, temp.path()).run(pool.clone(), cancel).await;

        assert_eq!(result.state, DownloadState::Cancelled);
        assert_eq!(result.exit_code, None);
        assert_eq!(pool.in_flight(), 1);
    }
}
