//! rsync-driven download orchestration.
//!
//! This module pulls manifest entries to local disk, including:
//! - Admission control bounding concurrent transfers (`admission`)
//! - Transfer tool invocation (`command`)
//! - Output line splitting (`lines`) and parsing (`parser`)
//! - Per-transfer state and results (`state`)
//! - One worker per transfer (`worker`)
//! - Scheduling and joining (`scheduler`, `report`)
//!
//! # Architecture
//!
//! ```text
//! DownloadScheduler
//!         │
//!         ├── AdmissionPool (K tickets)
//!         │
//!         └── TransferWorker × N
//!                 ├── TransferTool (rsync process)
//!                 ├── LineReader × 2 (stdout, stderr)
//!                 └── TransferTracker (state machine)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use filewatcher::download::{join_all, DownloadScheduler, TransferTool};
//! use tokio_util::sync::CancellationToken;
//!
//! let scheduler = DownloadScheduler::new("/home/x/dl", TransferTool::rsync("sync@files"), 2);
//! let pending = scheduler.schedule(manifest.entries, &CancellationToken::new()).await;
//! let results = join_all(pending).await;
//! ```

mod admission;
mod command;
mod lines;
mod parser;
mod report;
mod scheduler;
mod state;
mod worker;

pub use admission::{AdmissionPool, AdmissionTicket, DEFAULT_MAX_CONCURRENT};
pub use command::{TransferTool, DEFAULT_PROGRAM, DEFAULT_REMOTE_SHELL};
pub use lines::{LineReader, MAX_LINE_LEN};
pub use parser::{parse_line, OutputEvent, OutputStream, TransferTracker};
pub use report::SyncReport;
pub use scheduler::{join_all, DownloadScheduler, PendingDownload};
pub use state::{DownloadResult, DownloadState};
pub use worker::TransferWorker;
