//! Application bootstrap.
//!
//! `FileWatcherApp` turns a [`ConfigFile`](crate::config::ConfigFile) into a
//! ready supervisor in a fixed order:
//!
//! ```text
//! ┌──────────────────── FileWatcherApp::start ────────────────────┐
//! │  1. validate configuration                                    │
//! │  2. log daemon name                                           │
//! │  3. create downloads root        (fatal on failure)           │
//! │  4. TransferTool ─► DownloadScheduler ─► ConnectionSupervisor │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use filewatcher::app::FileWatcherApp;
//! use filewatcher::config::ConfigFile;
//! use tokio_util::sync::CancellationToken;
//!
//! let app = FileWatcherApp::start(ConfigFile::load()?).await?;
//! let outcome = app.run(CancellationToken::new()).await;
//! ```

mod bootstrap;
mod error;

pub use bootstrap::FileWatcherApp;
pub use error::AppError;
