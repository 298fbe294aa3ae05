//! Filewatcher - pull files announced by a filewatched server
//!
//! The client connects to an inventory server, identifies itself, receives a
//! manifest of remote files and mirrors each one into a local downloads
//! directory with rsync, a bounded number at a time.
//!
//! # Modules
//!
//! - [`app`]: bootstrap from configuration
//! - [`config`]: `config.ini` settings
//! - [`connection`]: server session and retry loop
//! - [`download`]: rsync workers and scheduling
//! - [`logging`]: tracing subscriber setup
//! - [`path`]: remote/local path model
//! - [`protocol`]: handshake and manifest framing

pub mod app;
pub mod config;
pub mod connection;
pub mod download;
pub mod logging;
pub mod path;
pub mod protocol;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
