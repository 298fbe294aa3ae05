//! Session lifecycle with the filewatched inventory server.
//!
//! ```text
//! ┌──────────── ConnectionSupervisor::run ─────────────┐
//! │                                                    │
//! │  cancelled? ──► yes ──► Cancelled                  │
//! │      │ no                                          │
//! │  connect ──► refused / fault ──► log, sleep ──┐    │
//! │      │                                        │    │
//! │  identify + read manifest ──► fault ──────────┘    │
//! │      │                                             │
//! │  close socket, schedule, join ──► Synced           │
//! └────────────────────────────────────────────────────┘
//! ```

mod supervisor;

pub use supervisor::{
    ConnectionSupervisor, SupervisorConfig, SupervisorOutcome, DEFAULT_RETRY_INTERVAL,
};
