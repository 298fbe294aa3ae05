//! rsync output parsing.
//!
//! rsync reports on two streams. Each line is classified independently into
//! an [`OutputEvent`], and a [`TransferTracker`] folds those events into the
//! transfer's state, progress and size. The tracker is a plain synchronous
//! reducer so it can be driven from canned lines in tests.
//!
//! Recognised lines:
//!
//! | Stream | Example                                                     | Event              |
//! |--------|-------------------------------------------------------------|--------------------|
//! | stdout | `b.txt`                                                     | `Started`          |
//! | stdout | `12345  50%  1.2MB/s  0:00:10`                              | `Progress`         |
//! | stdout | `sent 96 bytes  received 12,437 bytes  8,355.33 bytes/sec`  | `Transferred`      |
//! | stdout | `total size is 9999  speedup is 1.00`                       | `TotalSize`        |
//! | stderr | `b.txt`                                                     | `FileFailed`       |
//! | stderr | `rsync: connection unexpectedly closed (812 bytes received so far) [receiver]` | `ConnectionClosed` |
//! | stderr | `packet_write_wait: Connection to 10.0.0.2 port 22: Broken pipe` | `BrokenPipe`  |
//!
//! Anything else is [`OutputEvent::Ignored`].

use regex::Regex;
use std::sync::OnceLock;

use super::state::DownloadState;

/// Which output stream a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Classified rsync output line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputEvent {
    /// The tool echoed the filename on stdout and began work.
    Started,
    /// In-flight progress line.
    Progress { bytes: u64, percent: u8 },
    /// End-of-run `sent ... received ...` line.
    Transferred { sent: u64, received: u64 },
    /// End-of-run `total size is` line.
    TotalSize(u64),
    /// The tool echoed the filename on stderr, reporting it as failed.
    FileFailed,
    /// The remote side hung up early.
    ConnectionClosed { bytes_received: u64 },
    /// The SSH transport lost its connection.
    BrokenPipe { address: String, port: u16 },
    /// Unrecognised line.
    Ignored,
}

fn progress_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // bytes, percent, speed with unit, elapsed/eta
        Regex::new(r"^([\d,]+)\s+(\d+)%\s+([\d.,]+)([A-Za-z]*B/s)\s+([\d:]+)").unwrap()
    })
}

fn transferred_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^sent\s+([\d,]+)\s+[a-z]*bytes\s+received\s+([\d,]+)\s+[a-z]*bytes").unwrap()
    })
}

fn total_size_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^total size is ([\d,]+)").unwrap())
}

fn connection_closed_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^rsync:\s+connection unexpectedly closed\s+\(([\d,]+)\s+bytes received so far\)")
            .unwrap()
    })
}

fn broken_pipe_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^packet_write_wait:\s+Connection to ([0-9A-Za-z.:\-]+) port (\d+):\s+Broken pipe")
            .unwrap()
    })
}

/// Parse a byte count, accepting rsync's thousands separators.
fn parse_count(digits: &str) -> Option<u64> {
    digits.replace(',', "").parse().ok()
}

/// Classify one output line.
///
/// `file_name` is the final component of the remote path; rsync echoes it
/// when it starts on a file, and echoes it on stderr when the file fails.
pub fn parse_line(stream: OutputStream, line: &str, file_name: Option<&str>) -> OutputEvent {
    let line = line.trim();
    if line.is_empty() {
        return OutputEvent::Ignored;
    }

    let is_file_name = file_name.is_some_and(|name| name == line);

    match stream {
        OutputStream::Stdout => {
            if is_file_name {
                return OutputEvent::Started;
            }
            if let Some(caps) = progress_pattern().captures(line) {
                let bytes = parse_count(&caps[1]);
                let percent = caps[2].parse::<u8>().ok();
                if let (Some(bytes), Some(percent)) = (bytes, percent) {
                    return OutputEvent::Progress {
                        bytes,
                        percent: percent.min(100),
                    };
                }
            }
            if let Some(caps) = transferred_pattern().captures(line) {
                let sent = parse_count(&caps[1]);
                let received = parse_count(&caps[2]);
                if let (Some(sent), Some(received)) = (sent, received) {
                    return OutputEvent::Transferred { sent, received };
                }
            }
            if let Some(size) = total_size_pattern()
                .captures(line)
                .and_then(|caps| parse_count(&caps[1]))
            {
                return OutputEvent::TotalSize(size);
            }
            OutputEvent::Ignored
        }
        OutputStream::Stderr => {
            if is_file_name {
                return OutputEvent::FileFailed;
            }
            if let Some(bytes_received) = connection_closed_pattern()
                .captures(line)
                .and_then(|caps| parse_count(&caps[1]))
            {
                return OutputEvent::ConnectionClosed { bytes_received };
            }
            if let Some(caps) = broken_pipe_pattern().captures(line) {
                if let Ok(port) = caps[2].parse() {
                    return OutputEvent::BrokenPipe {
                        address: caps[1].to_string(),
                        port,
                    };
                }
            }
            OutputEvent::Ignored
        }
    }
}

/// Folds rsync output and lifecycle signals into transfer state.
#[derive(Debug, Clone)]
pub struct TransferTracker {
    file_name: Option<String>,
    state: DownloadState,
    progress: Option<u8>,
    file_size: u64,
}

impl TransferTracker {
    /// Track a transfer of the file named `file_name`.
    pub fn new(file_name: Option<String>) -> Self {
        Self {
            file_name,
            state: DownloadState::Pending,
            progress: None,
            file_size: 0,
        }
    }

    pub fn state(&self) -> DownloadState {
        self.state
    }

    pub fn progress(&self) -> Option<u8> {
        self.progress
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Move to `next` if allowed. Returns whether the state changed.
    fn transition(&mut self, next: DownloadState) -> bool {
        if self.state.can_transition_to(next) {
            self.state = next;
            true
        } else {
            false
        }
    }

    /// Classify `line` and apply it. Returns the event for logging.
    pub fn apply(&mut self, stream: OutputStream, line: &str) -> OutputEvent {
        let event = parse_line(stream, line, self.file_name.as_deref());

        match &event {
            OutputEvent::Started => {
                self.transition(DownloadState::Downloading);
            }
            OutputEvent::Progress { bytes, percent } => {
                self.file_size = *bytes;
                self.progress = Some(*percent);
            }
            OutputEvent::TotalSize(size) => {
                self.file_size = *size;
            }
            OutputEvent::ConnectionClosed { bytes_received } => {
                // The exit code decides the state.
                self.file_size = *bytes_received;
            }
            OutputEvent::FileFailed => {
                self.transition(DownloadState::Error);
            }
            OutputEvent::Transferred { .. }
            | OutputEvent::BrokenPipe { .. }
            | OutputEvent::Ignored => {}
        }

        event
    }

    /// Apply the tool's exit. `None` means it was terminated by a signal.
    pub fn exited(&mut self, exit_code: Option<i32>) {
        if exit_code == Some(0) {
            if self.transition(DownloadState::Complete) {
                self.progress = Some(100);
            }
        } else {
            self.transition(DownloadState::Error);
        }
    }

    /// The tool could not be started.
    pub fn spawn_failed(&mut self) {
        if self.transition(DownloadState::Error) {
            self.progress = Some(0);
        }
    }

    /// Cancellation was observed.
    pub fn cancelled(&mut self) {
        self.transition(DownloadState::Cancelled);
    }
}
