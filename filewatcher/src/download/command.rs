//! External transfer tool invocation.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

/// Default transfer program.
pub const DEFAULT_PROGRAM: &str = "rsync";

/// Default remote shell used by the transfer program.
pub const DEFAULT_REMOTE_SHELL: &str = "ssh";

/// How to invoke the transfer tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferTool {
    /// Program to execute.
    pub program: PathBuf,
    /// Arguments placed before the transfer arguments (e.g. for a wrapper
    /// such as `nice`).
    pub program_args: Vec<String>,
    /// Connection string of the transfer host (`user@host`).
    pub remote_host: String,
    /// Remote shell passed with `-e`.
    pub remote_shell: String,
}

impl TransferTool {
    /// rsync over ssh to `remote_host`.
    pub fn rsync(remote_host: impl Into<String>) -> Self {
        Self {
            program: PathBuf::from(DEFAULT_PROGRAM),
            program_args: Vec::new(),
            remote_host: remote_host.into(),
            remote_shell: DEFAULT_REMOTE_SHELL.to_string(),
        }
    }

    /// Use a different program.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Prepend arguments to every invocation.
    pub fn with_program_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.program_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Use a different remote shell.
    pub fn with_remote_shell(mut self, shell: impl Into<String>) -> Self {
        self.remote_shell = shell.into();
        self
    }

    /// Source argument: `<host>:'<remote path>'`.
    ///
    /// The quotes are interpreted by the remote shell so paths with spaces
    /// survive.
    pub fn source_spec(&self, remote_path: &Path) -> String {
        format!("{}:'{}'", self.remote_host, remote_path.display())
    }

    /// Arguments for pulling `remote_path` to `local_path`.
    pub fn args(&self, remote_path: &Path, local_path: &Path) -> Vec<String> {
        vec![
            "--progress".to_string(),
            "--partial".to_string(),
            "--append".to_string(),
            "--checksum".to_string(),
            "-z".to_string(),
            "-e".to_string(),
            self.remote_shell.clone(),
            self.source_spec(remote_path),
            local_path.display().to_string(),
        ]
    }

    /// Build the process with both output streams piped.
    pub fn command(&self, remote_path: &Path, local_path: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.program_args)
            .args(self.args(remote_path, local_path))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}
