//! Remote probe seam.
//!
//! Every check reaches the target host through [`RemoteProbe`]. The crate
//! ships one implementation, [`ssh::SshSession`], which drives the system
//! OpenSSH client. Checks never open sockets themselves.

mod process;
pub mod ssh;

#[cfg(test)]
pub(crate) mod scripted;

use std::path::Path;
use std::time::Duration;

use crate::error::ProbeError;

pub use ssh::{SshSession, SshTarget};

/// Uniform per-probe ceiling when nothing else is configured.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(300);

/// Captured result of a remote command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` if the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Stdout followed by stderr, the way an interactive terminal shows them.
    pub fn combined(&self) -> String {
        if self.stderr.is_empty() {
            return self.stdout.clone();
        }
        if self.stdout.is_empty() || self.stdout.ends_with('\n') {
            format!("{}{}", self.stdout, self.stderr)
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Capability to run read-only diagnostics on the target host.
pub trait RemoteProbe {
    /// Run a shell command on the target, bounded by `timeout`.
    ///
    /// A non-zero exit is still `Ok`; only transport problems are errors.
    fn execute(&mut self, command: &str, timeout: Duration) -> Result<CommandOutput, ProbeError>;

    /// Copy a remote file to `local`, overwriting it.
    fn fetch_file(&mut self, remote_path: &str, local_path: &Path) -> Result<(), ProbeError>;

    /// Read a remote text file.
    fn read_remote_file(&mut self, path: &str, timeout: Duration) -> Result<String, ProbeError>;
}

/// Quote `value` for a POSIX shell.
pub fn shell_quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._-+=:@,".contains(c))
    {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}
