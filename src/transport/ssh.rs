//! OpenSSH-backed probe session.
//!
//! A session owns one multiplexing master connection. Every command and
//! transfer rides on that master through its control socket, so the target
//! only authenticates once per run. Opening a session always starts a fresh
//! master; nothing is shared between runs.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use tempfile::TempDir;
use tracing::{debug, info, warn};

use super::process::{run_detaching, run_with_timeout};
use super::{shell_quote, CommandOutput, RemoteProbe, DEFAULT_PROBE_TIMEOUT};
use crate::error::ProbeError;

/// Where and how to reach the target host.
#[derive(Debug, Clone)]
pub struct SshTarget {
    pub host: String,
    pub user: String,
    pub port: u16,
    pub identity_file: Option<PathBuf>,
    pub connect_timeout: Duration,
    /// Ceiling for `scp` transfers.
    pub transfer_timeout: Duration,
}

impl SshTarget {
    pub fn new(host: &str) -> Self {
        Self {
            host: host.to_string(),
            user: "root".to_string(),
            port: 22,
            identity_file: None,
            connect_timeout: Duration::from_secs(30),
            transfer_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }
}

/// Open connection to one target host.
pub struct SshSession {
    target: SshTarget,
    control_path: PathBuf,
    // Holds the control socket; removed when the session is dropped.
    _control_dir: TempDir,
    open: bool,
}

impl SshSession {
    /// Authenticate and start the master connection.
    pub fn open(target: SshTarget) -> Result<Self, ProbeError> {
        let control_dir = tempfile::Builder::new()
            .prefix("install-verify-")
            .tempdir()
            .map_err(|e| ProbeError::Session(format!("creating control directory: {}", e)))?;
        let control_path = control_dir.path().join("master.sock");

        let mut cmd = Command::new("ssh");
        cmd.args(["-M", "-f", "-N"]);
        cmd.arg("-S").arg(&control_path);
        push_ssh_options(&mut cmd, &target);
        cmd.arg("-p").arg(target.port.to_string());
        cmd.arg(target.destination());

        let label = format!("ssh -M {}", target.destination());
        let output = run_detaching(cmd, &label, target.connect_timeout * 2)?;
        if !output.success() {
            return Err(ProbeError::Session(format!(
                "could not connect to {}: {}",
                target.destination(),
                output.stderr.trim()
            )));
        }

        info!(target = %target.destination(), "ssh session opened");
        Ok(Self {
            target,
            control_path,
            _control_dir: control_dir,
            open: true,
        })
    }

    pub fn target(&self) -> &SshTarget {
        &self.target
    }

    /// Stop the master connection.
    pub fn close(&mut self) -> Result<(), ProbeError> {
        if !self.open {
            return Ok(());
        }
        self.open = false;

        let mut cmd = Command::new("ssh");
        cmd.arg("-S").arg(&self.control_path);
        cmd.args(["-O", "exit"]);
        cmd.arg(self.target.destination());

        let output = run_with_timeout(cmd, "ssh -O exit", self.target.connect_timeout)?;
        if !output.success() {
            return Err(ProbeError::Session(format!(
                "closing master for {}: {}",
                self.target.destination(),
                output.stderr.trim()
            )));
        }
        info!(target = %self.target.destination(), "ssh session closed");
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), ProbeError> {
        if self.open {
            Ok(())
        } else {
            Err(ProbeError::Session("session is closed".to_string()))
        }
    }

    fn multiplexed(&self, program: &str) -> Command {
        let mut cmd = Command::new(program);
        cmd.arg("-o")
            .arg(format!("ControlPath={}", self.control_path.display()));
        push_ssh_options(&mut cmd, &self.target);
        cmd
    }
}

impl RemoteProbe for SshSession {
    fn execute(&mut self, command: &str, timeout: Duration) -> Result<CommandOutput, ProbeError> {
        self.ensure_open()?;
        debug!(command, "remote exec");

        let mut cmd = self.multiplexed("ssh");
        cmd.arg("-p").arg(self.target.port.to_string());
        cmd.arg(self.target.destination());
        cmd.arg("--").arg(command);
        run_with_timeout(cmd, command, timeout)
    }

    fn fetch_file(&mut self, remote_path: &str, local_path: &Path) -> Result<(), ProbeError> {
        self.ensure_open()?;
        if let Some(parent) = local_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ProbeError::Transfer {
                path: local_path.display().to_string(),
                reason: format!("creating parent directory: {}", e),
            })?;
        }

        let mut cmd = self.multiplexed("scp");
        cmd.arg("-P").arg(self.target.port.to_string());
        cmd.arg(format!("{}:{}", self.target.destination(), remote_path));
        cmd.arg(local_path);

        let label = format!("scp {}", remote_path);
        let output = run_with_timeout(cmd, &label, self.target.transfer_timeout)?;
        if !output.success() {
            return Err(ProbeError::Transfer {
                path: remote_path.to_string(),
                reason: output.stderr.trim().to_string(),
            });
        }
        Ok(())
    }

    fn read_remote_file(&mut self, path: &str, timeout: Duration) -> Result<String, ProbeError> {
        let output = self.execute(&format!("cat -- {}", shell_quote(path)), timeout)?;
        if !output.success() {
            return Err(ProbeError::Transfer {
                path: path.to_string(),
                reason: output.stderr.trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}

impl Drop for SshSession {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("{}", e);
        }
    }
}

/// Options shared by every ssh/scp invocation.
///
/// Freshly installed hosts regenerate their host keys on every install, so
/// host key checking is disabled.
fn push_ssh_options(cmd: &mut Command, target: &SshTarget) {
    cmd.args([
        "-o",
        "BatchMode=yes",
        "-o",
        "StrictHostKeyChecking=no",
        "-o",
        "UserKnownHostsFile=/dev/null",
        "-o",
        "LogLevel=ERROR",
    ]);
    cmd.arg("-o").arg(format!(
        "ConnectTimeout={}",
        target.connect_timeout.as_secs().max(1)
    ));
    if let Some(identity) = &target.identity_file {
        cmd.arg("-i").arg(identity);
    }
}
