//! In-memory probe that replays canned outputs.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use super::{CommandOutput, RemoteProbe};
use crate::error::ProbeError;

#[derive(Clone)]
enum Reply {
    Output(CommandOutput),
    Timeout,
}

#[derive(Default)]
pub(crate) struct ScriptedProbe {
    commands: HashMap<String, Reply>,
    files: HashMap<String, Reply>,
    remote_bytes: HashMap<String, Vec<u8>>,
    pub(crate) calls: Vec<String>,
}

impl ScriptedProbe {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_output(mut self, command: &str, stdout: &str) -> Self {
        self.commands.insert(
            command.to_string(),
            Reply::Output(CommandOutput {
                status: Some(0),
                stdout: stdout.to_string(),
                stderr: String::new(),
            }),
        );
        self
    }

    pub(crate) fn with_failure(mut self, command: &str, status: i32, stderr: &str) -> Self {
        self.commands.insert(
            command.to_string(),
            Reply::Output(CommandOutput {
                status: Some(status),
                stdout: String::new(),
                stderr: stderr.to_string(),
            }),
        );
        self
    }

    pub(crate) fn with_timeout(mut self, command: &str) -> Self {
        self.commands.insert(command.to_string(), Reply::Timeout);
        self
    }

    pub(crate) fn with_file(mut self, path: &str, content: &str) -> Self {
        self.files.insert(
            path.to_string(),
            Reply::Output(CommandOutput {
                status: Some(0),
                stdout: content.to_string(),
                stderr: String::new(),
            }),
        );
        self
    }

    pub(crate) fn with_file_timeout(mut self, path: &str) -> Self {
        self.files.insert(path.to_string(), Reply::Timeout);
        self
    }

    pub(crate) fn with_remote_bytes(mut self, path: &str, bytes: &[u8]) -> Self {
        self.remote_bytes.insert(path.to_string(), bytes.to_vec());
        self
    }
}

impl RemoteProbe for ScriptedProbe {
    fn execute(&mut self, command: &str, timeout: Duration) -> Result<CommandOutput, ProbeError> {
        self.calls.push(command.to_string());
        match self.commands.get(command) {
            Some(Reply::Output(output)) => Ok(output.clone()),
            Some(Reply::Timeout) => Err(ProbeError::Timeout {
                command: command.to_string(),
                timeout,
            }),
            None => Ok(CommandOutput {
                status: Some(127),
                stdout: String::new(),
                stderr: format!("{}: command not found", command),
            }),
        }
    }

    fn fetch_file(&mut self, remote_path: &str, local_path: &Path) -> Result<(), ProbeError> {
        self.calls.push(format!("fetch {}", remote_path));
        let bytes = self
            .remote_bytes
            .get(remote_path)
            .ok_or_else(|| ProbeError::Transfer {
                path: remote_path.to_string(),
                reason: "No such file or directory".to_string(),
            })?;
        fs::write(local_path, bytes).map_err(|e| ProbeError::Transfer {
            path: local_path.display().to_string(),
            reason: e.to_string(),
        })
    }

    fn read_remote_file(&mut self, path: &str, timeout: Duration) -> Result<String, ProbeError> {
        self.calls.push(format!("read {}", path));
        match self.files.get(path) {
            Some(Reply::Output(output)) => Ok(output.stdout.clone()),
            Some(Reply::Timeout) => Err(ProbeError::Timeout {
                command: format!("cat -- {}", path),
                timeout,
            }),
            None => Err(ProbeError::Transfer {
                path: path.to_string(),
                reason: "No such file or directory".to_string(),
            }),
        }
    }
}
