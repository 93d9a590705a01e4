//! Local subprocess execution with a hard deadline.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use super::CommandOutput;
use crate::error::ProbeError;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long to wait for pipe readers once the process has exited.
///
/// `ssh -f` leaves a backgrounded master holding stderr open, so its reader
/// may never see EOF.
const READER_GRACE: Duration = Duration::from_millis(500);

#[derive(Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Run `cmd` to completion, killing it once `timeout` has elapsed.
///
/// `label` is only used for error messages and logs.
pub(crate) fn run_with_timeout(
    cmd: Command,
    label: &str,
    timeout: Duration,
) -> Result<CommandOutput, ProbeError> {
    run(cmd, label, timeout, Stdio::piped())
}

/// Like [`run_with_timeout`] for commands that fork a daemon, such as
/// `ssh -f`. Stdout is discarded so only the stderr reader can be left
/// waiting on the daemon.
pub(crate) fn run_detaching(
    cmd: Command,
    label: &str,
    timeout: Duration,
) -> Result<CommandOutput, ProbeError> {
    run(cmd, label, timeout, Stdio::null())
}

fn run(
    mut cmd: Command,
    label: &str,
    timeout: Duration,
    stdout: Stdio,
) -> Result<CommandOutput, ProbeError> {
    cmd.stdin(Stdio::null()).stdout(stdout).stderr(Stdio::piped());

    let program = cmd.get_program().to_string_lossy().into_owned();
    let mut child = cmd
        .spawn()
        .map_err(|source| ProbeError::Spawn { program, source })?;

    let (tx, rx) = mpsc::channel();
    spawn_reader(&mut child, Stream::Stdout, tx.clone());
    spawn_reader(&mut child, Stream::Stderr, tx);

    let start = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {}
            Err(e) => {
                let _ = child.kill();
                return Err(ProbeError::Session(format!(
                    "waiting for `{}` failed: {}",
                    label, e
                )));
            }
        }

        if start.elapsed() > timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ProbeError::Timeout {
                command: label.to_string(),
                timeout,
            });
        }

        thread::sleep(POLL_INTERVAL);
    };

    let mut output = CommandOutput {
        status: status.code(),
        ..Default::default()
    };
    let mut pending = 2;
    while pending > 0 {
        match rx.recv_timeout(READER_GRACE) {
            Ok((Stream::Stdout, text)) => output.stdout = text,
            Ok((Stream::Stderr, text)) => output.stderr = text,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
        }
        pending -= 1;
    }

    debug!(
        command = label,
        status = ?output.status,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "process finished"
    );
    Ok(output)
}

fn spawn_reader(child: &mut Child, stream: Stream, tx: Sender<(Stream, String)>) {
    let pipe: Option<Box<dyn Read + Send>> = match stream {
        Stream::Stdout => child.stdout.take().map(|p| Box::new(p) as Box<dyn Read + Send>),
        Stream::Stderr => child.stderr.take().map(|p| Box::new(p) as Box<dyn Read + Send>),
    };
    let Some(mut pipe) = pipe else {
        let _ = tx.send((stream, String::new()));
        return;
    };

    thread::spawn(move || {
        let mut bytes = Vec::new();
        let _ = pipe.read_to_end(&mut bytes);
        let _ = tx.send((stream, String::from_utf8_lossy(&bytes).into_owned()));
    });
}
