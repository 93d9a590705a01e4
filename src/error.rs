//! Error types for remote probing, snapshot loading and run aborts.
//!
//! Only [`VerifyError`] ever escapes a verification run. Probe failures are
//! folded into `false` verdicts by the checks that hit them, and load failures
//! other than [`SpecError`] turn into an empty verdict set.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// A remote command or file transfer did not complete.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("command `{command}` timed out after {}s", timeout.as_secs())]
    Timeout { command: String, timeout: Duration },

    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("transfer of '{path}' failed: {reason}")]
    Transfer { path: String, reason: String },

    #[error("ssh session error: {0}")]
    Session(String),
}

/// The snapshot does not describe a machine the checks can reason about.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpecError {
    #[error("expected state has no '{0}' domain")]
    MissingDomain(String),

    #[error("'{path}' is missing required key '{key}'")]
    MissingKey { path: String, key: String },

    #[error("'{path}.{key}' has an invalid value: {reason}")]
    InvalidValue {
        path: String,
        key: String,
        reason: String,
    },

    #[error("partition '{0}' sets both grow and recommended")]
    ConflictingPolicy(String),

    #[error("logical volume '{0}' requires a volgroup entry")]
    MissingVolumeGroup(String),
}

impl SpecError {
    pub(crate) fn missing_key(path: impl Into<String>, key: impl Into<String>) -> Self {
        SpecError::MissingKey {
            path: path.into(),
            key: key.into(),
        }
    }

    pub(crate) fn invalid(
        path: impl Into<String>,
        key: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        SpecError::InvalidValue {
            path: path.into(),
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Loading the expected-state snapshot failed.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("fetching snapshot: {0}")]
    Fetch(#[from] ProbeError),

    #[error("reading local snapshot '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("parsing snapshot: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid snapshot: {0}")]
    Spec(#[from] SpecError),
}

/// A condition that stops a verification run outright.
#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("malformed expected state: {0}")]
    Spec(#[from] SpecError),
}

impl VerifyError {
    /// Process exit code used by the CLI for run-aborting errors.
    pub fn exit_code(&self) -> i32 {
        match self {
            VerifyError::Spec(_) => 2,
        }
    }
}
