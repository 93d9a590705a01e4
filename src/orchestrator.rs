//! One verification run against one target.
//!
//! A run fetches the expected state, runs the selected checks in order and
//! collects a verdict per check. A snapshot that cannot be fetched or parsed
//! yields an empty verdict set; a snapshot that parses but is malformed
//! aborts the run with [`VerifyError`].

use std::collections::btree_map;
use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::checks::{CheckContext, CheckId, CheckSettings};
use crate::error::{LoadError, VerifyError};
use crate::expected::{self, SnapshotSource};
use crate::transport::{RemoteProbe, SshSession, SshTarget};

/// What to verify and how.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub snapshot: SnapshotSource,
    pub settings: CheckSettings,
    /// Checks to run. `None` selects every check applicable to the snapshot.
    pub checks: Option<Vec<CheckId>>,
}

/// Check name to verdict, in name order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Verdicts(BTreeMap<String, bool>);

impl Verdicts {
    pub fn insert(&mut self, check: CheckId, passed: bool) {
        self.0.insert(check.name().to_string(), passed);
    }

    pub fn get(&self, check: &str) -> Option<bool> {
        self.0.get(check).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, bool> {
        self.0.iter()
    }

    /// Names of the checks that did not pass.
    pub fn failed(&self) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(_, passed)| !**passed)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// True iff at least one check ran and every check passed.
    pub fn passed(&self) -> bool {
        !self.0.is_empty() && self.0.values().all(|passed| *passed)
    }
}

/// Verdicts plus the digest of the snapshot they were judged against.
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    pub verdicts: Verdicts,
    /// `None` when the snapshot could not be loaded.
    pub snapshot_sha256: Option<String>,
}

/// Run against an already-open probe.
pub fn run(probe: &mut dyn RemoteProbe, options: &RunOptions) -> Result<RunOutcome, VerifyError> {
    let loaded = match expected::load(probe, &options.snapshot) {
        Ok(loaded) => loaded,
        Err(LoadError::Spec(e)) => return Err(e.into()),
        Err(e) => {
            error!("expected state unavailable, no checks run: {}", e);
            return Ok(RunOutcome::default());
        }
    };

    let checks = match &options.checks {
        Some(checks) => checks.clone(),
        None => CheckId::applicable(&loaded.state),
    };
    let names = checks.iter().map(|c| c.name()).collect::<Vec<_>>().join(",");
    info!(checks = %names, "running checks");

    let mut verdicts = Verdicts::default();
    let mut ctx = CheckContext::new(&loaded.state, probe, &options.settings);
    for check in checks {
        let passed = check.run(&mut ctx)?;
        info!(check = check.name(), passed, "check finished");
        verdicts.insert(check, passed);
    }

    Ok(RunOutcome {
        verdicts,
        snapshot_sha256: Some(loaded.sha256),
    })
}

/// Open a fresh session to `target`, run, and close the session.
///
/// A session that cannot be opened counts as an unreachable snapshot.
pub fn verify_host(target: SshTarget, options: &RunOptions) -> Result<RunOutcome, VerifyError> {
    let host = target.host.clone();
    let mut session = match SshSession::open(target) {
        Ok(session) => session,
        Err(e) => {
            error!(host = %host, "cannot reach target: {}", e);
            return Ok(RunOutcome::default());
        }
    };

    let outcome = run(&mut session, options);

    if let Err(e) = session.close() {
        warn!(host = %host, "closing session: {}", e);
    }
    outcome
}
