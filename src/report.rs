//! Rendering a finished run for the operator.

use serde::Serialize;
use time::OffsetDateTime;

use crate::orchestrator::{RunOutcome, Verdicts};

/// Machine-readable summary of one run.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub host: String,
    pub snapshot_sha256: Option<String>,
    pub finished_at_unix: i64,
    pub passed: bool,
    pub verdicts: Verdicts,
}

impl Report {
    pub fn new(host: &str, outcome: RunOutcome) -> Self {
        Self {
            host: host.to_string(),
            snapshot_sha256: outcome.snapshot_sha256,
            finished_at_unix: OffsetDateTime::now_utc().unix_timestamp(),
            passed: outcome.verdicts.passed(),
            verdicts: outcome.verdicts,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Verdict table, one check per line, then a summary line.
    pub fn render_table(&self) -> String {
        let mut out = String::new();
        let width = self
            .verdicts
            .iter()
            .map(|(name, _)| name.len())
            .max()
            .unwrap_or(0);

        for (name, passed) in self.verdicts.iter() {
            let mark = if *passed { "PASS" } else { "FAIL" };
            out.push_str(&format!("{:<width$}  {}\n", name, mark, width = width));
        }

        if self.verdicts.is_empty() {
            out.push_str(&format!("{}: no checks ran\n", self.host));
        } else {
            let failed = self.verdicts.failed();
            if failed.is_empty() {
                out.push_str(&format!(
                    "{}: all {} checks passed\n",
                    self.host,
                    self.verdicts.len()
                ));
            } else {
                out.push_str(&format!(
                    "{}: {} of {} checks failed: {}\n",
                    self.host,
                    failed.len(),
                    self.verdicts.len(),
                    failed.join(", ")
                ));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::CheckId;

    fn outcome(results: &[(CheckId, bool)]) -> RunOutcome {
        let mut verdicts = Verdicts::default();
        for (check, passed) in results {
            verdicts.insert(*check, *passed);
        }
        RunOutcome {
            verdicts,
            snapshot_sha256: Some("ab".repeat(32)),
        }
    }

    #[test]
    fn test_table_lists_failures() {
        let report = Report::new(
            "node1",
            outcome(&[(CheckId::Sshd, true), (CheckId::Hostname, false)]),
        );
        let table = report.render_table();
        assert!(table.contains("hostname  FAIL\n"));
        assert!(table.contains("sshd      PASS\n"));
        assert!(table.ends_with("node1: 1 of 2 checks failed: hostname\n"));
        assert!(!report.passed);
    }

    #[test]
    fn test_empty_run_is_reported() {
        let report = Report::new("node1", RunOutcome::default());
        assert_eq!(report.render_table(), "node1: no checks ran\n");
        assert!(!report.passed);
    }

    #[test]
    fn test_json_fields() {
        let report = Report::new("node1", outcome(&[(CheckId::Fips, true)]));
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["host"], "node1");
        assert_eq!(value["passed"], true);
        assert_eq!(value["verdicts"]["fips"], true);
        assert_eq!(value["snapshot_sha256"].as_str().map(str::len), Some(64));
        assert!(value["finished_at_unix"].as_i64().unwrap() > 0);
    }
}
