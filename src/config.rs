//! Operator configuration.
//!
//! ```toml
//! [target]
//! host = "node1.example.com"
//! user = "root"
//! port = 22
//! identity_file = "~/.ssh/id_verify"
//! connect_timeout_secs = 30
//!
//! [verify]
//! timeout_secs = 300
//! snapshot_path = "/boot/autotest/checkdata_map.json"
//! local_snapshot = "/var/tmp/checkdata_map.json"
//! root_lv_name = "rhvh"
//! checks = ["partition", "static_network"]
//! ```
//!
//! Every key is optional in the file, but a host must come from either the
//! file or the command line.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::checks::{CheckId, CheckSettings};
use crate::derive::partition::DEFAULT_ROOT_LV_NAME;
use crate::expected::{SnapshotSource, DEFAULT_SNAPSHOT_PATH};
use crate::orchestrator::RunOptions;
use crate::transport::{SshTarget, DEFAULT_PROBE_TIMEOUT};

const APP_DIR: &str = "install-verify";
const CONFIG_FILENAME: &str = "config.toml";
const SNAPSHOT_FILENAME: &str = "checkdata_map.json";

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ConfigToml {
    #[serde(default)]
    target: TargetToml,
    #[serde(default)]
    verify: VerifyToml,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TargetToml {
    host: Option<String>,
    user: Option<String>,
    port: Option<u16>,
    identity_file: Option<PathBuf>,
    connect_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct VerifyToml {
    timeout_secs: Option<u64>,
    snapshot_path: Option<String>,
    local_snapshot: Option<PathBuf>,
    root_lv_name: Option<String>,
    checks: Option<Vec<String>>,
}

/// Command-line values that win over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub user: Option<String>,
    pub checks: Vec<String>,
}

/// Everything a run needs.
#[derive(Debug, Clone)]
pub struct VerifyConfig {
    pub target: SshTarget,
    pub options: RunOptions,
}

/// `<config dir>/install-verify/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILENAME))
}

fn default_local_snapshot() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
        .join(SNAPSHOT_FILENAME)
}

/// Load the config at `path`, or the default config if `path` is `None`.
///
/// A missing default config is not an error; an explicitly named one is.
pub fn load_config(path: Option<&Path>, overrides: &Overrides) -> Result<VerifyConfig> {
    let parsed = match path {
        Some(path) => read_config(path)?,
        None => match default_config_path() {
            Some(path) if path.is_file() => read_config(&path)?,
            _ => ConfigToml::default(),
        },
    };
    resolve(parsed, overrides)
}

fn read_config(path: &Path) -> Result<ConfigToml> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading config '{}'", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing config '{}'", path.display()))
}

fn resolve(parsed: ConfigToml, overrides: &Overrides) -> Result<VerifyConfig> {
    let ConfigToml { target, verify } = parsed;

    let host = overrides
        .host
        .clone()
        .or(target.host)
        .map(|host| host.trim().to_string())
        .unwrap_or_default();
    if host.is_empty() {
        bail!("no target host: set [target].host in the config or pass --host");
    }

    let user = overrides
        .user
        .clone()
        .or(target.user)
        .map(|user| user.trim().to_string())
        .unwrap_or_else(|| "root".to_string());
    if user.is_empty() {
        bail!("invalid config: [target].user must not be empty");
    }

    let connect_timeout = nonzero_secs("[target].connect_timeout_secs", target.connect_timeout_secs, 30)?;
    let timeout = nonzero_secs(
        "[verify].timeout_secs",
        verify.timeout_secs,
        DEFAULT_PROBE_TIMEOUT.as_secs(),
    )?;

    let root_lv_name = verify
        .root_lv_name
        .unwrap_or_else(|| DEFAULT_ROOT_LV_NAME.to_string());
    if root_lv_name.trim().is_empty() {
        bail!("invalid config: [verify].root_lv_name must not be empty");
    }

    let remote_path = verify
        .snapshot_path
        .unwrap_or_else(|| DEFAULT_SNAPSHOT_PATH.to_string());
    if !remote_path.starts_with('/') {
        bail!(
            "invalid config: [verify].snapshot_path '{}' must be absolute",
            remote_path
        );
    }

    let names = if overrides.checks.is_empty() {
        verify.checks
    } else {
        Some(overrides.checks.clone())
    };
    let checks = names.map(|names| parse_checks(&names)).transpose()?;

    let mut ssh = SshTarget::new(&host);
    ssh.user = user;
    ssh.port = target.port.unwrap_or(22);
    ssh.identity_file = target.identity_file.map(|path| expand_home(&path));
    ssh.connect_timeout = connect_timeout;
    ssh.transfer_timeout = timeout;

    Ok(VerifyConfig {
        target: ssh,
        options: RunOptions {
            snapshot: SnapshotSource {
                remote_path,
                local_path: verify
                    .local_snapshot
                    .map(|path| expand_home(&path))
                    .unwrap_or_else(default_local_snapshot),
            },
            settings: CheckSettings {
                timeout,
                root_lv_name,
            },
            checks,
        },
    })
}

fn nonzero_secs(key: &str, value: Option<u64>, default: u64) -> Result<Duration> {
    match value.unwrap_or(default) {
        0 => bail!("invalid config: {} must be greater than zero", key),
        secs => Ok(Duration::from_secs(secs)),
    }
}

/// Parse check names, dropping duplicates but keeping order.
pub fn parse_checks(names: &[String]) -> Result<Vec<CheckId>> {
    let mut checks = Vec::new();
    for name in names {
        let check = name
            .parse::<CheckId>()
            .map_err(|e| anyhow::anyhow!("invalid check list: {}", e))?;
        if !checks.contains(&check) {
            checks.push(check);
        }
    }
    if checks.is_empty() {
        bail!("invalid check list: no checks named");
    }
    Ok(checks)
}

fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_defaults_fill_everything_but_host() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[target]\nhost = \"node1\"\n");

        let config = load_config(Some(&path), &Overrides::default()).unwrap();

        assert_eq!(config.target.destination(), "root@node1");
        assert_eq!(config.target.port, 22);
        assert_eq!(config.target.connect_timeout, Duration::from_secs(30));
        assert_eq!(config.options.settings.timeout, Duration::from_secs(300));
        assert_eq!(config.options.settings.root_lv_name, "rhvh");
        assert_eq!(config.options.snapshot.remote_path, DEFAULT_SNAPSHOT_PATH);
        assert!(config.options.checks.is_none());
    }

    #[test]
    fn test_full_config() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"
[target]
host = "node1"
user = "admin"
port = 2222
identity_file = "/keys/id_verify"
connect_timeout_secs = 5

[verify]
timeout_secs = 60
snapshot_path = "/root/expected.json"
local_snapshot = "/var/tmp/expected.json"
root_lv_name = "ovirt-node"
checks = ["partition", "static_network", "partition"]
"#,
        );

        let config = load_config(Some(&path), &Overrides::default()).unwrap();

        assert_eq!(config.target.destination(), "admin@node1");
        assert_eq!(config.target.port, 2222);
        assert_eq!(config.target.identity_file, Some(PathBuf::from("/keys/id_verify")));
        assert_eq!(config.target.transfer_timeout, Duration::from_secs(60));
        assert_eq!(config.options.snapshot.remote_path, "/root/expected.json");
        assert_eq!(
            config.options.snapshot.local_path,
            PathBuf::from("/var/tmp/expected.json")
        );
        assert_eq!(config.options.settings.root_lv_name, "ovirt-node");
        assert_eq!(
            config.options.checks,
            Some(vec![CheckId::Partition, CheckId::StaticNetwork])
        );
    }

    #[test]
    fn test_overrides_win() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "[target]\nhost = \"node1\"\n\n[verify]\nchecks = [\"bond\"]\n",
        );
        let overrides = Overrides {
            host: Some("node2".into()),
            user: Some("admin".into()),
            checks: vec!["sshd".into()],
        };

        let config = load_config(Some(&path), &overrides).unwrap();

        assert_eq!(config.target.destination(), "admin@node2");
        assert_eq!(config.options.checks, Some(vec![CheckId::Sshd]));
    }

    #[test]
    fn test_missing_host_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[verify]\ntimeout_secs = 10\n");
        let err = load_config(Some(&path), &Overrides::default()).unwrap_err();
        assert!(err.to_string().contains("--host"));

        let path = write_config(&dir, "[target]\nhost = \"  \"\n");
        assert!(load_config(Some(&path), &Overrides::default()).is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[target]\nhost = \"node1\"\n\n[verify]\ntimeout_secs = 0\n");
        let err = load_config(Some(&path), &Overrides::default()).unwrap_err();
        assert!(err.to_string().contains("timeout_secs"));
    }

    #[test]
    fn test_unknown_check_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[target]\nhost = \"node1\"\n\n[verify]\nchecks = [\"raid\"]\n");
        let err = load_config(Some(&path), &Overrides::default()).unwrap_err();
        assert!(err.to_string().contains("unknown check 'raid'"));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[target]\nhost = \"node1\"\npassword = \"x\"\n");
        assert!(load_config(Some(&path), &Overrides::default()).is_err());
    }

    #[test]
    fn test_relative_snapshot_path_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "[target]\nhost = \"node1\"\n\n[verify]\nsnapshot_path = \"checkdata_map.json\"\n",
        );
        assert!(load_config(Some(&path), &Overrides::default()).is_err());
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = load_config(Some(&missing), &Overrides::default()).unwrap_err();
        assert!(format!("{:#}", err).contains("reading config"));
    }

    #[test]
    fn test_empty_check_list_rejected() {
        assert!(parse_checks(&[]).is_err());
    }
}
