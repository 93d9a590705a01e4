//! Expected post-install state of one target machine.
//!
//! The installer leaves a JSON snapshot of what it was asked to configure on
//! the target (`/boot/autotest/checkdata_map.json` by default). Loading is
//! two-phase: serde parses the loose document, then each domain is validated
//! into typed variants so a malformed snapshot is rejected before any check
//! runs.
//!
//! ```text
//! {
//!   "network":   { "static": { "DEVICE": "em1", "IPADDR": "10.0.0.5", ... },
//!                  "bond": { "DEVICE": "bond0", "slaves": ["p1p1"], ... },
//!                  "hostname": "node1.example.com" },
//!   "partition": { "volgroup": { "name": "rhvh" },
//!                  "/boot": { "lvm": false, "fstype": "ext4", "size": 1024, ... } },
//!   "lang": "en_US.UTF-8",
//!   "kdump": { "reserve-mb": "200" },
//!   ...
//! }
//! ```

pub mod network;
pub mod partition;

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::{LoadError, SpecError};
use crate::transport::RemoteProbe;

pub use network::{BondDevice, DeviceConfig, NetworkSpec, NicDevice, StaticDevice};
pub use partition::{PartitionDevice, PartitionSpec, PartitionTable, SizePolicy};

/// Default location of the snapshot on the installed target.
pub const DEFAULT_SNAPSHOT_PATH: &str = "/boot/autotest/checkdata_map.json";

/// Console keyboard and X11 layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyboard {
    pub vc_keymap: String,
    pub x_layouts: String,
}

/// Crash kernel reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Kdump {
    pub reserve_mb: String,
}

/// Validated expected state. Immutable once loaded.
#[derive(Debug, Clone, Default)]
pub struct ExpectedState {
    pub network: Option<NetworkSpec>,
    pub partition: Option<PartitionTable>,
    pub lang: Option<String>,
    pub ntp_servers: Option<String>,
    pub keyboard: Option<Keyboard>,
    pub kdump: Option<Kdump>,
    pub user: Option<String>,
    pub selinux: Option<String>,
    pub grubby: Option<String>,
    pub boot_device: Option<String>,
}

/// A loaded snapshot together with the digest of the bytes it came from.
#[derive(Debug, Clone)]
pub struct LoadedSnapshot {
    pub state: ExpectedState,
    pub sha256: String,
}

/// Where the snapshot lives remotely and where it is cached locally.
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    pub remote_path: String,
    pub local_path: PathBuf,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawSnapshot {
    network: Option<network::RawNetwork>,
    partition: Option<BTreeMap<String, partition::RawPartition>>,
    lang: Option<String>,
    ntpservers: Option<String>,
    keyboard: Option<RawKeyboard>,
    kdump: Option<RawKdump>,
    user: Option<RawUser>,
    selinux: Option<String>,
    grubby: Option<String>,
    bootdevice: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawKeyboard {
    vckeymap: Option<String>,
    xlayouts: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawKdump {
    #[serde(rename = "reserve-mb")]
    reserve_mb: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    name: Option<String>,
}

/// Fetch the snapshot from the target and load it.
///
/// Any stale local copy is removed first so a failed fetch can never be
/// mistaken for a successful one.
pub fn load(probe: &mut dyn RemoteProbe, source: &SnapshotSource) -> Result<LoadedSnapshot, LoadError> {
    info!(remote = %source.remote_path, "reading expected state");

    remove_stale(&source.local_path)?;
    probe.fetch_file(&source.remote_path, &source.local_path)?;

    load_local(&source.local_path)
}

/// Load a snapshot that is already on the local filesystem.
pub fn load_local(path: &Path) -> Result<LoadedSnapshot, LoadError> {
    let bytes = fs::read(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let state = ExpectedState::from_json(&bytes)?;
    let sha256 = hex_digest(&bytes);
    info!(path = %path.display(), sha256 = %sha256, "expected state loaded");
    Ok(LoadedSnapshot { state, sha256 })
}

fn remove_stale(path: &Path) -> Result<(), LoadError> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "removed stale snapshot");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(LoadError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn hex_digest(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

impl ExpectedState {
    /// Parse and validate a snapshot document.
    pub fn from_json(bytes: &[u8]) -> Result<Self, LoadError> {
        let raw: RawSnapshot = serde_json::from_slice(bytes)?;
        Ok(Self::validate(raw)?)
    }

    fn validate(raw: RawSnapshot) -> Result<Self, SpecError> {
        let network = raw.network.map(network::parse_network).transpose()?;
        let partition = raw.partition.map(partition::parse_table).transpose()?;

        let keyboard = raw
            .keyboard
            .map(|k| {
                Ok::<_, SpecError>(Keyboard {
                    vc_keymap: k
                        .vckeymap
                        .ok_or_else(|| SpecError::missing_key("keyboard", "vckeymap"))?,
                    x_layouts: k
                        .xlayouts
                        .ok_or_else(|| SpecError::missing_key("keyboard", "xlayouts"))?,
                })
            })
            .transpose()?;

        let kdump = raw
            .kdump
            .map(|k| {
                let value = k
                    .reserve_mb
                    .ok_or_else(|| SpecError::missing_key("kdump", "reserve-mb"))?;
                let reserve_mb = scalar_string(&value)
                    .ok_or_else(|| SpecError::invalid("kdump", "reserve-mb", "expected a size"))?;
                Ok::<_, SpecError>(Kdump { reserve_mb })
            })
            .transpose()?;

        let user = raw
            .user
            .map(|u| u.name.ok_or_else(|| SpecError::missing_key("user", "name")))
            .transpose()?;

        Ok(Self {
            network,
            partition,
            lang: raw.lang,
            ntp_servers: raw.ntpservers,
            keyboard,
            kdump,
            user,
            selinux: raw.selinux,
            grubby: raw.grubby,
            boot_device: raw.bootdevice,
        })
    }

    pub fn network(&self) -> Result<&NetworkSpec, SpecError> {
        require(&self.network, "network")
    }

    pub fn partition(&self) -> Result<&PartitionTable, SpecError> {
        require(&self.partition, "partition")
    }

    pub fn lang(&self) -> Result<&str, SpecError> {
        require(&self.lang, "lang").map(String::as_str)
    }

    pub fn ntp_servers(&self) -> Result<&str, SpecError> {
        require(&self.ntp_servers, "ntpservers").map(String::as_str)
    }

    pub fn keyboard(&self) -> Result<&Keyboard, SpecError> {
        require(&self.keyboard, "keyboard")
    }

    pub fn kdump(&self) -> Result<&Kdump, SpecError> {
        require(&self.kdump, "kdump")
    }

    pub fn user(&self) -> Result<&str, SpecError> {
        require(&self.user, "user").map(String::as_str)
    }

    pub fn selinux(&self) -> Result<&str, SpecError> {
        require(&self.selinux, "selinux").map(String::as_str)
    }

    pub fn grubby(&self) -> Result<&str, SpecError> {
        require(&self.grubby, "grubby").map(String::as_str)
    }

    pub fn boot_device(&self) -> Result<&str, SpecError> {
        require(&self.boot_device, "bootdevice").map(String::as_str)
    }
}

fn require<'a, T>(value: &'a Option<T>, domain: &str) -> Result<&'a T, SpecError> {
    value
        .as_ref()
        .ok_or_else(|| SpecError::MissingDomain(domain.to_string()))
}

/// Render a JSON scalar the way it appears in a config file.
pub(crate) fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("yes".to_string()),
        Value::Bool(false) => Some("no".to_string()),
        _ => None,
    }
}

/// Interpret a JSON number or numeric string as a whole number.
pub(crate) fn whole_number(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
