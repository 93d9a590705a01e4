//! Expected partition layout.
//!
//! Keys of the `partition` domain are mount points, plus a handful of
//! special entries: `volgroup` names the enclosing LVM volume group, and
//! `swap`, `pool` and `pool_meta` are sized like any other entry but never
//! show up in the mount table.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use super::whole_number;
use crate::error::SpecError;

pub const VOLGROUP_KEY: &str = "volgroup";

/// Entries that are sized but not mounted.
pub const UNMOUNTED_KEYS: &[&str] = &["pool", "pool_meta", "swap"];

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct RawPartition {
    name: Option<String>,
    fstype: Option<String>,
    size: Option<Value>,
    maxsize: Option<Value>,
    device_alias: Option<String>,
    device_wwid: Option<String>,
    lvm: bool,
    label: Option<String>,
    grow: bool,
    recommended: bool,
    percent: bool,
}

/// How the actual size of an entry is judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizePolicy {
    /// Actual size equals the nominal size.
    Exact(u64),
    /// Actual size strictly exceeds `min`, and does not exceed `max` if set.
    Grow { min: u64, max: Option<u64> },
    /// Size follows a rule rather than a literal value.
    Recommended,
}

/// Block device backing an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionDevice {
    /// Logical volume in the table's volume group. With `percent`, the
    /// nominal size is a percentage of the group rather than MB.
    Lvm { name: String, percent: bool },
    /// Plain partition. `alias` is the name the mount table shows, `wwid`
    /// a stable path used for size and label probes.
    Raw { alias: Option<String>, wwid: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionSpec {
    /// Mount point or special entry name.
    pub key: String,
    pub fstype: Option<String>,
    pub policy: SizePolicy,
    pub label: Option<String>,
    pub device: PartitionDevice,
}

impl PartitionSpec {
    pub fn is_mounted(&self) -> bool {
        !UNMOUNTED_KEYS.contains(&self.key.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionTable {
    pub volgroup: Option<String>,
    /// Entries ordered by key.
    pub entries: Vec<PartitionSpec>,
}

impl PartitionTable {
    pub fn get(&self, key: &str) -> Option<&PartitionSpec> {
        self.entries.iter().find(|entry| entry.key == key)
    }
}

pub(crate) fn parse_table(raw: BTreeMap<String, RawPartition>) -> Result<PartitionTable, SpecError> {
    let volgroup = match raw.get(VOLGROUP_KEY) {
        Some(vg) => Some(
            vg.name
                .clone()
                .filter(|name| !name.is_empty())
                .ok_or_else(|| SpecError::missing_key("partition.volgroup", "name"))?,
        ),
        None => None,
    };

    let mut entries = Vec::new();
    for (key, part) in raw {
        if key == VOLGROUP_KEY {
            continue;
        }
        entries.push(parse_entry(key, part, volgroup.is_some())?);
    }

    Ok(PartitionTable { volgroup, entries })
}

fn parse_entry(key: String, part: RawPartition, has_volgroup: bool) -> Result<PartitionSpec, SpecError> {
    let path = format!("partition.{}", key);

    let policy = parse_policy(&key, &path, &part)?;

    let device = if part.lvm {
        if !has_volgroup {
            return Err(SpecError::MissingVolumeGroup(key));
        }
        let name = part
            .name
            .filter(|name| !name.is_empty())
            .ok_or_else(|| SpecError::missing_key(&path, "name"))?;
        PartitionDevice::Lvm {
            name,
            percent: part.percent,
        }
    } else {
        let wwid = part
            .device_wwid
            .ok_or_else(|| SpecError::missing_key(&path, "device_wwid"))?;
        PartitionDevice::Raw {
            alias: part.device_alias,
            wwid,
        }
    };

    let spec = PartitionSpec {
        key,
        fstype: part.fstype,
        policy,
        label: part.label.filter(|label| !label.is_empty()),
        device,
    };

    if spec.is_mounted() {
        if spec.fstype.is_none() {
            return Err(SpecError::missing_key(&path, "fstype"));
        }
        if let PartitionDevice::Raw { alias: None, .. } = spec.device {
            return Err(SpecError::missing_key(&path, "device_alias"));
        }
    }

    Ok(spec)
}

fn parse_policy(key: &str, path: &str, part: &RawPartition) -> Result<SizePolicy, SpecError> {
    if part.grow && part.recommended {
        return Err(SpecError::ConflictingPolicy(key.to_string()));
    }
    if part.recommended {
        return Ok(SizePolicy::Recommended);
    }

    let size = part
        .size
        .as_ref()
        .ok_or_else(|| SpecError::missing_key(path, "size"))
        .and_then(|value| {
            whole_number(value).ok_or_else(|| SpecError::invalid(path, "size", "expected whole MB"))
        })?;

    if !part.grow {
        return Ok(SizePolicy::Exact(size));
    }

    let max = match &part.maxsize {
        None | Some(Value::Null) => None,
        Some(value) => {
            let max = whole_number(value)
                .ok_or_else(|| SpecError::invalid(path, "maxsize", "expected whole MB"))?;
            // zero means unbounded
            Some(max).filter(|m| *m > 0)
        }
    };

    Ok(SizePolicy::Grow { min: size, max })
}
