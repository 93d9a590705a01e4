//! Patterns and probe commands for the partition layout.

use regex::escape;

use super::lvm;
use super::Pattern;
use crate::error::SpecError;
use crate::expected::{PartitionDevice, PartitionSpec, PartitionTable};
use crate::transport::shell_quote;

/// Default LV name prefix of the root filesystem.
///
/// The installer names the root LV after the image it deployed
/// (`rhvh-4.1-0.20170421.0+1`), so `/` is matched by this prefix instead of
/// the name in the snapshot.
pub const DEFAULT_ROOT_LV_NAME: &str = "rhvh";

/// How to measure the actual size of an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SizeProbe {
    /// `lvs` reporting the LV size in MB.
    LogicalVolume { lvs: String },
    /// LV size as a percentage of its group, from `lvs` and `vgs`.
    PercentOfGroup { lvs: String, vgs: String },
    /// Raw device size in bytes.
    BlockDevice { blockdev: String },
}

/// One `df -Th` pattern per mounted entry, in key order.
pub fn mount_patterns(table: &PartitionTable, root_lv_name: &str) -> Result<Vec<Pattern>, SpecError> {
    table
        .entries
        .iter()
        .filter(|spec| spec.is_mounted())
        .map(|spec| mount_pattern(spec, table.volgroup.as_deref(), root_lv_name))
        .collect()
}

/// Pattern requiring the device, then the filesystem type, then the mount
/// point on one `df -Th` line.
pub fn mount_pattern(
    spec: &PartitionSpec,
    volgroup: Option<&str>,
    root_lv_name: &str,
) -> Result<Pattern, SpecError> {
    let path = format!("partition.{}", spec.key);
    let fstype = spec
        .fstype
        .as_deref()
        .ok_or_else(|| SpecError::missing_key(&path, "fstype"))?;

    let device = match &spec.device {
        PartitionDevice::Lvm { name, .. } => {
            let vg = volgroup.ok_or_else(|| SpecError::MissingVolumeGroup(spec.key.clone()))?;
            if spec.key == "/" {
                format!(r"{}\S*", escape(&lvm::mapper_path(vg, root_lv_name)))
            } else {
                escape(&lvm::mapper_path(vg, name))
            }
        }
        PartitionDevice::Raw { alias, .. } => {
            let alias = alias
                .as_deref()
                .ok_or_else(|| SpecError::missing_key(&path, "device_alias"))?;
            escape(alias)
        }
    };

    Ok(Pattern::Line(format!(
        r"^{}\s+{}\s.*\s{}$",
        device,
        escape(fstype),
        escape(&spec.key)
    )))
}

/// Commands that measure the actual size of `spec`.
pub fn size_probe(spec: &PartitionSpec, volgroup: Option<&str>) -> Result<SizeProbe, SpecError> {
    match &spec.device {
        PartitionDevice::Lvm { name, percent } => {
            let vg = volgroup.ok_or_else(|| SpecError::MissingVolumeGroup(spec.key.clone()))?;
            let lvs = format!(
                "lvs --noheadings -o size --unit=m --nosuffix {}",
                shell_quote(&lvm::lvm_spec(vg, name))
            );
            if *percent {
                let vgs = format!(
                    "vgs --noheadings -o size --unit=m --nosuffix {}",
                    shell_quote(vg)
                );
                Ok(SizeProbe::PercentOfGroup { lvs, vgs })
            } else {
                Ok(SizeProbe::LogicalVolume { lvs })
            }
        }
        PartitionDevice::Raw { wwid, .. } => Ok(SizeProbe::BlockDevice {
            blockdev: format!("blockdev --getsize64 {}", shell_quote(wwid)),
        }),
    }
}

/// Block device whose `blkid` output should carry the label.
pub fn label_device(spec: &PartitionSpec, volgroup: Option<&str>) -> Result<String, SpecError> {
    match &spec.device {
        PartitionDevice::Lvm { name, .. } => {
            let vg = volgroup.ok_or_else(|| SpecError::MissingVolumeGroup(spec.key.clone()))?;
            Ok(lvm::mapper_path(vg, name))
        }
        PartitionDevice::Raw { wwid, .. } => Ok(wwid.clone()),
    }
}
