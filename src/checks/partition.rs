//! Partition checks: mounts and filesystem types, sizes, labels.

use tracing::{debug, info, warn};

use super::{all_aspects, CheckContext};
use crate::derive::partition::{label_device, mount_patterns, size_probe, SizeProbe};
use crate::derive::size::{
    literal_size_ok, parse_block_device_mb, parse_free_gib, parse_lvm_mb, percent_of_group,
    recommended_swap_ok, size_rule, truncate_mb, SizeRule,
};
use crate::error::SpecError;
use crate::expected::{PartitionSpec, PartitionTable};
use crate::transport::shell_quote;

pub(super) fn partition(ctx: &mut CheckContext<'_>) -> Result<bool, SpecError> {
    let table = ctx.state().partition()?;

    let mounts = mounts_match(ctx, table)?;
    let sizes = sizes_match(ctx, table)?;

    Ok(all_aspects("partition", &[("mounts", mounts), ("sizes", sizes)]))
}

fn mounts_match(ctx: &mut CheckContext<'_>, table: &PartitionTable) -> Result<bool, SpecError> {
    let patterns = mount_patterns(table, &ctx.settings().root_lv_name)?;
    Ok(ctx.lines_match_in_cmd("df -Th", &patterns))
}

fn sizes_match(ctx: &mut CheckContext<'_>, table: &PartitionTable) -> Result<bool, SpecError> {
    let mut passed = true;
    for spec in &table.entries {
        if !size_matches(ctx, spec, table.volgroup.as_deref())? {
            info!(entry = %spec.key, "size does not match");
            passed = false;
        }
    }
    Ok(passed)
}

fn size_matches(
    ctx: &mut CheckContext<'_>,
    spec: &PartitionSpec,
    volgroup: Option<&str>,
) -> Result<bool, SpecError> {
    let rule = size_rule(spec);
    if rule == SizeRule::Undefined {
        warn!(entry = %spec.key, "recommended size has no known rule");
        return Ok(false);
    }

    let probe = size_probe(spec, volgroup)?;
    let Some(actual_mb) = measure(ctx, &probe) else {
        warn!(entry = %spec.key, "could not measure size");
        return Ok(false);
    };
    debug!(entry = %spec.key, actual_mb, ?rule, "measured size");

    Ok(match literal_size_ok(rule, actual_mb) {
        Some(ok) => ok,
        None => swap_follows_memory(ctx),
    })
}

/// Actual size in MB, or percent of the group for percent-sized LVs.
fn measure(ctx: &mut CheckContext<'_>, probe: &SizeProbe) -> Option<u64> {
    match probe {
        SizeProbe::LogicalVolume { lvs } => {
            let output = ctx.output_of(lvs)?;
            parse_lvm_mb(&output).map(truncate_mb)
        }
        SizeProbe::PercentOfGroup { lvs, vgs } => {
            let lv_mb = parse_lvm_mb(&ctx.output_of(lvs)?)?;
            let vg_mb = parse_lvm_mb(&ctx.output_of(vgs)?)?;
            percent_of_group(lv_mb, vg_mb)
        }
        SizeProbe::BlockDevice { blockdev } => parse_block_device_mb(&ctx.output_of(blockdev)?),
    }
}

fn swap_follows_memory(ctx: &mut CheckContext<'_>) -> bool {
    let Some((memory_gib, swap_gib)) = ctx.output_of("free -g").as_deref().and_then(parse_free_gib)
    else {
        warn!("could not read memory and swap totals");
        return false;
    };
    let ok = recommended_swap_ok(memory_gib, swap_gib);
    debug!(memory_gib, swap_gib, ok, "recommended swap");
    ok
}

/// Every labeled entry carries its label. Not part of [`partition`].
pub(super) fn partition_label(ctx: &mut CheckContext<'_>) -> Result<bool, SpecError> {
    let table = ctx.state().partition()?;

    let mut passed = true;
    for spec in &table.entries {
        let Some(label) = spec.label.as_deref() else {
            continue;
        };
        let device = label_device(spec, table.volgroup.as_deref())?;
        if !ctx.contained_in_cmd(&format!("blkid {}", shell_quote(&device)), &[label]) {
            info!(entry = %spec.key, label, "label not found");
            passed = false;
        }
    }
    Ok(passed)
}
