//! Size arithmetic and sizing rules for partition entries.

use crate::expected::{PartitionSpec, SizePolicy};

/// Size of `/boot` when the installer picks it.
pub const RECOMMENDED_BOOT_MB: u64 = 1024;

/// Swap size the installer picks for hosts with 64 GiB or more.
pub const LARGE_HOST_SWAP_GIB: u64 = 4;

const MIB: u64 = 1024 * 1024;

/// Rule an entry's actual size is judged by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeRule {
    Exact(u64),
    Grow { min: u64, max: Option<u64> },
    RecommendedSwap,
    RecommendedBoot,
    /// `recommended` on an entry with no known rule. Always fails.
    Undefined,
}

pub fn size_rule(spec: &PartitionSpec) -> SizeRule {
    match spec.policy {
        SizePolicy::Exact(size) => SizeRule::Exact(size),
        SizePolicy::Grow { min, max } => SizeRule::Grow { min, max },
        SizePolicy::Recommended => match spec.key.as_str() {
            "swap" => SizeRule::RecommendedSwap,
            "/boot" => SizeRule::RecommendedBoot,
            _ => SizeRule::Undefined,
        },
    }
}

/// Judge `actual_mb` against a literal rule.
///
/// Returns `None` for [`SizeRule::RecommendedSwap`], which depends on the
/// host's memory rather than on the entry's own size.
pub fn literal_size_ok(rule: SizeRule, actual_mb: u64) -> Option<bool> {
    match rule {
        SizeRule::Exact(size) => Some(actual_mb == size),
        SizeRule::Grow { min, max } => Some(actual_mb > min && max.map_or(true, |max| actual_mb <= max)),
        SizeRule::RecommendedBoot => Some(actual_mb == RECOMMENDED_BOOT_MB),
        SizeRule::Undefined => Some(false),
        SizeRule::RecommendedSwap => None,
    }
}

/// Whether a swap size follows the installer's recommendation for the
/// given memory size, both in whole GiB as `free -g` reports them.
///
/// | memory        | rule                         |
/// |---------------|------------------------------|
/// | < 2 GiB       | swap / memory rounds to 2    |
/// | 2 to < 8 GiB  | not checked                  |
/// | 8 to < 64 GiB | memory / swap rounds to 2    |
/// | >= 64 GiB     | swap is exactly 4 GiB        |
pub fn recommended_swap_ok(memory_gib: u64, swap_gib: u64) -> bool {
    if memory_gib < 2 {
        if memory_gib == 0 {
            return false;
        }
        (swap_gib as f64 / memory_gib as f64).round() as u64 == 2
    } else if memory_gib < 8 {
        // free -g truncates, so the installer's sizing can't be reproduced here
        true
    } else if memory_gib < 64 {
        if swap_gib == 0 {
            return false;
        }
        (memory_gib as f64 / swap_gib as f64).round() as u64 == 2
    } else {
        swap_gib == LARGE_HOST_SWAP_GIB
    }
}

/// `round(lv * 100 / vg)`, the LV's share of its group in percent.
pub fn percent_of_group(lv_mb: f64, vg_mb: f64) -> Option<u64> {
    if vg_mb <= 0.0 || lv_mb < 0.0 {
        return None;
    }
    Some((lv_mb * 100.0 / vg_mb).round() as u64)
}

/// First size in `lvs`/`vgs` output (`  6000.00`), in MB.
pub fn parse_lvm_mb(output: &str) -> Option<f64> {
    output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .and_then(|line| line.parse::<f64>().ok())
        .filter(|mb| *mb >= 0.0)
}

/// Whole MB of an `lvs` size, fractional part dropped.
pub fn truncate_mb(mb: f64) -> u64 {
    mb.trunc() as u64
}

/// MB of a `blockdev --getsize64` byte count.
pub fn parse_block_device_mb(output: &str) -> Option<u64> {
    output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && line.chars().all(|c| c.is_ascii_digit()))
        .and_then(|line| line.parse::<u64>().ok())
        .map(|bytes| bytes / MIB)
}

/// Total memory and swap in GiB from `free -g`.
pub fn parse_free_gib(output: &str) -> Option<(u64, u64)> {
    let mut memory = None;
    let mut swap = None;
    for line in output.lines() {
        let mut fields = line.split_whitespace();
        match fields.next() {
            Some("Mem:") => memory = fields.next().and_then(|v| v.parse().ok()),
            Some("Swap:") => swap = fields.next().and_then(|v| v.parse().ok()),
            _ => {}
        }
    }
    Some((memory?, swap?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expected::PartitionDevice;

    fn spec(key: &str, policy: SizePolicy) -> PartitionSpec {
        PartitionSpec {
            key: key.into(),
            fstype: Some("ext4".into()),
            policy,
            label: None,
            device: PartitionDevice::Lvm {
                name: "lv".into(),
                percent: false,
            },
        }
    }

    #[test]
    fn test_grow_requires_strictly_more_than_nominal() {
        let rule = size_rule(&spec("/", SizePolicy::Grow { min: 6000, max: None }));
        assert_eq!(literal_size_ok(rule, 6000), Some(false));
        assert_eq!(literal_size_ok(rule, 6001), Some(true));
    }

    #[test]
    fn test_grow_is_bounded_by_maxsize() {
        let rule = SizeRule::Grow {
            min: 1000,
            max: Some(2000),
        };
        assert_eq!(literal_size_ok(rule, 2000), Some(true));
        assert_eq!(literal_size_ok(rule, 2001), Some(false));
    }

    #[test]
    fn test_exact_size() {
        let rule = size_rule(&spec("/home", SizePolicy::Exact(1024)));
        assert_eq!(literal_size_ok(rule, 1024), Some(true));
        assert_eq!(literal_size_ok(rule, 1025), Some(false));
    }

    #[test]
    fn test_recommended_rules_by_key() {
        assert_eq!(
            size_rule(&spec("swap", SizePolicy::Recommended)),
            SizeRule::RecommendedSwap
        );
        assert_eq!(
            size_rule(&spec("/boot", SizePolicy::Recommended)),
            SizeRule::RecommendedBoot
        );
        assert_eq!(literal_size_ok(SizeRule::RecommendedBoot, 1024), Some(true));
        assert_eq!(literal_size_ok(SizeRule::RecommendedBoot, 1000), Some(false));
        assert_eq!(literal_size_ok(SizeRule::RecommendedSwap, 1), None);
    }

    #[test]
    fn test_recommended_without_rule_fails_closed() {
        let rule = size_rule(&spec("/var", SizePolicy::Recommended));
        assert_eq!(rule, SizeRule::Undefined);
        assert_eq!(literal_size_ok(rule, 0), Some(false));
        assert_eq!(literal_size_ok(rule, 15360), Some(false));
    }

    #[test]
    fn test_swap_tiers() {
        assert!(recommended_swap_ok(1, 2));
        assert!(!recommended_swap_ok(1, 1));
        assert!(recommended_swap_ok(4, 0));
        assert!(recommended_swap_ok(4, 17));
        assert!(recommended_swap_ok(16, 8));
        assert!(!recommended_swap_ok(16, 16));
        assert!(recommended_swap_ok(128, 4));
        assert!(!recommended_swap_ok(128, 8));
        assert!(recommended_swap_ok(64, 4));
    }

    #[test]
    fn test_swap_with_no_measurable_memory_fails() {
        assert!(!recommended_swap_ok(0, 2));
        assert!(!recommended_swap_ok(16, 0));
    }

    #[test]
    fn test_percent_of_group_rounds() {
        assert_eq!(percent_of_group(14999.0, 100000.0), Some(15));
        assert_eq!(percent_of_group(1250.0, 10000.0), Some(13));
        assert_eq!(percent_of_group(1.0, 0.0), None);
    }

    #[test]
    fn test_parse_lvm_mb() {
        assert_eq!(parse_lvm_mb("  6000.00\n"), Some(6000.0));
        assert_eq!(parse_lvm_mb("\n  1023.99\n").map(truncate_mb), Some(1023));
        assert_eq!(parse_lvm_mb("  1023.99m"), None);
        assert_eq!(parse_lvm_mb("  Volume group \"x\" not found"), None);
    }

    #[test]
    fn test_parse_block_device_mb() {
        assert_eq!(parse_block_device_mb("1073741824\n"), Some(1024));
        assert_eq!(parse_block_device_mb("blockdev: cannot open\n"), None);
    }

    #[test]
    fn test_parse_free_gib() {
        let free = "              total        used        free      shared  buff/cache   available\n\
                    Mem:             15           2          10           0           2          12\n\
                    Swap:             7           0           7\n";
        assert_eq!(parse_free_gib(free), Some((15, 7)));
        assert_eq!(parse_free_gib("Mem: 15 2 10\n"), None);
    }
}
