//! Device-mapper naming for LVM logical volumes.
//!
//! Device-mapper joins the volume group and logical volume names with a
//! single `-`, so any `-` inside either name is doubled first. `rhvh/var-log`
//! becomes `/dev/mapper/rhvh-var--log`, and `my-vg/root` becomes
//! `/dev/mapper/my--vg-root`.

const MAPPER_DIR: &str = "/dev/mapper";

/// Escape one VG or LV name for use in a device-mapper name.
pub fn mangle(name: &str) -> String {
    name.replace('-', "--")
}

/// `/dev/mapper/<vg>`, the prefix shared by every LV of the group.
pub fn mapper_prefix(volgroup: &str) -> String {
    format!("{}/{}", MAPPER_DIR, mangle(volgroup))
}

/// Full device-mapper path of a logical volume.
pub fn mapper_path(volgroup: &str, volume: &str) -> String {
    format!("{}-{}", mapper_prefix(volgroup), mangle(volume))
}

/// `<vg>/<lv>`, the form LVM tools accept.
pub fn lvm_spec(volgroup: &str, volume: &str) -> String {
    format!("{}/{}", volgroup, volume)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_names() {
        assert_eq!(mapper_path("rhvh", "var"), "/dev/mapper/rhvh-var");
    }

    #[test]
    fn test_dashes_are_doubled_on_both_sides() {
        assert_eq!(mapper_path("my-vg", "var-log"), "/dev/mapper/my--vg-var--log");
        assert_eq!(mapper_prefix("a-b-c"), "/dev/mapper/a--b--c");
    }

    #[test]
    fn test_lvm_spec_keeps_raw_names() {
        assert_eq!(lvm_spec("my-vg", "var-log"), "my-vg/var-log");
    }
}
