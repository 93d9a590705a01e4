//! Patterns for interface configuration, addresses, link and bond state.

use regex::escape;

use super::Pattern;
use crate::expected::DeviceConfig;

/// Expected `nmcli` link state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// `connected`, or still `connecting`.
    Up,
    Disconnected,
}

/// Expected bond membership of a slave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    Enslaved,
    NotEnslaved,
}

/// On-disk interface configuration file for `device`.
pub fn ifcfg_path(device: &str) -> String {
    format!("/etc/sysconfig/network-scripts/ifcfg-{}", device)
}

/// One `^KEY="?VALUE"?$` pattern per configured field, in key order.
pub fn ifcfg_patterns(config: &DeviceConfig) -> Vec<Pattern> {
    config
        .ifcfg
        .iter()
        .map(|(key, value)| Pattern::Line(format!(r#"^{}="?{}"?$"#, escape(key), escape(value))))
        .collect()
}

/// Patterns over `nmcli -t -f DEVICE,STATE dev`, one per device.
pub fn link_state_patterns<S: AsRef<str>>(devices: &[S], state: LinkState) -> Vec<Pattern> {
    devices
        .iter()
        .map(|device| {
            let device = escape(device.as_ref());
            match state {
                LinkState::Up => Pattern::Line(format!("^{}:(connected|connecting)", device)),
                LinkState::Disconnected => Pattern::Line(format!("^{}:disconnected$", device)),
            }
        })
        .collect()
}

/// Patterns over `/proc/net/bonding/<bond>`.
///
/// An enslaved slave needs its own `Slave Interface:` line. A slave that
/// must not be enslaved yields an unanchored [`Pattern::Absent`]: any line
/// mentioning `Slave` followed by the name, `Currently Active Slave:`
/// included, counts against it.
pub fn bond_membership_patterns<S: AsRef<str>>(slaves: &[S], membership: Membership) -> Vec<Pattern> {
    slaves
        .iter()
        .map(|slave| {
            let slave = escape(slave.as_ref());
            match membership {
                Membership::Enslaved => Pattern::Line(format!(r"^Slave\b.*\s{}$", slave)),
                Membership::NotEnslaved => Pattern::Absent(format!("Slave.*{}", slave)),
            }
        })
        .collect()
}

/// Pattern over `ip -f inet addr show <dev>`.
pub fn ipv4_pattern(address: &str) -> Pattern {
    Pattern::Line(format!(r"^inet\s+{}(/|\s|$)", escape(address)))
}

/// Pattern over `ip -f inet6 addr show <dev>`.
pub fn ipv6_pattern(address: &str) -> Pattern {
    Pattern::Line(format!(r"^inet6\s+{}(/|\s|$)", escape(address)))
}
