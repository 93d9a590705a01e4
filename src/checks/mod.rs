//! Domain checks.
//!
//! Each check reads the expected state, probes the target, and reduces what
//! it sees to one boolean. Transport failures and unexpected output make a
//! check `false`; only a snapshot that lacks what the check needs is an
//! error ([`SpecError`]), and that aborts the whole run.
//!
//! Checks with several aspects evaluate all of them, cheapest first, so the
//! log names every aspect that failed rather than just the first.

mod network;
mod partition;
mod system;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use tracing::{info, warn};

use crate::derive::partition::DEFAULT_ROOT_LV_NAME;
use crate::derive::Pattern;
use crate::error::SpecError;
use crate::expected::ExpectedState;
use crate::matcher::{all_contained, all_lines_match};
use crate::transport::{shell_quote, CommandOutput, RemoteProbe, DEFAULT_PROBE_TIMEOUT};

/// Knobs shared by every check.
#[derive(Debug, Clone)]
pub struct CheckSettings {
    /// Ceiling for every remote command and file read.
    pub timeout: Duration,
    /// LV name prefix of the root filesystem.
    pub root_lv_name: String,
}

impl Default for CheckSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_PROBE_TIMEOUT,
            root_lv_name: DEFAULT_ROOT_LV_NAME.to_string(),
        }
    }
}

/// What a check can see: the expected state and the target.
pub struct CheckContext<'a> {
    state: &'a ExpectedState,
    probe: &'a mut dyn RemoteProbe,
    settings: &'a CheckSettings,
}

impl<'a> CheckContext<'a> {
    pub fn new(
        state: &'a ExpectedState,
        probe: &'a mut dyn RemoteProbe,
        settings: &'a CheckSettings,
    ) -> Self {
        Self {
            state,
            probe,
            settings,
        }
    }

    pub fn state(&self) -> &'a ExpectedState {
        self.state
    }

    pub fn settings(&self) -> &'a CheckSettings {
        self.settings
    }

    /// Run `command`, returning its output whatever the exit status.
    /// `None` if the command could not be run at all.
    fn run(&mut self, command: &str) -> Option<CommandOutput> {
        match self.probe.execute(command, self.settings.timeout) {
            Ok(output) => Some(output),
            Err(e) => {
                warn!(command, "probe failed: {}", e);
                None
            }
        }
    }

    /// Stdout of `command`, or `None` unless it ran and exited 0.
    fn output_of(&mut self, command: &str) -> Option<String> {
        let output = self.run(command)?;
        if output.success() {
            Some(output.stdout)
        } else {
            warn!(
                command,
                status = ?output.status,
                stderr = output.stderr.trim(),
                "command failed"
            );
            None
        }
    }

    fn read_file(&mut self, path: &str) -> Option<String> {
        match self.probe.read_remote_file(path, self.settings.timeout) {
            Ok(content) => Some(content),
            Err(e) => {
                warn!(path, "reading remote file failed: {}", e);
                None
            }
        }
    }

    /// Every pattern holds in the output of `command`.
    pub(crate) fn lines_match_in_cmd(&mut self, command: &str, patterns: &[Pattern]) -> bool {
        self.output_of(command)
            .map_or(false, |text| all_lines_match(&text, patterns))
    }

    /// Every literal appears in the output of `command`.
    pub(crate) fn contained_in_cmd<S: AsRef<str>>(&mut self, command: &str, literals: &[S]) -> bool {
        self.output_of(command)
            .map_or(false, |text| all_contained(&text, literals))
    }

    /// Every literal appears in the remote file at `path`.
    pub(crate) fn contained_in_file<S: AsRef<str>>(&mut self, path: &str, literals: &[S]) -> bool {
        self.read_file(path)
            .map_or(false, |text| all_contained(&text, literals))
    }

    /// `cat` of a remote file, for line patterns over it.
    pub(crate) fn lines_match_in_file(&mut self, path: &str, patterns: &[Pattern]) -> bool {
        self.lines_match_in_cmd(&format!("cat {}", shell_quote(path)), patterns)
    }
}

/// AND of named aspects, logging each one that failed.
fn all_aspects(check: &str, aspects: &[(&str, bool)]) -> bool {
    let mut passed = true;
    for (aspect, ok) in aspects {
        if !ok {
            info!(check, aspect, "aspect failed");
            passed = false;
        }
    }
    passed
}

/// Every check the verifier knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CheckId {
    Install,
    Partition,
    PartitionLabel,
    StaticNetwork,
    Bond,
    Vlan,
    BondVlan,
    NicStatusDuringInstall,
    DhcpNetwork,
    Hostname,
    Lang,
    Ntp,
    Keyboard,
    SecurityPolicy,
    Kdump,
    Users,
    Firewall,
    Selinux,
    Sshd,
    Grubby,
    Bootloader,
    Fips,
    Iqn,
    LayoutInit,
}

impl CheckId {
    pub const ALL: &'static [CheckId] = &[
        CheckId::Install,
        CheckId::Partition,
        CheckId::PartitionLabel,
        CheckId::StaticNetwork,
        CheckId::Bond,
        CheckId::Vlan,
        CheckId::BondVlan,
        CheckId::NicStatusDuringInstall,
        CheckId::DhcpNetwork,
        CheckId::Hostname,
        CheckId::Lang,
        CheckId::Ntp,
        CheckId::Keyboard,
        CheckId::SecurityPolicy,
        CheckId::Kdump,
        CheckId::Users,
        CheckId::Firewall,
        CheckId::Selinux,
        CheckId::Sshd,
        CheckId::Grubby,
        CheckId::Bootloader,
        CheckId::Fips,
        CheckId::Iqn,
        CheckId::LayoutInit,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CheckId::Install => "install",
            CheckId::Partition => "partition",
            CheckId::PartitionLabel => "partition_label",
            CheckId::StaticNetwork => "static_network",
            CheckId::Bond => "bond",
            CheckId::Vlan => "vlan",
            CheckId::BondVlan => "bond_vlan",
            CheckId::NicStatusDuringInstall => "nic_status_during_install",
            CheckId::DhcpNetwork => "dhcp_network",
            CheckId::Hostname => "hostname",
            CheckId::Lang => "lang",
            CheckId::Ntp => "ntp",
            CheckId::Keyboard => "keyboard",
            CheckId::SecurityPolicy => "security_policy",
            CheckId::Kdump => "kdump",
            CheckId::Users => "users",
            CheckId::Firewall => "firewall",
            CheckId::Selinux => "selinux",
            CheckId::Sshd => "sshd",
            CheckId::Grubby => "grubby",
            CheckId::Bootloader => "bootloader",
            CheckId::Fips => "fips",
            CheckId::Iqn => "iqn",
            CheckId::LayoutInit => "layout_init",
        }
    }

    /// One-line description for listings.
    pub fn summary(self) -> &'static str {
        match self {
            CheckId::Install => "nodectl reports Status: OK",
            CheckId::Partition => "mount points, filesystem types and sizes",
            CheckId::PartitionLabel => "filesystem labels (not part of partition)",
            CheckId::StaticNetwork => "static interface config, addresses and link",
            CheckId::Bond => "bond config, slaves and link",
            CheckId::Vlan => "vlan config and link",
            CheckId::BondVlan => "bond and vlan together",
            CheckId::NicStatusDuringInstall => "unused NIC stayed down",
            CheckId::DhcpNetwork => "dhcp interface config and link",
            CheckId::Hostname => "hostname",
            CheckId::Lang => "system locale",
            CheckId::Ntp => "chrony servers",
            CheckId::Keyboard => "console keymap and X11 layout",
            CheckId::SecurityPolicy => "OpenSCAP data present",
            CheckId::Kdump => "crashkernel reservation",
            CheckId::Users => "user account and home",
            CheckId::Firewall => "firewalld running",
            CheckId::Selinux => "SELinux mode",
            CheckId::Sshd => "sshd running",
            CheckId::Grubby => "default kernel entry",
            CheckId::Bootloader => "GRUB in boot sector",
            CheckId::Fips => "FIPS mode enabled",
            CheckId::Iqn => "iSCSI initiator name",
            CheckId::LayoutInit => "imgbase refuses to re-init the layout",
        }
    }

    /// Checks worth running for `state` when none are named explicitly.
    ///
    /// `partition_label`, `layout_init`, `security_policy`, `fips` and `iqn`
    /// depend on install options the snapshot does not record, so they only
    /// run when asked for.
    pub fn applicable(state: &ExpectedState) -> Vec<CheckId> {
        let mut checks = vec![CheckId::Install];

        if state.partition.is_some() {
            checks.push(CheckId::Partition);
        }

        if let Some(network) = &state.network {
            if network.static_device.is_some() {
                checks.push(CheckId::StaticNetwork);
            }
            match (network.bond.is_some(), network.vlan.is_some()) {
                (true, true) => checks.push(CheckId::BondVlan),
                (true, false) => checks.push(CheckId::Bond),
                (false, true) => checks.push(CheckId::Vlan),
                (false, false) => {}
            }
            if network.nic.is_some() {
                checks.push(CheckId::NicStatusDuringInstall);
            }
            if network.dhcp.is_some() {
                checks.push(CheckId::DhcpNetwork);
            }
            if network.hostname.is_some() {
                checks.push(CheckId::Hostname);
            }
        }

        let optional = [
            (state.lang.is_some(), CheckId::Lang),
            (state.ntp_servers.is_some(), CheckId::Ntp),
            (state.keyboard.is_some(), CheckId::Keyboard),
            (state.kdump.is_some(), CheckId::Kdump),
            (state.user.is_some(), CheckId::Users),
            (true, CheckId::Firewall),
            (state.selinux.is_some(), CheckId::Selinux),
            (true, CheckId::Sshd),
            (state.grubby.is_some(), CheckId::Grubby),
            (state.boot_device.is_some(), CheckId::Bootloader),
        ];
        checks.extend(
            optional
                .into_iter()
                .filter_map(|(present, check)| present.then_some(check)),
        );
        checks
    }

    pub fn run(self, ctx: &mut CheckContext<'_>) -> Result<bool, SpecError> {
        match self {
            CheckId::Install => Ok(system::install(ctx)),
            CheckId::Partition => partition::partition(ctx),
            CheckId::PartitionLabel => partition::partition_label(ctx),
            CheckId::StaticNetwork => network::static_network(ctx),
            CheckId::Bond => network::bond(ctx),
            CheckId::Vlan => network::vlan(ctx),
            CheckId::BondVlan => network::bond_vlan(ctx),
            CheckId::NicStatusDuringInstall => network::nic_status_during_install(ctx),
            CheckId::DhcpNetwork => network::dhcp_network(ctx),
            CheckId::Hostname => network::hostname(ctx),
            CheckId::Lang => system::lang(ctx),
            CheckId::Ntp => system::ntp(ctx),
            CheckId::Keyboard => system::keyboard(ctx),
            CheckId::SecurityPolicy => Ok(system::security_policy(ctx)),
            CheckId::Kdump => system::kdump(ctx),
            CheckId::Users => system::users(ctx),
            CheckId::Firewall => Ok(system::firewall(ctx)),
            CheckId::Selinux => system::selinux(ctx),
            CheckId::Sshd => Ok(system::sshd(ctx)),
            CheckId::Grubby => system::grubby(ctx),
            CheckId::Bootloader => system::bootloader(ctx),
            CheckId::Fips => Ok(system::fips(ctx)),
            CheckId::Iqn => Ok(system::iqn(ctx)),
            CheckId::LayoutInit => Ok(system::layout_init(ctx)),
        }
    }
}

impl fmt::Display for CheckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CheckId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        CheckId::ALL
            .iter()
            .copied()
            .find(|check| check.name() == wanted)
            .ok_or_else(|| {
                let known = CheckId::ALL
                    .iter()
                    .map(|c| c.name())
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("unknown check '{}'; expected one of: {}", s, known)
            })
    }
}
