//! Checks on system settings and services.

use tracing::info;

use super::{all_aspects, CheckContext};
use crate::derive::Pattern;
use crate::error::SpecError;
use crate::transport::shell_quote;

const LAYOUT_ALREADY_INITIALIZED: &[&str] = &[
    "Looks like the system already has imgbase working properly.",
    "However, imgbase was called with --init.",
];

pub(super) fn install(ctx: &mut CheckContext<'_>) -> bool {
    ctx.lines_match_in_cmd("nodectl check", &[Pattern::Line("^Status: OK".into())])
}

pub(super) fn lang(ctx: &mut CheckContext<'_>) -> Result<bool, SpecError> {
    let lang = ctx.state().lang()?;
    Ok(ctx.contained_in_cmd("localectl status", &[lang]))
}

pub(super) fn ntp(ctx: &mut CheckContext<'_>) -> Result<bool, SpecError> {
    let servers = ctx.state().ntp_servers()?;
    Ok(ctx.contained_in_file("/etc/chrony.conf", &[servers]))
}

pub(super) fn keyboard(ctx: &mut CheckContext<'_>) -> Result<bool, SpecError> {
    let keyboard = ctx.state().keyboard()?;
    Ok(ctx.contained_in_cmd(
        "localectl status",
        &[
            format!("VC Keymap: {}", keyboard.vc_keymap),
            format!("X11 Layout: {}", keyboard.x_layouts),
        ],
    ))
}

pub(super) fn security_policy(ctx: &mut CheckContext<'_>) -> bool {
    ctx.contained_in_cmd("ls /root", &["openscap_data"])
}

pub(super) fn kdump(ctx: &mut CheckContext<'_>) -> Result<bool, SpecError> {
    let kdump = ctx.state().kdump()?;
    Ok(ctx.contained_in_file(
        "/etc/grub2.cfg",
        &[format!("crashkernel={}M", kdump.reserve_mb)],
    ))
}

pub(super) fn users(ctx: &mut CheckContext<'_>) -> Result<bool, SpecError> {
    let user = ctx.state().user()?;

    let passwd = ctx.contained_in_file("/etc/passwd", &[user]);
    let shadow = ctx.contained_in_file("/etc/shadow", &[user]);
    let home = ctx.lines_match_in_cmd(
        "ls /home",
        &[Pattern::Line(format!("^{}$", regex::escape(user)))],
    );

    Ok(all_aspects(
        "users",
        &[("passwd", passwd), ("shadow", shadow), ("home", home)],
    ))
}

pub(super) fn firewall(ctx: &mut CheckContext<'_>) -> bool {
    ctx.contained_in_cmd("firewall-cmd --state", &["running"])
}

pub(super) fn selinux(ctx: &mut CheckContext<'_>) -> Result<bool, SpecError> {
    let mode = ctx.state().selinux()?;
    Ok(ctx.contained_in_file("/etc/selinux/config", &[format!("SELINUX={}", mode)]))
}

pub(super) fn sshd(ctx: &mut CheckContext<'_>) -> bool {
    ctx.contained_in_cmd("systemctl status sshd", &["running"])
}

pub(super) fn grubby(ctx: &mut CheckContext<'_>) -> Result<bool, SpecError> {
    let entry = ctx.state().grubby()?;
    Ok(ctx.contained_in_cmd("grubby --info=0", &[entry]))
}

pub(super) fn bootloader(ctx: &mut CheckContext<'_>) -> Result<bool, SpecError> {
    let device = ctx.state().boot_device()?;
    let command = format!(
        "dd if={} bs=512 count=1 2>/dev/null | strings | grep -i grub",
        shell_quote(device)
    );
    Ok(ctx.contained_in_cmd(&command, &["GRUB"]))
}

pub(super) fn fips(ctx: &mut CheckContext<'_>) -> bool {
    ctx.contained_in_file("/proc/sys/crypto/fips_enabled", &["1"])
}

pub(super) fn iqn(ctx: &mut CheckContext<'_>) -> bool {
    ctx.contained_in_file("/etc/iscsi/initiatorname.iscsi", &["iqn"])
}

/// `imgbase layout --init` must refuse to run on an installed system.
pub(super) fn layout_init(ctx: &mut CheckContext<'_>) -> bool {
    let Some(output) = ctx.run("imgbase layout --init") else {
        return false;
    };
    if output.success() {
        info!("imgbase layout --init succeeded on an installed system");
        return false;
    }
    let text = output.combined();
    let refused = LAYOUT_ALREADY_INITIALIZED
        .iter()
        .all(|message| text.contains(message));
    if !refused {
        info!(status = ?output.status, "imgbase layout --init failed for another reason");
    }
    refused
}
