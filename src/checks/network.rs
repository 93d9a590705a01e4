//! Network checks: interface configuration, addresses, link and bond state.

use super::{all_aspects, CheckContext};
use crate::derive::network::{
    bond_membership_patterns, ifcfg_path, ifcfg_patterns, ipv4_pattern, ipv6_pattern,
    link_state_patterns, LinkState, Membership,
};
use crate::error::SpecError;
use crate::expected::DeviceConfig;
use crate::transport::shell_quote;

const DEVICE_STATES: &str = "nmcli -t -f DEVICE,STATE dev";

fn ifcfg_matches(ctx: &mut CheckContext<'_>, config: &DeviceConfig) -> bool {
    ctx.lines_match_in_file(&ifcfg_path(&config.device), &ifcfg_patterns(config))
}

fn link_is<S: AsRef<str>>(ctx: &mut CheckContext<'_>, devices: &[S], state: LinkState) -> bool {
    ctx.lines_match_in_cmd(DEVICE_STATES, &link_state_patterns(devices, state))
}

fn ipv4_assigned(ctx: &mut CheckContext<'_>, device: &str, address: Option<&str>) -> bool {
    match address {
        Some(address) => ctx.lines_match_in_cmd(
            &format!("ip -f inet addr show {}", shell_quote(device)),
            &[ipv4_pattern(address)],
        ),
        None => true,
    }
}

fn ipv6_assigned(ctx: &mut CheckContext<'_>, device: &str, address: Option<&str>) -> bool {
    match address {
        Some(address) => ctx.lines_match_in_cmd(
            &format!("ip -f inet6 addr show {}", shell_quote(device)),
            &[ipv6_pattern(address)],
        ),
        None => true,
    }
}

pub(super) fn static_network(ctx: &mut CheckContext<'_>) -> Result<bool, SpecError> {
    let device = ctx.state().network()?.static_device()?;
    let name = device.config.device.as_str();

    let ifcfg = ifcfg_matches(ctx, &device.config);
    let ipv4 = ipv4_assigned(ctx, name, device.ipv4.as_deref());
    let ipv6 = ipv6_assigned(ctx, name, device.ipv6.as_deref());
    let link = link_is(ctx, &[name], LinkState::Up);

    Ok(all_aspects(
        "static_network",
        &[("ifcfg", ifcfg), ("ipv4", ipv4), ("ipv6", ipv6), ("link", link)],
    ))
}

pub(super) fn bond(ctx: &mut CheckContext<'_>) -> Result<bool, SpecError> {
    let bond = ctx.state().network()?.bond()?;
    let name = bond.config.device.as_str();

    let ifcfg = ifcfg_matches(ctx, &bond.config);
    let slaves = ctx.lines_match_in_file(
        &format!("/proc/net/bonding/{}", name),
        &bond_membership_patterns(&bond.slaves, Membership::Enslaved),
    );

    let mut devices = vec![name];
    devices.extend(bond.slaves.iter().map(String::as_str));
    let link = link_is(ctx, &devices, LinkState::Up);

    Ok(all_aspects(
        "bond",
        &[("ifcfg", ifcfg), ("slaves", slaves), ("link", link)],
    ))
}

pub(super) fn vlan(ctx: &mut CheckContext<'_>) -> Result<bool, SpecError> {
    let vlan = ctx.state().network()?.vlan()?;

    let ifcfg = ifcfg_matches(ctx, vlan);
    let link = link_is(ctx, &[vlan.device.as_str()], LinkState::Up);

    Ok(all_aspects("vlan", &[("ifcfg", ifcfg), ("link", link)]))
}

pub(super) fn bond_vlan(ctx: &mut CheckContext<'_>) -> Result<bool, SpecError> {
    let bond = bond(ctx)?;
    let vlan = vlan(ctx)?;
    Ok(all_aspects("bond_vlan", &[("bond", bond), ("vlan", vlan)]))
}

pub(super) fn nic_status_during_install(ctx: &mut CheckContext<'_>) -> Result<bool, SpecError> {
    let nic = ctx.state().network()?.nic()?;

    let inactive = !nic.active_during_install;
    let ifcfg = ifcfg_matches(ctx, &nic.config);
    let link = link_is(ctx, &[nic.config.device.as_str()], LinkState::Disconnected);

    Ok(all_aspects(
        "nic_status_during_install",
        &[
            ("inactive during install", inactive),
            ("ifcfg", ifcfg),
            ("link", link),
        ],
    ))
}

pub(super) fn dhcp_network(ctx: &mut CheckContext<'_>) -> Result<bool, SpecError> {
    let dhcp = ctx.state().network()?.dhcp()?;

    let ifcfg = ifcfg_matches(ctx, dhcp);
    let link = link_is(ctx, &[dhcp.device.as_str()], LinkState::Up);

    Ok(all_aspects("dhcp_network", &[("ifcfg", ifcfg), ("link", link)]))
}

pub(super) fn hostname(ctx: &mut CheckContext<'_>) -> Result<bool, SpecError> {
    let hostname = ctx.state().network()?.hostname()?;
    Ok(ctx.contained_in_cmd("hostname", &[hostname]))
}
