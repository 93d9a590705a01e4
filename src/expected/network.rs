//! Expected network devices, one per device role.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value};

use super::scalar_string;
use crate::error::SpecError;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct RawNetwork {
    #[serde(rename = "static")]
    static_device: Option<Map<String, Value>>,
    bond: Option<Map<String, Value>>,
    vlan: Option<Map<String, Value>>,
    nic: Option<Map<String, Value>>,
    dhcp: Option<Map<String, Value>>,
    hostname: Option<String>,
}

/// The interface-configuration fields expected for one device.
///
/// `ifcfg` holds every uppercase key of the snapshot entry, `DEVICE`
/// included, rendered as the value expected on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    pub device: String,
    pub ifcfg: BTreeMap<String, String>,
}

/// Statically addressed interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticDevice {
    pub config: DeviceConfig,
    pub ipv4: Option<String>,
    pub ipv6: Option<String>,
}

/// Bond master and the slaves it must enslave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BondDevice {
    pub config: DeviceConfig,
    pub slaves: Vec<String>,
}

/// Plain interface that should stay down after install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NicDevice {
    pub config: DeviceConfig,
    /// Whether the device was brought up during installation.
    pub active_during_install: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkSpec {
    pub static_device: Option<StaticDevice>,
    pub bond: Option<BondDevice>,
    pub vlan: Option<DeviceConfig>,
    pub nic: Option<NicDevice>,
    pub dhcp: Option<DeviceConfig>,
    pub hostname: Option<String>,
}

impl NetworkSpec {
    pub fn static_device(&self) -> Result<&StaticDevice, SpecError> {
        role(&self.static_device, "static")
    }

    pub fn bond(&self) -> Result<&BondDevice, SpecError> {
        role(&self.bond, "bond")
    }

    pub fn vlan(&self) -> Result<&DeviceConfig, SpecError> {
        role(&self.vlan, "vlan")
    }

    pub fn nic(&self) -> Result<&NicDevice, SpecError> {
        role(&self.nic, "nic")
    }

    pub fn dhcp(&self) -> Result<&DeviceConfig, SpecError> {
        role(&self.dhcp, "dhcp")
    }

    pub fn hostname(&self) -> Result<&str, SpecError> {
        role(&self.hostname, "hostname").map(String::as_str)
    }
}

fn role<'a, T>(value: &'a Option<T>, name: &str) -> Result<&'a T, SpecError> {
    value
        .as_ref()
        .ok_or_else(|| SpecError::MissingDomain(format!("network.{}", name)))
}

/// True for keys that name an interface-configuration field.
///
/// Matches keys with at least one cased character and no lowercase ones,
/// so `IPV6ADDR` qualifies and `slaves` does not.
pub fn is_ifcfg_key(key: &str) -> bool {
    key.chars().any(char::is_uppercase) && !key.chars().any(char::is_lowercase)
}

pub(crate) fn parse_network(raw: RawNetwork) -> Result<NetworkSpec, SpecError> {
    let static_device = raw
        .static_device
        .map(|map| {
            let config = parse_device("network.static", &map)?;
            Ok::<_, SpecError>(StaticDevice {
                ipv4: config.ifcfg.get("IPADDR").cloned(),
                ipv6: config.ifcfg.get("IPV6ADDR").cloned(),
                config,
            })
        })
        .transpose()?;

    let bond = raw
        .bond
        .map(|map| {
            let config = parse_device("network.bond", &map)?;
            let slaves = parse_slaves(&map)?;
            Ok::<_, SpecError>(BondDevice { config, slaves })
        })
        .transpose()?;

    let vlan = raw
        .vlan
        .map(|map| parse_device("network.vlan", &map))
        .transpose()?;

    let nic = raw
        .nic
        .map(|map| -> Result<NicDevice, SpecError> {
            let config = parse_device("network.nic", &map)?;
            let active_during_install = match map.get("status") {
                None | Some(Value::Null) => false,
                Some(Value::Bool(b)) => *b,
                Some(_) => {
                    return Err(SpecError::invalid(
                        "network.nic",
                        "status",
                        "expected a boolean",
                    ))
                }
            };
            Ok(NicDevice {
                config,
                active_during_install,
            })
        })
        .transpose()?;

    let dhcp = raw
        .dhcp
        .map(|map| parse_device("network.dhcp", &map))
        .transpose()?;

    Ok(NetworkSpec {
        static_device,
        bond,
        vlan,
        nic,
        dhcp,
        hostname: raw.hostname,
    })
}

fn parse_device(path: &str, map: &Map<String, Value>) -> Result<DeviceConfig, SpecError> {
    let mut ifcfg = BTreeMap::new();
    for (key, value) in map {
        if !is_ifcfg_key(key) {
            continue;
        }
        let rendered = scalar_string(value)
            .ok_or_else(|| SpecError::invalid(path, key.as_str(), "expected a scalar value"))?;
        ifcfg.insert(key.clone(), rendered);
    }

    let device = match ifcfg.get("DEVICE") {
        Some(device) if !device.is_empty() => device.clone(),
        _ => return Err(SpecError::missing_key(path, "DEVICE")),
    };

    Ok(DeviceConfig { device, ifcfg })
}

fn parse_slaves(map: &Map<String, Value>) -> Result<Vec<String>, SpecError> {
    let Some(value) = map.get("slaves") else {
        return Err(SpecError::missing_key("network.bond", "slaves"));
    };
    let Value::Array(items) = value else {
        return Err(SpecError::invalid(
            "network.bond",
            "slaves",
            "expected a list of device names",
        ));
    };
    items
        .iter()
        .map(|item| {
            item.as_str().map(str::to_string).ok_or_else(|| {
                SpecError::invalid("network.bond", "slaves", "expected a list of device names")
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<NetworkSpec, SpecError> {
        let raw: RawNetwork = serde_json::from_str(json).unwrap();
        parse_network(raw)
    }

    #[test]
    fn test_is_ifcfg_key() {
        assert!(is_ifcfg_key("DEVICE"));
        assert!(is_ifcfg_key("IPV6ADDR"));
        assert!(is_ifcfg_key("BONDING_OPTS"));
        assert!(!is_ifcfg_key("slaves"));
        assert!(!is_ifcfg_key("Status"));
        assert!(!is_ifcfg_key("1234"));
    }

    #[test]
    fn test_static_device_keeps_uppercase_fields_only() {
        let spec = parse(
            r#"{"static": {"DEVICE": "em1", "IPADDR": "10.0.0.5", "PREFIX": 24,
                           "ONBOOT": "yes", "note": "lab"}}"#,
        )
        .unwrap();
        let dev = spec.static_device().unwrap();
        assert_eq!(dev.config.device, "em1");
        assert_eq!(dev.ipv4.as_deref(), Some("10.0.0.5"));
        assert_eq!(dev.ipv6, None);
        assert_eq!(dev.config.ifcfg.get("PREFIX").map(String::as_str), Some("24"));
        assert!(!dev.config.ifcfg.contains_key("note"));
    }

    #[test]
    fn test_device_without_device_key_is_malformed() {
        let err = parse(r#"{"vlan": {"VLAN": "yes"}}"#).unwrap_err();
        assert_eq!(err, SpecError::missing_key("network.vlan", "DEVICE"));
    }

    #[test]
    fn test_bond_requires_slave_list() {
        let err = parse(r#"{"bond": {"DEVICE": "bond0"}}"#).unwrap_err();
        assert_eq!(err, SpecError::missing_key("network.bond", "slaves"));

        let spec = parse(r#"{"bond": {"DEVICE": "bond0", "slaves": ["p1p1", "p1p2"]}}"#).unwrap();
        assert_eq!(spec.bond().unwrap().slaves, vec!["p1p1", "p1p2"]);
    }

    #[test]
    fn test_nic_status_defaults_to_inactive() {
        let spec = parse(r#"{"nic": {"DEVICE": "em2", "ONBOOT": "no"}}"#).unwrap();
        assert!(!spec.nic().unwrap().active_during_install);
    }

    #[test]
    fn test_missing_role_names_network_path() {
        let spec = parse("{}").unwrap();
        assert_eq!(
            spec.dhcp().unwrap_err(),
            SpecError::MissingDomain("network.dhcp".into())
        );
    }
}
