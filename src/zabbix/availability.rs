//! Host availability from the redundant Zabbix flags
//!
//! Zabbix reports availability at three levels (host, per subsystem, per
//! interface) and they can disagree. The order below decides.

use serde::Deserialize;

use super::rpc::de_string;
use crate::models::HostStatus;

/// The subset of a `host.get` row needed to judge availability.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawHost {
    #[serde(default, deserialize_with = "de_string")]
    pub hostid: String,
    #[serde(default, deserialize_with = "de_string")]
    pub host: String,
    #[serde(default, deserialize_with = "de_string")]
    pub name: String,
    #[serde(default, deserialize_with = "de_string")]
    pub description: String,
    /// "0" monitored, "1" disabled
    #[serde(default, deserialize_with = "de_string")]
    pub status: String,

    #[serde(default, deserialize_with = "de_string")]
    pub error: String,
    #[serde(default, deserialize_with = "de_string")]
    pub snmp_error: String,
    #[serde(default, deserialize_with = "de_string")]
    pub ipmi_error: String,
    #[serde(default, deserialize_with = "de_string")]
    pub jmx_error: String,

    #[serde(default, deserialize_with = "de_string")]
    pub available: String,
    #[serde(default, deserialize_with = "de_string")]
    pub snmp_available: String,
    #[serde(default, deserialize_with = "de_string")]
    pub ipmi_available: String,
    #[serde(default, deserialize_with = "de_string")]
    pub jmx_available: String,

    #[serde(default)]
    pub interfaces: Vec<RawInterface>,
    #[serde(default)]
    pub hostgroups: Vec<RawGroup>,
    #[serde(default)]
    pub groups: Vec<RawGroup>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawInterface {
    #[serde(default, deserialize_with = "de_string")]
    pub interfaceid: String,
    #[serde(default, deserialize_with = "de_string")]
    pub ip: String,
    #[serde(default, deserialize_with = "de_string")]
    pub dns: String,
    #[serde(default, deserialize_with = "de_string")]
    pub port: String,
    /// 1 agent, 2 SNMP, 3 IPMI, 4 JMX
    #[serde(default, rename = "type", deserialize_with = "de_string")]
    pub kind: String,
    #[serde(default, deserialize_with = "de_string")]
    pub main: String,
    #[serde(default, deserialize_with = "de_string")]
    pub useip: String,
    #[serde(default, deserialize_with = "de_string")]
    pub available: String,
    #[serde(default, deserialize_with = "de_string")]
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawGroup {
    #[serde(default, deserialize_with = "de_string")]
    pub groupid: String,
    #[serde(default, deserialize_with = "de_string")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Availability {
    pub status: HostStatus,
    /// "0" unknown, "1" available, "2" unavailable
    pub active_available: &'static str,
    /// Error text reported by Zabbix, empty when there is none
    pub reason: String,
}

impl Availability {
    fn new(status: HostStatus, active_available: &'static str, reason: impl Into<String>) -> Self {
        Self {
            status,
            active_available,
            reason: reason.into(),
        }
    }
}

pub fn determine_availability(host: &RawHost) -> Availability {
    if host.status == "1" {
        return Availability::new(HostStatus::Unknown, "0", "");
    }

    let explicit_error = [
        host.error.as_str(),
        host.snmp_error.as_str(),
        host.ipmi_error.as_str(),
        host.jmx_error.as_str(),
    ]
    .into_iter()
    .chain(host.interfaces.iter().map(|iface| iface.error.as_str()))
    .map(str::trim)
    .find(|error| !error.is_empty());

    if let Some(error) = explicit_error {
        return Availability::new(HostStatus::Down, "2", error);
    }

    if host.interfaces.iter().any(|iface| iface.available == "2") {
        return Availability::new(HostStatus::Down, "2", "");
    }

    let host_flags = [
        host.available.as_str(),
        host.snmp_available.as_str(),
        host.ipmi_available.as_str(),
        host.jmx_available.as_str(),
    ];

    if host_flags.contains(&"2") {
        return Availability::new(HostStatus::Down, "2", "");
    }

    let any_up = host_flags.contains(&"1")
        || host.interfaces.iter().any(|iface| iface.available == "1");
    if any_up {
        return Availability::new(HostStatus::Up, "1", "");
    }

    Availability::new(HostStatus::Unknown, "0", "")
}
