//! Table discovery run after the configured OIDs are polled
//!
//! Walks the standard and vendor tables a switch usually exposes: interfaces,
//! OSPF, BGP and STP state, LLDP neighbors, optics, inventory and hardware
//! health. Every table is best effort. A failed or empty walk only means the
//! device contributes nothing for that table.

use std::collections::{BTreeMap, HashMap};

use async_snmp::{Oid, Value, VarBind};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::determine_units;
use super::session::{get_batched, SnmpSession};
use super::value::{format_value, NOT_AVAILABLE};

pub const ENTITY_NAME: &str = "1.3.6.1.2.1.47.1.1.1.1.7";
pub const ENTITY_SERIAL: &str = "1.3.6.1.2.1.47.1.1.1.1.11";
pub const ENTITY_MODEL: &str = "1.3.6.1.2.1.47.1.1.1.1.13";

pub const IF_NAME: &str = "1.3.6.1.2.1.31.1.1.1.1";
pub const IF_DESCR: &str = "1.3.6.1.2.1.2.2.1.2";
pub const IF_OPER_STATUS: &str = "1.3.6.1.2.1.2.2.1.8";
pub const IF_HIGH_SPEED: &str = "1.3.6.1.2.1.31.1.1.1.15";
pub const IF_IN_RATE: &str = "1.3.6.1.4.1.2011.5.25.41.1.1.1.1.3";
pub const IF_OUT_RATE: &str = "1.3.6.1.4.1.2011.5.25.41.1.1.1.1.4";

pub const OSPF_NEIGHBOR_STATE: &str = "1.3.6.1.2.1.14.10.1.6";
pub const BGP_PEER_STATE: &str = "1.3.6.1.2.1.15.3.1.2";
pub const STP_PORT_STATE: &str = "1.3.6.1.2.1.17.2.15.1.3";
pub const LLDP_REMOTE_SYSTEM: &str = "1.0.8802.1.1.2.1.4.1.1.9";

pub const SFP_RX_POWER: &str = "1.3.6.1.4.1.2011.5.25.31.1.1.1.1.22";
pub const ENTITY_HEALTH: &str = "1.3.6.1.4.1.2011.5.25.31.1.1.1.1.13";
pub const MAC_ADDRESS_COUNT: &str = "1.3.6.1.4.1.2011.5.25.42.2.1.1.1.1.1.1";

/// Substrings of the interface names worth polling, lowercase
const PHYSICAL_INTERFACES: &[&str] = &[
    "gigabit",
    "ten-gigabit",
    "eth-trunk",
    "ge",
    "xge",
    "meth",
    "ethernet",
];

/// A metric found by discovery. `oid` doubles as item id and key.
#[derive(Debug, Clone, PartialEq)]
pub struct Discovered {
    pub oid: String,
    pub name: String,
    pub value: String,
    pub units: String,
}

impl Discovered {
    fn new(oid: &Oid, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            oid: oid.to_string(),
            name: name.into(),
            value: value.into(),
            units: String::new(),
        }
    }

    fn with_units(mut self, units: &str) -> Self {
        self.units = units.to_string();
        self
    }
}

/// Entity index to physical name, e.g. `16842753 -> "GigabitEthernet0/0/1"`
pub type EntityNames = HashMap<u32, String>;

pub struct Discovery<'a> {
    session: &'a dyn SnmpSession,
    cancel: &'a CancellationToken,
}

impl<'a> Discovery<'a> {
    pub fn new(session: &'a dyn SnmpSession, cancel: &'a CancellationToken) -> Self {
        Self { session, cancel }
    }

    /// Every table, in a fixed order. Stops early when the poll is cancelled.
    pub async fn run(&self) -> Vec<Discovered> {
        let entities = self.entity_names().await;

        let mut found = self.interfaces().await;
        found.extend(self.ospf_neighbors().await);
        found.extend(self.lldp_neighbors().await);
        found.extend(self.sfp_rx_power(&entities).await);
        found.extend(self.inventory().await);
        found.extend(self.health(&entities).await);
        found.extend(self.bgp_peers().await);
        found.extend(self.stp_ports().await);

        debug!("discovered {} metrics", found.len());
        found
    }

    async fn walk(&self, root: &str) -> Vec<VarBind> {
        if self.cancel.is_cancelled() {
            return Vec::new();
        }
        let oid = match Oid::parse(root) {
            Ok(oid) => oid,
            Err(e) => {
                warn!("invalid discovery root {root}: {e}");
                return Vec::new();
            }
        };
        match self.session.walk(&oid, self.cancel).await {
            Ok(varbinds) => {
                trace!("WALK of {root} returned {} varbinds", varbinds.len());
                varbinds
            }
            Err(e) => {
                debug!("discovery WALK of {root} failed: {e}");
                Vec::new()
            }
        }
    }

    pub async fn entity_names(&self) -> EntityNames {
        self.walk(ENTITY_NAME)
            .await
            .iter()
            .filter_map(|vb| {
                let name = format_value(&vb.value);
                let index = last_arc(&vb.oid)?;
                usable(&name).then_some((index, name))
            })
            .collect()
    }

    /// Rates, link status and negotiated speed of the physical ports.
    /// Names come from ifName, or ifDescr on agents without the ifX table.
    pub async fn interfaces(&self) -> Vec<Discovered> {
        let mut names = interface_names(&self.walk(IF_NAME).await);
        if names.is_empty() {
            names = interface_names(&self.walk(IF_DESCR).await);
        }

        let mut metrics: HashMap<Oid, (String, bool)> = HashMap::new();
        let mut oids = Vec::new();
        for (index, name) in &names {
            let lower = name.to_lowercase();
            if !PHYSICAL_INTERFACES.iter().any(|needle| lower.contains(needle)) {
                continue;
            }
            let columns = [
                (IF_IN_RATE, "Inbound Rate", false),
                (IF_OUT_RATE, "Outbound Rate", false),
                (IF_OPER_STATUS, "Link Status", true),
                (IF_HIGH_SPEED, "Negotiated Speed", false),
            ];
            for (column, metric, is_status) in columns {
                let Ok(oid) = Oid::parse(&format!("{column}.{index}")) else {
                    continue;
                };
                metrics.insert(oid.clone(), (format!("{name} {metric}"), is_status));
                oids.push(oid);
            }
        }
        if oids.is_empty() || self.cancel.is_cancelled() {
            return Vec::new();
        }

        let (varbinds, unresolved) = get_batched(self.session, &oids).await;
        if !unresolved.is_empty() {
            debug!("{} interface OIDs could not be fetched", unresolved.len());
        }

        varbinds
            .iter()
            .filter(|vb| !is_exception(&vb.value))
            .filter_map(|vb| {
                let (name, is_status) = metrics.get(&vb.oid)?;
                let value = if *is_status {
                    link_status(&vb.value).to_string()
                } else {
                    format_value(&vb.value)
                };
                Some(Discovered::new(&vb.oid, name.as_str(), value).with_units(determine_units(name)))
            })
            .collect()
    }

    pub async fn ospf_neighbors(&self) -> Vec<Discovered> {
        self.walk(OSPF_NEIGHBOR_STATE)
            .await
            .iter()
            .map(|vb| {
                let state = match format_value(&vb.value).as_str() {
                    "8" => "Full",
                    "1" => "Down",
                    _ => "Syncing",
                };
                let name = format!("OSPF Neighbor [{}] Session", index_ip(&vb.oid, OSPF_NEIGHBOR_STATE));
                Discovered::new(&vb.oid, name, state)
            })
            .collect()
    }

    pub async fn bgp_peers(&self) -> Vec<Discovered> {
        self.walk(BGP_PEER_STATE)
            .await
            .iter()
            .map(|vb| {
                let state = match format_value(&vb.value).as_str() {
                    "6" => "Established",
                    "1" => "Idle",
                    _ => "Connecting",
                };
                let name = format!("BGP Neighbor [{}] Session", index_ip(&vb.oid, BGP_PEER_STATE));
                Discovered::new(&vb.oid, name, state)
            })
            .collect()
    }

    pub async fn stp_ports(&self) -> Vec<Discovered> {
        self.walk(STP_PORT_STATE)
            .await
            .iter()
            .map(|vb| {
                let state = match format_value(&vb.value).as_str() {
                    "5" => "Forwarding",
                    "2" => "Blocking",
                    "1" => "Disabled",
                    _ => "Learning",
                };
                let port = last_arc(&vb.oid).map(|i| i.to_string()).unwrap_or_default();
                Discovered::new(&vb.oid, format!("STP Port [{port}] Operational State"), state)
            })
            .collect()
    }

    pub async fn lldp_neighbors(&self) -> Vec<Discovered> {
        self.walk(LLDP_REMOTE_SYSTEM)
            .await
            .iter()
            .filter_map(|vb| {
                let system = format_value(&vb.value);
                usable(&system).then(|| {
                    Discovered::new(&vb.oid, format!("LLDP Neighbor Device [{system}]"), "Connected")
                })
            })
            .collect()
    }

    /// Optical receive power, reported by the agent in hundredths of a dBm
    pub async fn sfp_rx_power(&self, entities: &EntityNames) -> Vec<Discovered> {
        self.walk(SFP_RX_POWER)
            .await
            .iter()
            .filter_map(|vb| {
                let raw = format_value(&vb.value);
                if !usable(&raw) {
                    return None;
                }
                let value = match raw.trim().parse::<f64>() {
                    Ok(centi_dbm) => format!("{:.2}", centi_dbm / 100.0),
                    Err(_) => raw,
                };
                let port = entity_label(entities, &vb.oid, "SFP Port");
                Some(Discovered::new(&vb.oid, format!("{port} RX Power Level"), value).with_units("dBm"))
            })
            .collect()
    }

    /// Serial number and model of the first entity that reports one
    pub async fn inventory(&self) -> Vec<Discovered> {
        let mut found = Vec::new();
        for (root, name) in [
            (ENTITY_SERIAL, "Hardware Serial Number"),
            (ENTITY_MODEL, "Hardware Model Identifier"),
        ] {
            let first = self.walk(root).await.into_iter().find_map(|vb| {
                let value = format_value(&vb.value);
                usable(&value).then(|| Discovered::new(&vb.oid, name, value))
            });
            found.extend(first);
        }
        found
    }

    /// Power module health and the size of the MAC address table
    pub async fn health(&self, entities: &EntityNames) -> Vec<Discovered> {
        let mut found: Vec<Discovered> = self
            .walk(ENTITY_HEALTH)
            .await
            .iter()
            .map(|vb| {
                let value = match format_value(&vb.value).as_str() {
                    "1" => "Normal".to_string(),
                    "2" => "Abnormal".to_string(),
                    "3" => "Not Supplied".to_string(),
                    other => other.to_string(),
                };
                let module = entity_label(entities, &vb.oid, "Power Module");
                Discovered::new(&vb.oid, format!("{module} Health State"), value)
            })
            .collect();

        if let Some(vb) = self.walk(MAC_ADDRESS_COUNT).await.first() {
            found.push(Discovered::new(
                &vb.oid,
                "Total MAC Address Count",
                format_value(&vb.value),
            ));
        }
        found
    }
}

fn usable(value: &str) -> bool {
    !value.is_empty() && value != NOT_AVAILABLE
}

fn is_exception(value: &Value) -> bool {
    matches!(
        value,
        Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView
    )
}

fn last_arc(oid: &Oid) -> Option<u32> {
    oid.arcs().last().copied()
}

/// Neighbor address that opens the row index of `column`
fn index_ip(oid: &Oid, column: &str) -> String {
    let start = column.split('.').count();
    match oid.arcs().get(start..start + 4) {
        Some([a, b, c, d]) => format!("{a}.{b}.{c}.{d}"),
        _ => "Unknown".to_string(),
    }
}

fn entity_label(entities: &EntityNames, oid: &Oid, fallback: &str) -> String {
    let index = last_arc(oid).unwrap_or_default();
    entities
        .get(&index)
        .cloned()
        .unwrap_or_else(|| format!("{fallback} {index}"))
}

fn link_status(value: &Value) -> &'static str {
    match format_value(value).as_str() {
        "1" => "Up",
        "2" => "Down",
        _ => "Unknown",
    }
}

/// Interface index to name. Only non-empty text values count.
fn interface_names(varbinds: &[VarBind]) -> BTreeMap<u32, String> {
    varbinds
        .iter()
        .filter_map(|vb| match &vb.value {
            Value::OctetString(bytes) if !bytes.is_empty() => {
                Some((last_arc(&vb.oid)?, String::from_utf8_lossy(bytes).into_owned()))
            }
            _ => None,
        })
        .collect()
}
