//! SNMP provider
//!
//! Polls one device per call: batched GETs of the configured OIDs, a WALK
//! for every OID no GET could fetch, and a recovery WALK for vendor hardware
//! metrics whose exact instance does not exist on the device. Table
//! [`discovery`] then adds what the device exposes beyond the configured
//! OIDs. The rest of the provider contract has nothing to act on for a
//! polled device and answers with empty success.

pub mod discovery;
pub mod security;
pub mod session;
pub mod value;

#[cfg(test)]
pub(crate) mod scripted;

use std::collections::HashSet;
use std::sync::Arc;

use async_snmp::{Oid, VarBind};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace, warn};

use crate::config::{Config, MonitorType, SnmpConfig};
use crate::error::{ProviderError, ProviderResult};
use crate::models::{Alert, Host, HostGroup, Item, Trigger};
use crate::provider::Provider;

pub use security::Security;
pub use session::{SessionFactory, SnmpSession, UdpSessionFactory};

use discovery::Discovery;
use session::{get_batched, target_address};
use value::{as_f64, format_value, is_placeholder};

/// OIDs polled when the connection configures no custom ones
pub const DEFAULT_OIDS: &[(&str, &str)] = &[
    ("1.3.6.1.2.1.1.1.0", "System Version Details"),
    ("1.3.6.1.2.1.1.3.0", "System Uptime"),
    ("1.3.6.1.2.1.1.5.0", "System Hostname"),
    ("1.3.6.1.4.1.2011.6.3.4.1.3", "CPU Usage (%)"),
    ("1.3.6.1.4.1.2011.6.1.2.1.1.2", "Physical Memory Capacity"),
    ("1.3.6.1.4.1.2011.6.1.2.1.1.3", "Physical Memory Available"),
    ("1.3.6.1.4.1.2011.6.3.4.1.1", "Core Temperature"),
    ("1.3.6.1.4.1.2011.5.25.31.1.1.10.1.7", "Fan Tray Status"),
];

pub const MEMORY_USAGE_ID: &str = "calculated.mem.usage";
pub const MEMORY_USAGE_NAME: &str = "Memory Usage (%)";

/// Accepts OIDs written with a leading dot
pub fn normalize_oid(oid: &str) -> &str {
    let oid = oid.trim();
    oid.strip_prefix('.').unwrap_or(oid)
}

/// Unit of an item, guessed from its name
pub fn determine_units(name: &str) -> &'static str {
    let lower = name.to_lowercase();
    let has = |needle: &str| lower.contains(needle);

    if has("percentage") || has("(%)") || has("usage") {
        "%"
    } else if has("temperature") {
        "°C"
    } else if has("bitrate") || has("speed") || has("rate") {
        "bps"
    } else if has("capacity") || has("available") || has("total") || has("free") {
        "B"
    } else if has("power") && has("dbm") {
        "dBm"
    } else if has("errors") || has("discards") || has("count") {
        "pkts"
    } else {
        ""
    }
}

/// Metrics worth a recovery walk when their configured instance is empty
fn is_hardware_metric(name: &str) -> bool {
    ["CPU Usage", "Memory", "Temperature", "Fan Status"]
        .iter()
        .any(|needle| name.contains(needle))
}

#[derive(Debug, Clone)]
struct Target {
    oid: Oid,
    key: String,
    name: String,
}

/// Physical memory readings, turned into a usage percentage once both are seen
#[derive(Debug, Default)]
struct MemoryReading {
    capacity: Option<f64>,
    available: Option<f64>,
}

impl MemoryReading {
    fn observe(&mut self, name: &str, value: &async_snmp::Value) {
        if name.contains("Memory Capacity") {
            self.capacity = as_f64(value);
        } else if name.contains("Memory Available") {
            self.available = as_f64(value);
        }
    }

    /// Some devices report available memory in bytes and capacity in KiB.
    fn usage_percent(&self) -> Option<f64> {
        let capacity = self.capacity.filter(|c| *c > 0.0)?;
        let mut available = self.available.filter(|a| *a >= 0.0)?;
        if available > capacity {
            available /= 1024.0;
        }
        let available = available.min(capacity);
        Some((capacity - available) / capacity * 100.0)
    }
}

fn snmp_item(host: &str, key: String, name: String, value: String, timestamp: i64) -> Item {
    Item {
        id: key.clone(),
        host_id: host.to_string(),
        units: determine_units(&name).to_string(),
        name,
        key,
        value,
        status: "0".to_string(),
        timestamp,
        ..Default::default()
    }
}

pub struct SnmpProvider {
    name: String,
    default_host: String,
    snmp: SnmpConfig,
    security: Security,
    sessions: Arc<dyn SessionFactory>,
    shutdown: CancellationToken,
}

impl SnmpProvider {
    pub fn new(config: &Config) -> ProviderResult<Self> {
        Self::with_session_factory(config, Arc::new(UdpSessionFactory::default()))
    }

    pub fn with_session_factory(
        config: &Config,
        sessions: Arc<dyn SessionFactory>,
    ) -> ProviderResult<Self> {
        let snmp = config.snmp.clone().unwrap_or_default();
        if snmp.port == 0 {
            return Err(ProviderError::Config("SNMP port must not be 0".to_string()));
        }
        let security = Security::from_config(&snmp);

        Ok(Self {
            name: config.name.clone(),
            default_host: config.auth.url.trim().to_string(),
            snmp,
            security,
            sessions,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn security(&self) -> &Security {
        &self.security
    }

    /// Cancelling this token aborts WALKs of every poll in flight
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// OID map in poll order. Custom OIDs replace the defaults entirely.
    fn targets(&self) -> ProviderResult<Vec<Target>> {
        let mut entries: Vec<(String, String)> = if self.snmp.custom_oids.is_empty() {
            DEFAULT_OIDS
                .iter()
                .map(|(oid, name)| (oid.to_string(), name.to_string()))
                .collect()
        } else {
            self.snmp
                .custom_oids
                .iter()
                .map(|(oid, name)| (normalize_oid(oid).to_string(), name.clone()))
                .collect()
        };
        entries.retain(|(key, _)| !key.is_empty());
        entries.sort();
        entries.dedup_by(|a, b| a.0 == b.0);

        let targets: Vec<Target> = entries
            .into_iter()
            .filter_map(|(key, name)| match Oid::parse(&key) {
                Ok(oid) => Some(Target { oid, key, name }),
                Err(e) => {
                    warn!("skipping invalid OID {key:?} ({name}): {e}");
                    None
                }
            })
            .collect();

        if targets.is_empty() {
            return Err(ProviderError::InvalidInput(
                "no valid OIDs to poll".to_string(),
            ));
        }
        Ok(targets)
    }

    /// Polls `host` once. The session lives only for the duration of the call.
    #[instrument(skip(self, cancel), fields(provider = %self.name))]
    pub async fn poll(&self, host: &str, cancel: &CancellationToken) -> ProviderResult<Vec<Item>> {
        let host = match host.trim() {
            "" => self.default_host.as_str(),
            host => host,
        };
        if host.is_empty() {
            return Err(ProviderError::InvalidInput(
                "SNMP poll needs a device address".to_string(),
            ));
        }

        let targets = self.targets()?;
        let address = target_address(host, self.snmp.port);
        let session = self.sessions.open(&address, &self.security).await?;

        let oids: Vec<Oid> = targets.iter().map(|t| t.oid.clone()).collect();
        let (mut varbinds, unresolved) = get_batched(session.as_ref(), &oids).await;
        if !unresolved.is_empty() {
            warn!("SNMP GET on {address} could not fetch {} OIDs, walking them", unresolved.len());
            let pending: Vec<Target> = targets
                .iter()
                .filter(|t| unresolved.contains(&t.oid))
                .cloned()
                .collect();
            varbinds.extend(walk_each(session.as_ref(), &pending, cancel).await?);
            if varbinds.is_empty() {
                return Err(ProviderError::Transport(format!(
                    "SNMP poll of {address} failed: every GET was rejected and every WALK came back empty"
                )));
            }
        }
        trace!("received {} varbinds from {address}", varbinds.len());

        let now = chrono::Utc::now().timestamp();
        let mut memory = MemoryReading::default();
        let mut items = Vec::with_capacity(varbinds.len() + 1);

        for varbind in varbinds {
            let key = varbind.oid.to_string();
            let target = target_for(&targets, &varbind.oid);
            let name = target.map_or_else(|| key.clone(), |t| t.name.clone());
            let mut value = format_value(&varbind.value);

            if let Some(target) = target.filter(|_| is_placeholder(&value) && is_hardware_metric(&name)) {
                if let Some(found) = recover(session.as_ref(), target, &varbind.oid, cancel).await {
                    debug!("recovered {name} on {address}: {found}");
                    value = found;
                }
            }

            memory.observe(&name, &varbind.value);
            items.push(snmp_item(host, key, name, value, now));
        }

        if let Some(usage) = memory.usage_percent() {
            if !items.iter().any(|item| item.id == MEMORY_USAGE_ID) {
                let mut item = snmp_item(
                    host,
                    MEMORY_USAGE_ID.to_string(),
                    MEMORY_USAGE_NAME.to_string(),
                    format!("{usage:.2}"),
                    now,
                );
                item.key = "mem_usage_pct".to_string();
                items.push(item);
            }
        }

        if self.snmp.discovery {
            let mut seen: HashSet<String> = items.iter().map(|item| item.id.clone()).collect();
            for found in Discovery::new(session.as_ref(), cancel).run().await {
                if seen.insert(found.oid.clone()) {
                    let mut item = snmp_item(host, found.oid, found.name, found.value, now);
                    item.units = found.units;
                    items.push(item);
                }
            }
        }

        Ok(items)
    }
}

/// The configured target `oid` is, or is an instance of
fn target_for<'t>(targets: &'t [Target], oid: &Oid) -> Option<&'t Target> {
    targets
        .iter()
        .find(|t| t.oid == *oid)
        .or_else(|| targets.iter().find(|t| oid.starts_with(&t.oid)))
}

/// First variable under each target. Failed or empty walks are skipped.
async fn walk_each(
    session: &dyn SnmpSession,
    targets: &[Target],
    cancel: &CancellationToken,
) -> ProviderResult<Vec<VarBind>> {
    let mut found = Vec::new();
    for target in targets {
        if cancel.is_cancelled() {
            return Err(ProviderError::Transport("SNMP poll cancelled".to_string()));
        }
        match session.walk(&target.oid, cancel).await {
            Ok(varbinds) => match varbinds.into_iter().next() {
                Some(varbind) => found.push(varbind),
                None => debug!("WALK of {} returned nothing", target.key),
            },
            Err(e) => warn!("WALK of {} failed: {e}", target.key),
        }
    }
    Ok(found)
}

/// Looks for a usable value under the OID. An instance OID also gets its
/// parent walked, for devices whose board sits at a different entity index.
/// Only values under the configured target count. A reading of `0` is kept
/// when nothing under the target reports more.
async fn recover(
    session: &dyn SnmpSession,
    target: &Target,
    oid: &Oid,
    cancel: &CancellationToken,
) -> Option<String> {
    let parent = oid
        .parent()
        .filter(|parent| *oid != target.oid && parent.starts_with(&target.oid));
    let mut zero = None;
    for root in std::iter::once(oid.clone()).chain(parent) {
        if cancel.is_cancelled() {
            break;
        }
        match session.walk(&root, cancel).await {
            Ok(varbinds) => {
                for value in varbinds
                    .iter()
                    .filter(|vb| vb.oid.starts_with(&target.oid))
                    .map(|vb| format_value(&vb.value))
                {
                    if !is_placeholder(&value) {
                        return Some(value);
                    }
                    if value.trim() == "0" {
                        zero.get_or_insert(value);
                    }
                }
            }
            Err(e) => debug!("recovery WALK of {root} failed: {e}"),
        }
    }
    zero
}

#[async_trait]
impl Provider for SnmpProvider {
    async fn authenticate(&self) -> ProviderResult<()> {
        Ok(())
    }

    fn auth_token(&self) -> Option<String> {
        None
    }

    fn set_auth_token(&self, _token: String) {}

    async fn get_hosts(&self) -> ProviderResult<Vec<Host>> {
        Ok(Vec::new())
    }

    async fn get_hosts_by_group_id(&self, _group_id: &str) -> ProviderResult<Vec<Host>> {
        Ok(Vec::new())
    }

    async fn get_host_by_name(&self, _name: &str) -> ProviderResult<Option<Host>> {
        Ok(None)
    }

    async fn get_host_by_id(&self, _host_id: &str) -> ProviderResult<Option<Host>> {
        Ok(None)
    }

    async fn create_host(&self, host: Host) -> ProviderResult<Host> {
        Ok(host)
    }

    async fn update_host(&self, host: Host) -> ProviderResult<Host> {
        Ok(host)
    }

    async fn delete_host(&self, _host_id: &str) -> ProviderResult<()> {
        Ok(())
    }

    async fn get_items(&self, host_id: &str) -> ProviderResult<Vec<Item>> {
        let cancel = self.shutdown.child_token();
        self.poll(host_id, &cancel).await
    }

    async fn get_item_by_id(&self, _item_id: &str) -> ProviderResult<Option<Item>> {
        Ok(None)
    }

    async fn get_item_history(
        &self,
        _item_id: &str,
        _from: i64,
        _to: i64,
    ) -> ProviderResult<Vec<Item>> {
        Ok(Vec::new())
    }

    async fn create_item(&self, item: Item) -> ProviderResult<Item> {
        Ok(item)
    }

    async fn update_item(&self, item: Item) -> ProviderResult<Item> {
        Ok(item)
    }

    async fn delete_item(&self, _item_id: &str) -> ProviderResult<()> {
        Ok(())
    }

    async fn get_alerts(&self) -> ProviderResult<Vec<Alert>> {
        Ok(Vec::new())
    }

    async fn get_alerts_by_host(&self, _host_id: &str) -> ProviderResult<Vec<Alert>> {
        Ok(Vec::new())
    }

    async fn get_triggers(&self) -> ProviderResult<Vec<Trigger>> {
        Ok(Vec::new())
    }

    async fn get_triggers_by_host(&self, _host_id: &str) -> ProviderResult<Vec<Trigger>> {
        Ok(Vec::new())
    }

    async fn get_template_ids_by_name(&self, _name: &str) -> ProviderResult<Vec<String>> {
        Ok(Vec::new())
    }

    async fn get_host_groups(&self) -> ProviderResult<Vec<String>> {
        Ok(Vec::new())
    }

    async fn get_host_groups_details(&self) -> ProviderResult<Vec<HostGroup>> {
        Ok(Vec::new())
    }

    async fn get_host_group_by_name(&self, _name: &str) -> ProviderResult<Option<HostGroup>> {
        Ok(None)
    }

    async fn create_host_group(&self, _name: &str) -> ProviderResult<String> {
        Ok(String::new())
    }

    async fn update_host_group(&self, _id: &str, _name: &str) -> ProviderResult<()> {
        Ok(())
    }

    async fn delete_host_group(&self, _id: &str) -> ProviderResult<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn monitor_type(&self) -> MonitorType {
        MonitorType::Snmp
    }
}
