//! Zabbix provider
//!
//! Speaks the Zabbix JSON-RPC API. Session handling lives in [`rpc`],
//! availability judgement in [`availability`], value cleanup in
//! [`normalize`] and the webhook setup routine in [`webhook`].

pub mod availability;
pub mod normalize;
pub mod rpc;
pub mod webhook;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, instrument, trace, warn};

use crate::config::{Config, MonitorType};
use crate::error::{ErrorKind, ProviderError, ProviderResult, ResultExt};
use crate::models::{Alert, AlertStatus, Host, HostGroup, Item, Severity, Trigger};
use crate::provider::Provider;

use self::availability::{RawGroup, RawHost, RawInterface, determine_availability};
use self::normalize::normalize_item_value;
use self::rpc::{LOGIN_METHOD, RpcClient, de_i64, de_string, de_string_vec};

pub use self::rpc::{AuthTransport, StringOrNumber};
pub use self::webhook::{WebhookSetup, WebhookSetupOutcome};

/// Host group new hosts land in when none is given
const DEFAULT_GROUP_ID: &str = "7";

const AGENT_PORT: &str = "10050";
const SNMP_PORT: &str = "161";

const ITEM_OUTPUT: [&str; 13] = [
    "itemid",
    "hostid",
    "name",
    "key_",
    "lastvalue",
    "units",
    "value_type",
    "status",
    "lastclock",
    "type",
    "delay",
    "description",
    "interfaceid",
];

const PROBLEM_OUTPUT: [&str; 7] = [
    "eventid",
    "objectid",
    "name",
    "severity",
    "acknowledged",
    "clock",
    "r_eventid",
];

const TRIGGER_OUTPUT: [&str; 7] = [
    "triggerid",
    "description",
    "expression",
    "priority",
    "status",
    "value",
    "comments",
];

#[derive(Debug, Clone, Default, Deserialize)]
struct RawItem {
    #[serde(default, deserialize_with = "de_string")]
    itemid: String,
    #[serde(default, deserialize_with = "de_string")]
    hostid: String,
    #[serde(default, deserialize_with = "de_string")]
    name: String,
    #[serde(default, deserialize_with = "de_string")]
    key_: String,
    #[serde(default, deserialize_with = "de_string")]
    lastvalue: String,
    #[serde(default, deserialize_with = "de_string")]
    units: String,
    #[serde(default, deserialize_with = "de_string")]
    value_type: String,
    #[serde(default, rename = "type", deserialize_with = "de_string")]
    kind: String,
    #[serde(default, deserialize_with = "de_string")]
    delay: String,
    #[serde(default, deserialize_with = "de_string")]
    description: String,
    #[serde(default, deserialize_with = "de_string")]
    status: String,
    #[serde(default, deserialize_with = "de_i64")]
    lastclock: i64,
    #[serde(default, deserialize_with = "de_string")]
    interfaceid: String,
}

#[derive(Debug, Deserialize)]
struct RawHistory {
    #[serde(default, deserialize_with = "de_string")]
    itemid: String,
    #[serde(default, deserialize_with = "de_i64")]
    clock: i64,
    #[serde(default, deserialize_with = "de_string")]
    value: String,
}

#[derive(Debug, Deserialize)]
struct RawProblem {
    #[serde(default, deserialize_with = "de_string")]
    eventid: String,
    #[serde(default, deserialize_with = "de_string")]
    objectid: String,
    #[serde(default, deserialize_with = "de_string")]
    name: String,
    #[serde(default, deserialize_with = "de_string")]
    severity: String,
    #[serde(default, deserialize_with = "de_i64")]
    clock: i64,
    #[serde(default, deserialize_with = "de_string")]
    r_eventid: String,
}

#[derive(Debug, Deserialize)]
struct RawTrigger {
    #[serde(default, deserialize_with = "de_string")]
    triggerid: String,
    #[serde(default, deserialize_with = "de_string")]
    description: String,
    #[serde(default, deserialize_with = "de_string")]
    expression: String,
    #[serde(default, deserialize_with = "de_string")]
    priority: String,
    #[serde(default, deserialize_with = "de_string")]
    value: String,
    #[serde(default, deserialize_with = "de_string")]
    comments: String,
    #[serde(default)]
    hosts: Vec<RawHostRef>,
}

#[derive(Debug, Deserialize)]
struct RawHostRef {
    #[serde(default, deserialize_with = "de_string")]
    hostid: String,
}

#[derive(Debug, Deserialize)]
struct RawTemplate {
    #[serde(default, deserialize_with = "de_string")]
    templateid: String,
}

#[derive(Debug, Default, Deserialize)]
struct CreatedIds {
    #[serde(default, deserialize_with = "de_string_vec")]
    hostids: Vec<String>,
    #[serde(default, deserialize_with = "de_string_vec")]
    itemids: Vec<String>,
    #[serde(default, deserialize_with = "de_string_vec")]
    groupids: Vec<String>,
}

fn first_id(ids: Vec<String>, what: &str) -> ProviderResult<String> {
    ids.into_iter()
        .next()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ProviderError::Parse(format!("no {what} ID returned after creation")))
}

fn interface_type_name(code: &str) -> &'static str {
    match code {
        "1" => "agent",
        "2" => "snmp",
        "3" => "ipmi",
        "4" => "jmx",
        _ => "unknown",
    }
}

/// Item type matching the interface the item is polled through.
fn default_item_type(interface_type: &str) -> &'static str {
    match interface_type {
        "2" => "20",
        "3" => "12",
        "4" => "16",
        _ => "0",
    }
}

fn main_interface(interfaces: &[RawInterface]) -> Option<&RawInterface> {
    interfaces
        .iter()
        .find(|iface| iface.main == "1")
        .or_else(|| interfaces.first())
}

fn item_status(status: &str) -> &'static str {
    if status == "1" || status.eq_ignore_ascii_case("disabled") {
        "1"
    } else {
        "0"
    }
}

fn host_from_raw(raw: RawHost) -> Host {
    let availability = determine_availability(&raw);

    let mut metadata = HashMap::new();
    metadata.insert("host".to_string(), raw.host.clone());
    metadata.insert(
        "active_available".to_string(),
        availability.active_available.to_string(),
    );
    if !availability.reason.is_empty() {
        metadata.insert("status_reason".to_string(), availability.reason.clone());
    }

    let main = main_interface(&raw.interfaces);
    if let Some(iface) = main {
        metadata.insert(
            "interface_type".to_string(),
            interface_type_name(&iface.kind).to_string(),
        );
    }

    let groups: &[RawGroup] = if raw.hostgroups.is_empty() {
        &raw.groups
    } else {
        &raw.hostgroups
    };
    if let Some(first) = groups.first() {
        metadata.insert("groupid".to_string(), first.groupid.clone());
        metadata.insert("groupname".to_string(), first.name.clone());
        let ids: Vec<&str> = groups.iter().map(|g| g.groupid.as_str()).collect();
        let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
        metadata.insert("groupids".to_string(), ids.join(","));
        metadata.insert("groupnames".to_string(), names.join(","));
    }

    Host {
        ip_address: main.map(|iface| iface.ip.clone()).unwrap_or_default(),
        enabled: if raw.status == "1" { 0 } else { 1 },
        status: availability.status,
        id: raw.hostid,
        name: if raw.name.is_empty() { raw.host } else { raw.name },
        description: raw.description,
        metadata,
    }
}

fn item_from_raw(raw: RawItem) -> Item {
    let (value, units) = normalize_item_value(&raw.name, &raw.key_, &raw.lastvalue, &raw.units);
    Item {
        id: raw.itemid,
        host_id: raw.hostid,
        name: raw.name,
        key: raw.key_,
        item_type: raw.kind,
        value,
        units,
        value_type: raw.value_type,
        delay: raw.delay,
        status: raw.status,
        timestamp: raw.lastclock,
        description: raw.description,
        interface_id: raw.interfaceid,
        metadata: HashMap::new(),
    }
}

fn alert_from_raw(raw: RawProblem, host_id: String) -> Alert {
    let resolved = !raw.r_eventid.is_empty() && raw.r_eventid != "0";
    Alert {
        id: raw.eventid,
        host_id,
        description: raw.name.clone(),
        name: raw.name,
        severity: Severity::from_code(&raw.severity),
        status: if resolved {
            AlertStatus::Resolved
        } else {
            AlertStatus::Problem
        },
        timestamp: raw.clock,
    }
}

fn trigger_from_raw(raw: RawTrigger) -> Trigger {
    Trigger {
        id: raw.triggerid,
        status: if raw.value == "1" { "problem" } else { "ok" }.to_string(),
        priority: Severity::from_code(&raw.priority),
        expression: raw.expression,
        description: if raw.comments.is_empty() {
            raw.description.clone()
        } else {
            raw.comments
        },
        name: raw.description,
    }
}

/// Field name to retry `user.login` with when the server rejected the other one.
fn alternate_login_field(err: &ProviderError) -> Option<&'static str> {
    let text = err.to_string();
    if text.contains("unexpected parameter \"username\"") {
        Some("user")
    } else if text.contains("unexpected parameter \"user\"") {
        Some("username")
    } else {
        None
    }
}

fn login_params(field: &str, username: &str, password: &str) -> Value {
    let mut params = serde_json::Map::new();
    params.insert(field.to_string(), Value::from(username));
    params.insert("password".to_string(), Value::from(password));
    Value::Object(params)
}

/// Merges the fields of `extra` into the `base` request params.
fn with_extra(mut base: Value, extra: Value) -> Value {
    if let (Some(params), Value::Object(extra)) = (base.as_object_mut(), extra) {
        params.extend(extra);
    }
    base
}

fn host_query(extra: Value) -> Value {
    with_extra(
        json!({
            "output": "extend",
            "selectInterfaces": "extend",
            "selectHostGroups": "extend",
            "selectGroups": "extend",
        }),
        extra,
    )
}

pub struct ZabbixProvider {
    name: String,
    rpc: RpcClient,
    credentials: Option<(String, String)>,
    auth_lock: Mutex<()>,
}

impl ZabbixProvider {
    pub fn new(config: &Config) -> ProviderResult<Self> {
        let rpc = RpcClient::new(config)?;
        debug!("zabbix provider {} at {}", config.name, rpc.endpoint());
        Ok(Self {
            name: config.name.clone(),
            credentials: config
                .auth
                .credentials()
                .map(|(user, pass)| (user.to_string(), pass.to_string())),
            rpc,
            auth_lock: Mutex::new(()),
        })
    }

    /// Where the session token currently travels
    pub fn auth_transport(&self) -> AuthTransport {
        self.rpc.transport()
    }

    pub(crate) fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    async fn verify_session(&self) -> ProviderResult<()> {
        self.rpc
            .call_value("user.get", &json!({ "output": ["userid"], "limit": 1 }))
            .await
            .map(|_| ())
    }

    async fn login(&self, username: &str, password: &str) -> ProviderResult<String> {
        let first = self
            .rpc
            .call::<String>(LOGIN_METHOD, login_params("username", username, password))
            .await;

        match first {
            Ok(token) => Ok(token),
            Err(err) => match alternate_login_field(&err) {
                Some(field) => {
                    debug!("user.login rejected its field name, retrying with \"{field}\"");
                    self.rpc
                        .call::<String>(LOGIN_METHOD, login_params(field, username, password))
                        .await
                }
                None => Err(err),
            },
        }
    }

    async fn query_hosts(&self, extra: Value) -> ProviderResult<Vec<Host>> {
        let raw: Vec<RawHost> = self.rpc.call("host.get", host_query(extra)).await?;
        trace!("host.get returned {} hosts", raw.len());
        Ok(raw.into_iter().map(host_from_raw).collect())
    }

    async fn primary_interface(&self, host_id: &str) -> ProviderResult<RawInterface> {
        let hosts: Vec<RawHost> = self
            .rpc
            .call(
                "host.get",
                json!({
                    "output": ["hostid"],
                    "selectInterfaces": ["interfaceid", "ip", "dns", "port", "type", "main", "useip"],
                    "hostids": host_id,
                }),
            )
            .await?;

        hosts
            .first()
            .and_then(|host| main_interface(&host.interfaces))
            .filter(|iface| !iface.interfaceid.is_empty())
            .cloned()
            .ok_or_else(|| {
                ProviderError::InvalidInput(format!("host {host_id} has no interface"))
            })
    }

    async fn query_items(&self, extra: Value) -> ProviderResult<Vec<Item>> {
        let params = with_extra(json!({ "output": ITEM_OUTPUT }), extra);
        let raw: Vec<RawItem> = self.rpc.call("item.get", params).await?;
        Ok(raw.into_iter().map(item_from_raw).collect())
    }

    /// Problems plus the host each one belongs to. `problem.get` only knows
    /// the trigger, so hosts are resolved through `trigger.get`.
    async fn query_problems(&self, extra: Value) -> ProviderResult<Vec<Alert>> {
        let params = with_extra(
            json!({
                "output": PROBLEM_OUTPUT,
                "recent": true,
                "sortfield": ["eventid"],
                "sortorder": "DESC",
            }),
            extra,
        );
        let problems: Vec<RawProblem> = self.rpc.call("problem.get", params).await?;
        if problems.is_empty() {
            return Ok(Vec::new());
        }

        let trigger_ids: Vec<&str> = problems.iter().map(|p| p.objectid.as_str()).collect();
        let hosts_by_trigger: HashMap<String, String> = match self
            .rpc
            .call::<Vec<RawTrigger>>(
                "trigger.get",
                json!({
                    "output": ["triggerid"],
                    "triggerids": trigger_ids,
                    "selectHosts": ["hostid"],
                }),
            )
            .await
        {
            Ok(triggers) => triggers
                .into_iter()
                .filter_map(|t| {
                    let host = t.hosts.into_iter().next()?;
                    Some((t.triggerid, host.hostid))
                })
                .collect(),
            Err(e) => {
                warn!("could not resolve hosts of {} problems: {e}", problems.len());
                HashMap::new()
            }
        };

        Ok(problems
            .into_iter()
            .map(|problem| {
                let host_id = hosts_by_trigger
                    .get(&problem.objectid)
                    .cloned()
                    .unwrap_or_default();
                alert_from_raw(problem, host_id)
            })
            .collect())
    }

    async fn query_triggers(&self, extra: Value) -> ProviderResult<Vec<Trigger>> {
        let params = with_extra(
            json!({
                "output": TRIGGER_OUTPUT,
                "only_true": true,
                "active": true,
                "expandDescription": true,
            }),
            extra,
        );
        let raw: Vec<RawTrigger> = self.rpc.call("trigger.get", params).await?;
        Ok(raw.into_iter().map(trigger_from_raw).collect())
    }

    async fn query_groups(&self, extra: Value) -> ProviderResult<Vec<HostGroup>> {
        let params = with_extra(json!({ "output": ["groupid", "name"] }), extra);
        let raw: Vec<RawGroup> = self.rpc.call("hostgroup.get", params).await?;
        Ok(raw
            .into_iter()
            .map(|g| HostGroup {
                id: g.groupid,
                name: g.name,
            })
            .collect())
    }
}

#[async_trait]
impl Provider for ZabbixProvider {
    #[instrument(skip(self), fields(provider = %self.name))]
    async fn authenticate(&self) -> ProviderResult<()> {
        let _guard = self.auth_lock.lock().await;

        if self.rpc.token().is_some() {
            match self.verify_session().await {
                Ok(()) => {
                    trace!("existing session is still valid");
                    return Ok(());
                }
                Err(e) => debug!("existing session rejected: {e}"),
            }
        }

        let Some((username, password)) = &self.credentials else {
            return Err(ProviderError::Auth(
                "no valid session token and no credentials configured".to_string(),
            ));
        };

        match self.login(username, password).await {
            Ok(token) => {
                self.rpc.set_token(Some(token));
                debug!("logged in as {username}");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::Api => Err(ProviderError::Auth(e.to_string())),
            Err(e) => Err(e).context("authentication failed"),
        }
    }

    fn auth_token(&self) -> Option<String> {
        self.rpc.token()
    }

    fn set_auth_token(&self, token: String) {
        self.rpc.set_token(Some(token).filter(|t| !t.is_empty()));
    }

    async fn get_hosts(&self) -> ProviderResult<Vec<Host>> {
        self.query_hosts(json!({})).await
    }

    async fn get_hosts_by_group_id(&self, group_id: &str) -> ProviderResult<Vec<Host>> {
        self.query_hosts(json!({ "groupids": group_id })).await
    }

    async fn get_host_by_name(&self, name: &str) -> ProviderResult<Option<Host>> {
        let hosts = self
            .query_hosts(json!({ "filter": { "host": [name] } }))
            .await?;
        Ok(hosts.into_iter().next())
    }

    async fn get_host_by_id(&self, host_id: &str) -> ProviderResult<Option<Host>> {
        let hosts = self.query_hosts(json!({ "hostids": host_id })).await?;
        Ok(hosts.into_iter().next())
    }

    #[instrument(skip_all, fields(host = %host.name))]
    async fn create_host(&self, mut host: Host) -> ProviderResult<Host> {
        if host.name.trim().is_empty() {
            return Err(ProviderError::InvalidInput("host name is required".to_string()));
        }

        let group_id = host.meta("groupid").unwrap_or(DEFAULT_GROUP_ID).to_string();
        let interface = if host.meta("interface_type") == Some("snmp") {
            json!({
                "type": 2,
                "main": 1,
                "useip": 1,
                "ip": host.ip_address,
                "dns": "",
                "port": SNMP_PORT,
                "details": { "version": 2, "community": "{$SNMP_COMMUNITY}" },
            })
        } else {
            json!({
                "type": 1,
                "main": 1,
                "useip": 1,
                "ip": host.ip_address,
                "dns": "",
                "port": AGENT_PORT,
            })
        };

        let mut params = json!({
            "host": host.name,
            "description": host.description,
            "interfaces": [interface],
            "groups": [{ "groupid": group_id }],
        });
        if let (Some(params), Some(template_id)) = (params.as_object_mut(), host.meta("templateid")) {
            params.insert("templates".to_string(), json!([{ "templateid": template_id }]));
        }

        let created: CreatedIds = self
            .rpc
            .call("host.create", params)
            .await
            .context("failed to create host")?;
        host.id = first_id(created.hostids, "host")?;
        host.metadata.insert("groupid".to_string(), group_id);
        Ok(host)
    }

    #[instrument(skip_all, fields(host = %host.id))]
    async fn update_host(&self, host: Host) -> ProviderResult<Host> {
        if host.id.is_empty() {
            return Err(ProviderError::InvalidInput("host ID is required".to_string()));
        }

        let mut params = serde_json::Map::new();
        params.insert("hostid".to_string(), json!(host.id));
        if !host.name.trim().is_empty() {
            params.insert("host".to_string(), json!(host.name));
            params.insert("name".to_string(), json!(host.name));
        }
        params.insert("description".to_string(), json!(host.description));
        if let Some(group_id) = host.meta("groupid") {
            params.insert("groups".to_string(), json!([{ "groupid": group_id }]));
        }

        if !host.ip_address.is_empty() {
            match self.primary_interface(&host.id).await {
                Ok(iface) => {
                    let mut interface = json!({
                        "interfaceid": iface.interfaceid,
                        "type": iface.kind,
                        "main": iface.main,
                        "useip": iface.useip,
                        "ip": host.ip_address,
                        "dns": iface.dns,
                        "port": iface.port,
                    });
                    if iface.kind == "2" {
                        interface["details"] =
                            json!({ "version": 2, "community": "{$SNMP_COMMUNITY}" });
                    }
                    params.insert("interfaces".to_string(), json!([interface]));
                }
                Err(e) => warn!("keeping interfaces of host {}: {e}", host.id),
            }
        }

        self.rpc
            .call_value("host.update", &Value::Object(params))
            .await
            .context("failed to update host")?;
        Ok(host)
    }

    async fn delete_host(&self, host_id: &str) -> ProviderResult<()> {
        if host_id.is_empty() {
            return Err(ProviderError::InvalidInput("host ID is required".to_string()));
        }
        self.rpc
            .call_value("host.delete", &json!([host_id]))
            .await
            .context("failed to delete host")
            .map(|_| ())
    }

    async fn get_items(&self, host_id: &str) -> ProviderResult<Vec<Item>> {
        self.query_items(json!({ "hostids": host_id })).await
    }

    async fn get_item_by_id(&self, item_id: &str) -> ProviderResult<Option<Item>> {
        let items = self.query_items(json!({ "itemids": item_id })).await?;
        Ok(items.into_iter().next())
    }

    #[instrument(skip(self))]
    async fn get_item_history(&self, item_id: &str, from: i64, to: i64) -> ProviderResult<Vec<Item>> {
        let item = self
            .get_item_by_id(item_id)
            .await?
            .ok_or_else(|| ProviderError::InvalidInput(format!("item not found: {item_id}")))?;

        let history_table: i64 = item.value_type.parse().unwrap_or(0);
        let rows: Vec<RawHistory> = self
            .rpc
            .call(
                "history.get",
                json!({
                    "output": ["itemid", "clock", "value"],
                    "itemids": item_id,
                    "history": history_table,
                    "time_from": from,
                    "time_till": to,
                    "sortfield": "clock",
                    "sortorder": "DESC",
                    "limit": 1000,
                }),
            )
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let (value, units) = normalize_item_value(&item.name, &item.key, &row.value, &item.units);
                Item {
                    id: row.itemid,
                    host_id: item.host_id.clone(),
                    name: item.name.clone(),
                    key: item.key.clone(),
                    value,
                    units,
                    value_type: item.value_type.clone(),
                    timestamp: row.clock,
                    ..Default::default()
                }
            })
            .collect())
    }

    #[instrument(skip_all, fields(host = %item.host_id))]
    async fn create_item(&self, mut item: Item) -> ProviderResult<Item> {
        if item.host_id.is_empty() {
            return Err(ProviderError::InvalidInput("host ID is required".to_string()));
        }
        let key = match item.key.as_str() {
            "" => item.meta("key").unwrap_or_default().to_string(),
            key => key.to_string(),
        };
        if key.is_empty() {
            return Err(ProviderError::InvalidInput("item key is required".to_string()));
        }

        let iface = self
            .primary_interface(&item.host_id)
            .await
            .context("failed to get host interface")?;

        let pick = |own: &str, meta_key: &str, fallback: &str| -> String {
            if !own.is_empty() {
                own.to_string()
            } else {
                item.meta(meta_key).unwrap_or(fallback).to_string()
            }
        };
        let item_type = pick(&item.item_type, "type", default_item_type(&iface.kind));
        let value_type = pick(&item.value_type, "value_type", "0");
        let delay = pick(&item.delay, "delay", "30s");
        let description = pick(&item.description, "description", "");

        let created: CreatedIds = self
            .rpc
            .call(
                "item.create",
                json!({
                    "name": item.name,
                    "key_": key,
                    "hostid": item.host_id,
                    "type": item_type,
                    "value_type": value_type,
                    "interfaceid": iface.interfaceid,
                    "units": item.units,
                    "status": item_status(&item.status),
                    "delay": delay,
                    "description": description,
                }),
            )
            .await
            .context("failed to create item")?;

        item.id = first_id(created.itemids, "item")?;
        item.key = key;
        item.item_type = item_type;
        item.value_type = value_type;
        item.delay = delay;
        item.interface_id = iface.interfaceid;
        Ok(item)
    }

    async fn update_item(&self, item: Item) -> ProviderResult<Item> {
        if item.id.is_empty() {
            return Err(ProviderError::InvalidInput("item ID is required".to_string()));
        }

        let mut params = serde_json::Map::new();
        params.insert("itemid".to_string(), json!(item.id));
        let fields = [
            ("name", &item.name),
            ("key_", &item.key),
            ("units", &item.units),
            ("value_type", &item.value_type),
            ("type", &item.item_type),
            ("delay", &item.delay),
            ("description", &item.description),
            ("interfaceid", &item.interface_id),
        ];
        for (field, value) in fields {
            if !value.trim().is_empty() {
                params.insert(field.to_string(), json!(value));
            }
        }
        if !item.status.is_empty() {
            params.insert("status".to_string(), json!(item_status(&item.status)));
        }

        self.rpc
            .call_value("item.update", &Value::Object(params))
            .await
            .context("failed to update item")?;
        Ok(item)
    }

    async fn delete_item(&self, item_id: &str) -> ProviderResult<()> {
        if item_id.is_empty() {
            return Err(ProviderError::InvalidInput("item ID is required".to_string()));
        }
        self.rpc
            .call_value("item.delete", &json!([item_id]))
            .await
            .context("failed to delete item")
            .map(|_| ())
    }

    async fn get_alerts(&self) -> ProviderResult<Vec<Alert>> {
        self.query_problems(json!({})).await
    }

    async fn get_alerts_by_host(&self, host_id: &str) -> ProviderResult<Vec<Alert>> {
        let mut alerts = self.query_problems(json!({ "hostids": host_id })).await?;
        for alert in alerts.iter_mut().filter(|a| a.host_id.is_empty()) {
            alert.host_id = host_id.to_string();
        }
        Ok(alerts)
    }

    async fn get_triggers(&self) -> ProviderResult<Vec<Trigger>> {
        self.query_triggers(json!({})).await
    }

    async fn get_triggers_by_host(&self, host_id: &str) -> ProviderResult<Vec<Trigger>> {
        self.query_triggers(json!({ "hostids": host_id })).await
    }

    async fn get_template_ids_by_name(&self, name: &str) -> ProviderResult<Vec<String>> {
        let templates: Vec<RawTemplate> = self
            .rpc
            .call(
                "template.get",
                json!({ "output": ["templateid", "name"], "filter": { "name": [name] } }),
            )
            .await
            .context("failed to get templates by name")?;
        Ok(templates.into_iter().map(|t| t.templateid).collect())
    }

    async fn get_host_groups(&self) -> ProviderResult<Vec<String>> {
        let groups = self
            .query_groups(json!({}))
            .await
            .context("failed to get host groups")?;
        Ok(groups.into_iter().map(|g| g.name).collect())
    }

    async fn get_host_groups_details(&self) -> ProviderResult<Vec<HostGroup>> {
        self.query_groups(json!({}))
            .await
            .context("failed to get host groups")
    }

    async fn get_host_group_by_name(&self, name: &str) -> ProviderResult<Option<HostGroup>> {
        let groups = self
            .query_groups(json!({ "filter": { "name": [name] } }))
            .await
            .context("failed to get host group by name")?;
        Ok(groups.into_iter().next())
    }

    async fn create_host_group(&self, name: &str) -> ProviderResult<String> {
        if name.trim().is_empty() {
            return Err(ProviderError::InvalidInput(
                "host group name is required".to_string(),
            ));
        }

        match self.get_host_group_by_name(name).await {
            Ok(Some(group)) => return Ok(group.id),
            Ok(None) => {}
            Err(e) => debug!("lookup of host group {name} failed, creating it: {e}"),
        }

        let created: CreatedIds = self
            .rpc
            .call("hostgroup.create", json!({ "name": name }))
            .await
            .context("failed to create host group")?;
        first_id(created.groupids, "host group")
    }

    async fn update_host_group(&self, id: &str, name: &str) -> ProviderResult<()> {
        self.rpc
            .call_value("hostgroup.update", &json!({ "groupid": id, "name": name }))
            .await
            .context("failed to update host group")
            .map(|_| ())
    }

    async fn delete_host_group(&self, id: &str) -> ProviderResult<()> {
        self.rpc
            .call_value("hostgroup.delete", &json!([id]))
            .await
            .context("failed to delete host group")
            .map(|_| ())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn monitor_type(&self) -> MonitorType {
        MonitorType::Zabbix
    }
}
