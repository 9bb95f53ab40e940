//! Client dispatcher
//!
//! A [`Client`] owns exactly one backend, chosen from the connection's
//! [`MonitorType`], and forwards every [`Provider`] call to it.

use async_trait::async_trait;
use tracing::debug;

use crate::config::{Config, MonitorType};
use crate::error::ProviderResult;
use crate::models::{Alert, Host, HostGroup, Item, Trigger};
use crate::prometheus::PrometheusProvider;
use crate::provider::Provider;
use crate::snmp::SnmpProvider;
use crate::zabbix::ZabbixProvider;

/// The closed set of backends a [`Client`] can drive
pub enum Backend {
    Zabbix(ZabbixProvider),
    Snmp(SnmpProvider),
    Prometheus(PrometheusProvider),
}

impl Backend {
    pub fn new(config: &Config) -> ProviderResult<Self> {
        Ok(match config.monitor_type {
            MonitorType::Zabbix => Backend::Zabbix(ZabbixProvider::new(config)?),
            MonitorType::Snmp => Backend::Snmp(SnmpProvider::new(config)?),
            MonitorType::Prometheus => Backend::Prometheus(PrometheusProvider::new(config)?),
        })
    }

    pub fn as_provider(&self) -> &dyn Provider {
        match self {
            Backend::Zabbix(p) => p,
            Backend::Snmp(p) => p,
            Backend::Prometheus(p) => p,
        }
    }
}

pub struct Client {
    config: Config,
    backend: Backend,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("name", &self.config.name)
            .field("monitor_type", &self.config.monitor_type)
            .finish_non_exhaustive()
    }
}

impl Client {
    pub fn new(config: Config) -> ProviderResult<Self> {
        let backend = Backend::new(&config)?;
        debug!("created {} client {:?}", config.monitor_type, config.name);
        Ok(Self { config, backend })
    }

    /// Wraps an already built backend, e.g. an SNMP provider with a custom
    /// session factory.
    pub fn with_backend(config: Config, backend: Backend) -> Self {
        Self { config, backend }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn provider(&self) -> &dyn Provider {
        self.backend.as_provider()
    }

    /// Zabbix-only operations such as webhook setup
    pub fn as_zabbix(&self) -> Option<&ZabbixProvider> {
        match &self.backend {
            Backend::Zabbix(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_snmp(&self) -> Option<&SnmpProvider> {
        match &self.backend {
            Backend::Snmp(p) => Some(p),
            _ => None,
        }
    }
}

#[async_trait]
impl Provider for Client {
    async fn authenticate(&self) -> ProviderResult<()> {
        self.provider().authenticate().await
    }

    fn auth_token(&self) -> Option<String> {
        self.provider().auth_token()
    }

    fn set_auth_token(&self, token: String) {
        self.provider().set_auth_token(token)
    }

    async fn get_hosts(&self) -> ProviderResult<Vec<Host>> {
        self.provider().get_hosts().await
    }

    async fn get_hosts_by_group_id(&self, group_id: &str) -> ProviderResult<Vec<Host>> {
        self.provider().get_hosts_by_group_id(group_id).await
    }

    async fn get_host_by_name(&self, name: &str) -> ProviderResult<Option<Host>> {
        self.provider().get_host_by_name(name).await
    }

    async fn get_host_by_id(&self, host_id: &str) -> ProviderResult<Option<Host>> {
        self.provider().get_host_by_id(host_id).await
    }

    async fn create_host(&self, host: Host) -> ProviderResult<Host> {
        self.provider().create_host(host).await
    }

    async fn update_host(&self, host: Host) -> ProviderResult<Host> {
        self.provider().update_host(host).await
    }

    async fn delete_host(&self, host_id: &str) -> ProviderResult<()> {
        self.provider().delete_host(host_id).await
    }

    async fn get_items(&self, host_id: &str) -> ProviderResult<Vec<Item>> {
        self.provider().get_items(host_id).await
    }

    async fn get_item_by_id(&self, item_id: &str) -> ProviderResult<Option<Item>> {
        self.provider().get_item_by_id(item_id).await
    }

    async fn get_item_history(
        &self,
        item_id: &str,
        from: i64,
        to: i64,
    ) -> ProviderResult<Vec<Item>> {
        self.provider().get_item_history(item_id, from, to).await
    }

    async fn create_item(&self, item: Item) -> ProviderResult<Item> {
        self.provider().create_item(item).await
    }

    async fn update_item(&self, item: Item) -> ProviderResult<Item> {
        self.provider().update_item(item).await
    }

    async fn delete_item(&self, item_id: &str) -> ProviderResult<()> {
        self.provider().delete_item(item_id).await
    }

    async fn get_alerts(&self) -> ProviderResult<Vec<Alert>> {
        self.provider().get_alerts().await
    }

    async fn get_alerts_by_host(&self, host_id: &str) -> ProviderResult<Vec<Alert>> {
        self.provider().get_alerts_by_host(host_id).await
    }

    async fn get_triggers(&self) -> ProviderResult<Vec<Trigger>> {
        self.provider().get_triggers().await
    }

    async fn get_triggers_by_host(&self, host_id: &str) -> ProviderResult<Vec<Trigger>> {
        self.provider().get_triggers_by_host(host_id).await
    }

    async fn get_template_ids_by_name(&self, name: &str) -> ProviderResult<Vec<String>> {
        self.provider().get_template_ids_by_name(name).await
    }

    async fn get_host_groups(&self) -> ProviderResult<Vec<String>> {
        self.provider().get_host_groups().await
    }

    async fn get_host_groups_details(&self) -> ProviderResult<Vec<HostGroup>> {
        self.provider().get_host_groups_details().await
    }

    async fn get_host_group_by_name(&self, name: &str) -> ProviderResult<Option<HostGroup>> {
        self.provider().get_host_group_by_name(name).await
    }

    async fn create_host_group(&self, name: &str) -> ProviderResult<String> {
        self.provider().create_host_group(name).await
    }

    async fn update_host_group(&self, id: &str, name: &str) -> ProviderResult<()> {
        self.provider().update_host_group(id, name).await
    }

    async fn delete_host_group(&self, id: &str) -> ProviderResult<()> {
        self.provider().delete_host_group(id).await
    }

    fn name(&self) -> &str {
        self.provider().name()
    }

    fn monitor_type(&self) -> MonitorType {
        self.provider().monitor_type()
    }
}
