//! Prometheus provider
//!
//! Only the connection is wired up so far. Every data operation reports
//! [`ProviderError::NotImplemented`], which lets callers tell an
//! unsupported backend apart from an empty one.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use tracing::debug;

use crate::config::{Config, MonitorType};
use crate::error::{ProviderError, ProviderResult};
use crate::models::{Alert, Host, HostGroup, Item, Trigger};
use crate::provider::Provider;
use crate::util::normalize_base_url;

const PROVIDER: &str = "prometheus";

#[derive(Debug)]
pub struct PrometheusProvider {
    name: String,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl PrometheusProvider {
    pub fn new(config: &Config) -> ProviderResult<Self> {
        if config.auth.url.trim().is_empty() {
            return Err(ProviderError::Config(
                "Prometheus URL is required".to_string(),
            ));
        }
        Ok(Self {
            name: config.name.clone(),
            base_url: normalize_base_url(&config.auth.url),
            token: RwLock::new(config.auth.token().map(str::to_string)),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn unsupported<T>(operation: &'static str) -> ProviderResult<T> {
    Err(ProviderError::not_implemented(PROVIDER, operation))
}

#[async_trait]
impl Provider for PrometheusProvider {
    async fn authenticate(&self) -> ProviderResult<()> {
        debug!("Prometheus at {} needs no session", self.base_url);
        Ok(())
    }

    fn auth_token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_auth_token(&self, token: String) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    async fn get_hosts(&self) -> ProviderResult<Vec<Host>> {
        unsupported("get_hosts")
    }

    async fn get_hosts_by_group_id(&self, _group_id: &str) -> ProviderResult<Vec<Host>> {
        unsupported("get_hosts_by_group_id")
    }

    async fn get_host_by_name(&self, _name: &str) -> ProviderResult<Option<Host>> {
        unsupported("get_host_by_name")
    }

    async fn get_host_by_id(&self, _host_id: &str) -> ProviderResult<Option<Host>> {
        unsupported("get_host_by_id")
    }

    async fn create_host(&self, _host: Host) -> ProviderResult<Host> {
        unsupported("create_host")
    }

    async fn update_host(&self, _host: Host) -> ProviderResult<Host> {
        unsupported("update_host")
    }

    async fn delete_host(&self, _host_id: &str) -> ProviderResult<()> {
        unsupported("delete_host")
    }

    async fn get_items(&self, _host_id: &str) -> ProviderResult<Vec<Item>> {
        unsupported("get_items")
    }

    async fn get_item_by_id(&self, _item_id: &str) -> ProviderResult<Option<Item>> {
        unsupported("get_item_by_id")
    }

    async fn get_item_history(
        &self,
        _item_id: &str,
        _from: i64,
        _to: i64,
    ) -> ProviderResult<Vec<Item>> {
        unsupported("get_item_history")
    }

    async fn create_item(&self, _item: Item) -> ProviderResult<Item> {
        unsupported("create_item")
    }

    async fn update_item(&self, _item: Item) -> ProviderResult<Item> {
        unsupported("update_item")
    }

    async fn delete_item(&self, _item_id: &str) -> ProviderResult<()> {
        unsupported("delete_item")
    }

    async fn get_alerts(&self) -> ProviderResult<Vec<Alert>> {
        unsupported("get_alerts")
    }

    async fn get_alerts_by_host(&self, _host_id: &str) -> ProviderResult<Vec<Alert>> {
        unsupported("get_alerts_by_host")
    }

    async fn get_triggers(&self) -> ProviderResult<Vec<Trigger>> {
        unsupported("get_triggers")
    }

    async fn get_triggers_by_host(&self, _host_id: &str) -> ProviderResult<Vec<Trigger>> {
        unsupported("get_triggers_by_host")
    }

    async fn get_template_ids_by_name(&self, _name: &str) -> ProviderResult<Vec<String>> {
        unsupported("get_template_ids_by_name")
    }

    async fn get_host_groups(&self) -> ProviderResult<Vec<String>> {
        unsupported("get_host_groups")
    }

    async fn get_host_groups_details(&self) -> ProviderResult<Vec<HostGroup>> {
        unsupported("get_host_groups_details")
    }

    async fn get_host_group_by_name(&self, _name: &str) -> ProviderResult<Option<HostGroup>> {
        unsupported("get_host_group_by_name")
    }

    async fn create_host_group(&self, _name: &str) -> ProviderResult<String> {
        unsupported("create_host_group")
    }

    async fn update_host_group(&self, _id: &str, _name: &str) -> ProviderResult<()> {
        unsupported("update_host_group")
    }

    async fn delete_host_group(&self, _id: &str) -> ProviderResult<()> {
        unsupported("delete_host_group")
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn monitor_type(&self) -> MonitorType {
        MonitorType::Prometheus
    }
}
