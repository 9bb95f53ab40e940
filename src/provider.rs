//! Provider trait definition
//!
//! This module defines the `Provider` trait that every monitoring backend
//! (Zabbix, SNMP, Prometheus) implements.

use async_trait::async_trait;

use crate::config::MonitorType;
use crate::error::ProviderResult;
use crate::models::{Alert, Host, HostGroup, Item, Trigger};

/// Capability set of a monitoring backend
///
/// Callers authenticate once, then issue reads and writes; every method
/// returns normalized domain types or a [`ProviderError`](crate::error::ProviderError).
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync`. Session state lives behind
/// interior mutability, so all methods take `&self` and one provider can
/// serve concurrent callers.
///
/// ## Partial backends
///
/// A backend that cannot perform an operation returns
/// `ProviderError::NotImplemented` so callers can tell "empty" from
/// "unsupported". The SNMP backend is the documented exception: writes,
/// alerts, triggers and groups are meaningless for a polled device and
/// answer with empty success.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Establish or validate a session
    ///
    /// Idempotent: when the held session is still valid this is a single
    /// cheap verification call, never a second login.
    async fn authenticate(&self) -> ProviderResult<()>;

    /// Current session token, if any
    fn auth_token(&self) -> Option<String>;

    /// Rehydrate a previously persisted session token
    fn set_auth_token(&self, token: String);

    async fn get_hosts(&self) -> ProviderResult<Vec<Host>>;

    async fn get_hosts_by_group_id(&self, group_id: &str) -> ProviderResult<Vec<Host>>;

    async fn get_host_by_name(&self, name: &str) -> ProviderResult<Option<Host>>;

    async fn get_host_by_id(&self, host_id: &str) -> ProviderResult<Option<Host>>;

    /// Create a host, returning it with the backend-assigned id filled in
    async fn create_host(&self, host: Host) -> ProviderResult<Host>;

    async fn update_host(&self, host: Host) -> ProviderResult<Host>;

    async fn delete_host(&self, host_id: &str) -> ProviderResult<()>;

    /// Current values of every item of a host
    ///
    /// For SNMP the host id is the device address and this is a live poll.
    async fn get_items(&self, host_id: &str) -> ProviderResult<Vec<Item>>;

    async fn get_item_by_id(&self, item_id: &str) -> ProviderResult<Option<Item>>;

    /// Historical values of one item between two unix timestamps, newest first
    async fn get_item_history(&self, item_id: &str, from: i64, to: i64)
    -> ProviderResult<Vec<Item>>;

    async fn create_item(&self, item: Item) -> ProviderResult<Item>;

    async fn update_item(&self, item: Item) -> ProviderResult<Item>;

    async fn delete_item(&self, item_id: &str) -> ProviderResult<()>;

    async fn get_alerts(&self) -> ProviderResult<Vec<Alert>>;

    async fn get_alerts_by_host(&self, host_id: &str) -> ProviderResult<Vec<Alert>>;

    async fn get_triggers(&self) -> ProviderResult<Vec<Trigger>>;

    async fn get_triggers_by_host(&self, host_id: &str) -> ProviderResult<Vec<Trigger>>;

    async fn get_template_ids_by_name(&self, name: &str) -> ProviderResult<Vec<String>>;

    /// Names of all host groups
    async fn get_host_groups(&self) -> ProviderResult<Vec<String>>;

    async fn get_host_groups_details(&self) -> ProviderResult<Vec<HostGroup>>;

    async fn get_host_group_by_name(&self, name: &str) -> ProviderResult<Option<HostGroup>>;

    /// Get-or-create a host group by name, returning its id
    async fn create_host_group(&self, name: &str) -> ProviderResult<String>;

    async fn update_host_group(&self, id: &str, name: &str) -> ProviderResult<()>;

    async fn delete_host_group(&self, id: &str) -> ProviderResult<()>;

    /// Display name of this backend instance
    fn name(&self) -> &str;

    fn monitor_type(&self) -> MonitorType;
}
