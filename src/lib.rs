pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod prometheus;
pub mod provider;
pub mod service;
pub mod snmp;
pub mod util;
pub mod zabbix;

pub use client::{Backend, Client};
pub use config::{AuthConfig, Config, MonitorType, SnmpConfig, SnmpVersion};
pub use error::{ErrorKind, ProviderError, ProviderResult, ResultExt};
pub use models::{Alert, AlertStatus, Host, HostGroup, HostStatus, Item, Severity, Trigger};
pub use provider::Provider;
pub use service::ProviderRegistry;
