use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::ProviderError;

/// Which kind of backend a [`Config`] talks to.
///
/// Accepts the numeric codes used by the persistence layer (1 zabbix,
/// 2 prometheus, 3 snmp) as well as the lowercase names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "MonitorTypeRepr")]
pub enum MonitorType {
    Zabbix,
    Prometheus,
    Snmp,
}

impl MonitorType {
    pub fn code(&self) -> i64 {
        match self {
            MonitorType::Zabbix => 1,
            MonitorType::Prometheus => 2,
            MonitorType::Snmp => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorType::Zabbix => "zabbix",
            MonitorType::Prometheus => "prometheus",
            MonitorType::Snmp => "snmp",
        }
    }
}

impl fmt::Display for MonitorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<i64> for MonitorType {
    type Error = ProviderError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(MonitorType::Zabbix),
            2 => Ok(MonitorType::Prometheus),
            3 => Ok(MonitorType::Snmp),
            other => Err(ProviderError::Config(format!(
                "unsupported monitor type: {other}"
            ))),
        }
    }
}

impl FromStr for MonitorType {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(code) = s.parse::<i64>() {
            return MonitorType::try_from(code);
        }
        match s.to_ascii_lowercase().as_str() {
            "zabbix" => Ok(MonitorType::Zabbix),
            "prometheus" => Ok(MonitorType::Prometheus),
            "snmp" => Ok(MonitorType::Snmp),
            _ => Err(ProviderError::Config(format!(
                "unsupported monitor type: {s}"
            ))),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MonitorTypeRepr {
    Code(i64),
    Name(String),
}

impl TryFrom<MonitorTypeRepr> for MonitorType {
    type Error = ProviderError;

    fn try_from(repr: MonitorTypeRepr) -> Result<Self, Self::Error> {
        match repr {
            MonitorTypeRepr::Code(code) => MonitorType::try_from(code),
            MonitorTypeRepr::Name(name) => name.parse(),
        }
    }
}

/// Credentials and endpoint of a remote backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub token: Option<String>,
}

impl AuthConfig {
    /// Username and password, if both are set and non-empty.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let username = self.username.as_deref().filter(|u| !u.is_empty())?;
        let password = self.password.as_deref().filter(|p| !p.is_empty())?;
        Some((username, password))
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Display name of this backend instance
    #[serde(default)]
    pub name: String,

    #[serde(rename = "type", alias = "monitor_type")]
    pub monitor_type: MonitorType,

    pub auth: AuthConfig,

    /// Per-request timeout for HTTP backends
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Only read by the SNMP backend
    #[serde(default)]
    pub snmp: Option<SnmpConfig>,
}

impl Config {
    pub fn new(name: impl Into<String>, monitor_type: MonitorType, auth: AuthConfig) -> Self {
        Self {
            name: name.into(),
            monitor_type,
            auth,
            timeout_secs: default_timeout_secs(),
            snmp: None,
        }
    }

    pub fn with_snmp(mut self, snmp: SnmpConfig) -> Self {
        self.snmp = Some(snmp);
        self
    }

    /// Request timeout. An unset (zero) value falls back to the default.
    pub fn timeout(&self) -> Duration {
        match self.timeout_secs {
            0 => Duration::from_secs(default_timeout_secs()),
            secs => Duration::from_secs(secs),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnmpVersion {
    V1,
    #[default]
    V2c,
    V3,
}

/// Per-device SNMP settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnmpConfig {
    #[serde(default = "default_community")]
    pub community: String,
    #[serde(default)]
    pub version: SnmpVersion,
    #[serde(default = "default_snmp_port")]
    pub port: u16,

    #[serde(default)]
    pub v3_user: String,
    #[serde(default)]
    pub v3_auth_pass: String,
    #[serde(default)]
    pub v3_priv_pass: String,
    /// MD5, SHA, SHA224, SHA256, SHA384 or SHA512
    #[serde(default)]
    pub v3_auth_protocol: String,
    /// DES, AES, AES192 or AES256
    #[serde(default)]
    pub v3_priv_protocol: String,
    /// NoAuthNoPriv, AuthNoPriv or AuthPriv
    #[serde(default)]
    pub v3_security_level: String,

    /// OID -> display name; replaces the vendor defaults when non-empty
    #[serde(default)]
    pub custom_oids: HashMap<String, String>,

    /// Walk interface, routing, neighbor and hardware tables after the poll
    #[serde(default = "default_discovery")]
    pub discovery: bool,
}

impl Default for SnmpConfig {
    fn default() -> Self {
        Self {
            community: default_community(),
            version: SnmpVersion::default(),
            port: default_snmp_port(),
            v3_user: String::new(),
            v3_auth_pass: String::new(),
            v3_priv_pass: String::new(),
            v3_auth_protocol: String::new(),
            v3_priv_protocol: String::new(),
            v3_security_level: String::new(),
            custom_oids: HashMap::new(),
            discovery: default_discovery(),
        }
    }
}

fn default_community() -> String {
    String::from("public")
}

fn default_snmp_port() -> u16 {
    161
}

fn default_discovery() -> bool {
    true
}

/// Contents of a probe configuration file
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeConfig {
    pub monitors: Vec<Config>,
}

impl ProbeConfig {
    pub fn find(&self, name: &str) -> Option<&Config> {
        self.monitors.iter().find(|config| config.name == name)
    }
}

pub fn read_config_file(path: &str) -> anyhow::Result<ProbeConfig> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))
        .inspect(|config: &ProbeConfig| trace!("loaded {} monitor configs", config.monitors.len()))
}
