//! Provider-agnostic shapes every backend must produce.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostStatus {
    Up,
    Down,
    #[default]
    Unknown,
}

impl HostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HostStatus::Up => "up",
            HostStatus::Down => "down",
            HostStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for HostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A monitored device as known to the remote backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Host {
    /// Backend-assigned identifier
    pub id: String,
    pub name: String,
    pub description: String,
    pub status: HostStatus,
    /// 1 when monitoring is enabled on the backend, 0 otherwise
    pub enabled: u8,
    pub ip_address: String,

    /// Backend-specific side channel (group ids, interface type, status reason)
    pub metadata: HashMap<String, String>,
}

impl Host {
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

/// A single metric bound to one host
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub host_id: String,
    pub name: String,
    pub key: String,
    pub item_type: String,
    /// Numeric and text values are both carried as text
    pub value: String,
    pub units: String,
    pub value_type: String,
    pub delay: String,
    pub status: String,
    /// Unix seconds
    pub timestamp: i64,
    pub description: String,
    pub interface_id: String,
    pub metadata: HashMap<String, String>,
}

impl Item {
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Information,
    Warning,
    Average,
    High,
    Disaster,
}

impl Severity {
    /// Maps the Zabbix-style numeric scale (1..5). Unknown codes, including
    /// "not classified" (0), read as information.
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "5" => Severity::Disaster,
            "4" => Severity::High,
            "3" => Severity::Average,
            "2" => Severity::Warning,
            _ => Severity::Information,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Disaster => "disaster",
            Severity::High => "high",
            Severity::Average => "average",
            Severity::Warning => "warning",
            Severity::Information => "information",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    #[default]
    Problem,
    Resolved,
}

/// An active or historical problem event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub host_id: String,
    pub name: String,
    pub severity: Severity,
    pub status: AlertStatus,
    pub description: String,
    pub timestamp: i64,
}

/// A rule definition that produces alerts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub id: String,
    pub name: String,
    pub expression: String,
    pub priority: Severity,
    /// "problem" or "ok"
    pub status: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostGroup {
    pub id: String,
    pub name: String,
}
