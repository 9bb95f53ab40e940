//! Scripted SNMP agent for unit tests

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_snmp::{Oid, Value, VarBind};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::security::Security;
use super::session::{SessionFactory, SnmpSession};
use crate::error::{ProviderError, ProviderResult};

/// Answers GETs per requested OID and WALKs per root, recording every call.
#[derive(Default)]
pub struct ScriptedSession {
    /// Every GET is rejected
    pub get_fails: bool,
    /// A GET that asks for any of these OIDs is rejected as a whole
    pub failing_gets: Vec<String>,
    /// Values by OID; anything else comes back as `NoSuchObject`
    pub get_values: HashMap<String, Value>,
    pub walks: HashMap<String, Vec<VarBind>>,
    pub failing_walks: Vec<String>,
    /// Size of every GET request
    pub gets: Mutex<Vec<usize>>,
    pub walked: Mutex<Vec<String>>,
}

impl ScriptedSession {
    pub fn walked(&self) -> Vec<String> {
        self.walked.lock().unwrap().clone()
    }

    pub fn gets(&self) -> Vec<usize> {
        self.gets.lock().unwrap().clone()
    }
}

#[async_trait]
impl SnmpSession for Arc<ScriptedSession> {
    async fn get(&self, oids: &[Oid]) -> ProviderResult<Vec<VarBind>> {
        self.gets.lock().unwrap().push(oids.len());
        let rejected = oids
            .iter()
            .any(|oid| self.failing_gets.contains(&oid.to_string()));
        if self.get_fails || rejected {
            return Err(ProviderError::Transport("noSuchName".to_string()));
        }
        Ok(oids
            .iter()
            .map(|oid| {
                let value = self
                    .get_values
                    .get(&oid.to_string())
                    .cloned()
                    .unwrap_or(Value::NoSuchObject);
                VarBind::new(oid.clone(), value)
            })
            .collect())
    }

    async fn walk(&self, root: &Oid, _cancel: &CancellationToken) -> ProviderResult<Vec<VarBind>> {
        let key = root.to_string();
        self.walked.lock().unwrap().push(key.clone());
        if self.failing_walks.contains(&key) {
            return Err(ProviderError::Transport("timeout".to_string()));
        }
        Ok(self.walks.get(&key).cloned().unwrap_or_default())
    }
}

pub struct ScriptedFactory(pub Arc<ScriptedSession>);

#[async_trait]
impl SessionFactory for ScriptedFactory {
    async fn open(&self, _target: &str, _security: &Security) -> ProviderResult<Box<dyn SnmpSession>> {
        Ok(Box::new(self.0.clone()))
    }
}

pub fn oid(s: &str) -> Oid {
    Oid::parse(s).unwrap()
}

pub fn vb(s: &str, value: Value) -> VarBind {
    VarBind::new(oid(s), value)
}
