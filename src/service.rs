//! Provider registry
//!
//! Keeps named [`Client`]s and fans read requests out to all of them.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::client::Client;
use crate::config::Config;
use crate::error::{ProviderError, ProviderResult};
use crate::models::{Alert, Host, Trigger};
use crate::provider::Provider;

/// Outcome of one provider's health check
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub error: Option<String>,
    pub checked_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProviderStats {
    pub monitor_type: String,
    pub hosts: usize,
    pub alerts: usize,
    pub triggers: usize,
    /// Failures while counting, e.g. an unsupported operation
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RegistryStats {
    pub providers: usize,
    pub total_hosts: usize,
    pub total_alerts: usize,
    pub total_triggers: usize,
    pub per_provider: BTreeMap<String, ProviderStats>,
}

#[derive(Clone, Default)]
pub struct ProviderRegistry {
    clients: Arc<RwLock<HashMap<String, Arc<Client>>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a client under its provider name, returning the one it replaced.
    /// The name is the registry key, so it must not be blank.
    pub async fn register(&self, client: Client) -> ProviderResult<Option<Arc<Client>>> {
        let name = client.name().to_string();
        if name.trim().is_empty() {
            return Err(ProviderError::Config(format!(
                "cannot register an unnamed {} provider",
                client.monitor_type()
            )));
        }
        debug!("registering provider {name:?}");
        Ok(self.clients.write().await.insert(name, Arc::new(client)))
    }

    pub async fn get(&self, name: &str) -> Option<Arc<Client>> {
        self.clients.read().await.get(name).cloned()
    }

    /// Registered provider names, sorted
    pub async fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.clients.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn remove(&self, name: &str) -> Option<Arc<Client>> {
        self.clients.write().await.remove(name)
    }

    /// Builds and authenticates a client per config. Clients that fail either
    /// step are left out and reported back.
    #[instrument(skip_all, fields(count = configs.len()))]
    pub async fn initialize(&self, configs: Vec<Config>) -> Vec<(String, ProviderError)> {
        let mut failures = Vec::new();
        for config in configs {
            let name = config.name.clone();
            let client = match Client::new(config) {
                Ok(client) => client,
                Err(e) => {
                    warn!("could not create provider {name:?}: {e}");
                    failures.push((name, e));
                    continue;
                }
            };
            if let Err(e) = client.authenticate().await {
                warn!("could not authenticate provider {name:?}: {e}");
                failures.push((name, e));
                continue;
            }
            if let Err(e) = self.register(client).await {
                warn!("could not register provider {name:?}: {e}");
                failures.push((name, e));
            }
        }
        info!("{} providers ready, {} failed", self.clients.read().await.len(), failures.len());
        failures
    }

    async fn snapshot(&self) -> Vec<(String, Arc<Client>)> {
        let mut clients: Vec<(String, Arc<Client>)> = self
            .clients
            .read()
            .await
            .iter()
            .map(|(name, client)| (name.clone(), client.clone()))
            .collect();
        clients.sort_by(|a, b| a.0.cmp(&b.0));
        clients
    }

    /// Runs `op` against every client concurrently. Failing providers are
    /// logged and skipped; the call only fails when all of them do.
    async fn fan_out<T, F, Fut>(&self, what: &str, op: F) -> ProviderResult<BTreeMap<String, T>>
    where
        F: Fn(Arc<Client>) -> Fut,
        Fut: Future<Output = ProviderResult<T>>,
    {
        let clients = self.snapshot().await;
        let results = join_all(clients.into_iter().map(|(name, client)| {
            let fut = op(client);
            async move { (name, fut.await) }
        }))
        .await;

        let mut collected = BTreeMap::new();
        let mut last_error = None;
        for (name, result) in results {
            match result {
                Ok(value) => {
                    collected.insert(name, value);
                }
                Err(e) => {
                    warn!("{what} from provider {name:?} failed: {e}");
                    last_error = Some(ProviderError::Context {
                        context: format!("{what} from provider {name:?}"),
                        source: Box::new(e),
                    });
                }
            }
        }

        match last_error {
            Some(e) if collected.is_empty() => Err(e),
            _ => Ok(collected),
        }
    }

    pub async fn all_hosts(&self) -> ProviderResult<BTreeMap<String, Vec<Host>>> {
        self.fan_out("hosts", |client| async move { client.get_hosts().await })
            .await
    }

    pub async fn all_alerts(&self) -> ProviderResult<BTreeMap<String, Vec<Alert>>> {
        self.fan_out("alerts", |client| async move { client.get_alerts().await })
            .await
    }

    pub async fn all_triggers(&self) -> ProviderResult<BTreeMap<String, Vec<Trigger>>> {
        self.fan_out("triggers", |client| async move { client.get_triggers().await })
            .await
    }

    /// Authenticates every provider
    pub async fn health_check(&self) -> BTreeMap<String, HealthStatus> {
        let clients = self.snapshot().await;
        let checks = join_all(clients.into_iter().map(|(name, client)| async move {
            let result = client.authenticate().await;
            let status = HealthStatus {
                healthy: result.is_ok(),
                error: result.err().map(|e| e.to_string()),
                checked_at: chrono::Utc::now(),
            };
            (name, status)
        }))
        .await;
        checks.into_iter().collect()
    }

    pub async fn stats(&self) -> RegistryStats {
        let clients = self.snapshot().await;
        let per_provider = join_all(clients.into_iter().map(|(name, client)| async move {
            let mut stats = ProviderStats {
                monitor_type: client.monitor_type().to_string(),
                ..Default::default()
            };
            let (hosts, alerts, triggers) =
                tokio::join!(client.get_hosts(), client.get_alerts(), client.get_triggers());
            stats.hosts = count(hosts, &mut stats.errors);
            stats.alerts = count(alerts, &mut stats.errors);
            stats.triggers = count(triggers, &mut stats.errors);
            (name, stats)
        }))
        .await;

        let mut stats = RegistryStats {
            providers: per_provider.len(),
            ..Default::default()
        };
        for (name, provider) in per_provider {
            stats.total_hosts += provider.hosts;
            stats.total_alerts += provider.alerts;
            stats.total_triggers += provider.triggers;
            stats.per_provider.insert(name, provider);
        }
        stats
    }
}

fn count<T>(result: ProviderResult<Vec<T>>, errors: &mut Vec<String>) -> usize {
    match result {
        Ok(values) => values.len(),
        Err(e) => {
            errors.push(e.to_string());
            0
        }
    }
}
