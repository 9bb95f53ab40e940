//! SNMP sessions
//!
//! The poll algorithm only needs GET and WALK, so it talks to a
//! [`SnmpSession`]. [`UdpSessionFactory`] opens real UDP sessions through
//! `async-snmp`; tests plug in scripted ones.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_snmp::client::Retry;
use async_snmp::{Client, Oid, VarBind};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace};

use super::security::Security;
use crate::error::{ProviderError, ProviderResult};

pub const SNMP_TIMEOUT: Duration = Duration::from_secs(10);
pub const SNMP_RETRIES: u32 = 1;
/// Most OIDs sent in one GET
pub const GET_BATCH_SIZE: usize = 20;

#[async_trait]
pub trait SnmpSession: Send + Sync {
    /// Fetch the exact OIDs in one request
    async fn get(&self, oids: &[Oid]) -> ProviderResult<Vec<VarBind>>;

    /// Every variable under `root`. Stops early when `cancel` fires.
    async fn walk(&self, root: &Oid, cancel: &CancellationToken) -> ProviderResult<Vec<VarBind>>;
}

/// Opens one session per poll
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self, target: &str, security: &Security) -> ProviderResult<Box<dyn SnmpSession>>;
}

/// GETs `oids` in batches of [`GET_BATCH_SIZE`]. A rejected batch is retried
/// one OID at a time. Returns the varbinds received and the OIDs no GET could
/// fetch.
pub async fn get_batched(session: &dyn SnmpSession, oids: &[Oid]) -> (Vec<VarBind>, Vec<Oid>) {
    let mut received = Vec::with_capacity(oids.len());
    let mut unresolved = Vec::new();

    for batch in oids.chunks(GET_BATCH_SIZE) {
        match session.get(batch).await {
            Ok(varbinds) => received.extend(varbinds),
            Err(e) => {
                debug!("GET of {} OIDs failed, retrying singly: {e}", batch.len());
                for oid in batch {
                    match session.get(std::slice::from_ref(oid)).await {
                        Ok(varbinds) if !varbinds.is_empty() => received.extend(varbinds),
                        Ok(_) => unresolved.push(oid.clone()),
                        Err(e) => {
                            trace!("GET of {oid} failed: {e}");
                            unresolved.push(oid.clone());
                        }
                    }
                }
            }
        }
    }
    (received, unresolved)
}

/// `host:port` for the given device, bracketing bare IPv6 addresses.
pub fn target_address(host: &str, port: u16) -> String {
    let host = host.trim();
    if host.parse::<SocketAddr>().is_ok() {
        return host.to_string();
    }
    match host.parse::<IpAddr>() {
        Ok(IpAddr::V6(addr)) => format!("[{addr}]:{port}"),
        _ => format!("{host}:{port}"),
    }
}

#[derive(Debug, Clone)]
pub struct UdpSessionFactory {
    timeout: Duration,
    retries: u32,
}

impl Default for UdpSessionFactory {
    fn default() -> Self {
        Self {
            timeout: SNMP_TIMEOUT,
            retries: SNMP_RETRIES,
        }
    }
}

#[async_trait]
impl SessionFactory for UdpSessionFactory {
    #[instrument(skip(self, security))]
    async fn open(&self, target: &str, security: &Security) -> ProviderResult<Box<dyn SnmpSession>> {
        let client = Client::builder(target, security.to_auth())
            .timeout(self.timeout)
            .retry(Retry::fixed(self.retries, Duration::ZERO))
            .connect()
            .await
            .map_err(|e| ProviderError::Transport(format!("SNMP connect to {target} failed: {e}")))?;
        trace!("SNMP session to {target} open");
        Ok(Box::new(UdpSession { client }))
    }
}

/// Dropping the session closes its socket
pub struct UdpSession {
    client: Client,
}

#[async_trait]
impl SnmpSession for UdpSession {
    async fn get(&self, oids: &[Oid]) -> ProviderResult<Vec<VarBind>> {
        Ok(self.client.get_many(oids).await?)
    }

    async fn walk(&self, root: &Oid, cancel: &CancellationToken) -> ProviderResult<Vec<VarBind>> {
        let mut stream = self.client.walk(root.clone())?;
        let mut varbinds = Vec::new();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(ProviderError::Transport(format!("SNMP walk of {root} cancelled")));
                }
                next = stream.next() => match next {
                    Some(Ok(varbind)) => varbinds.push(varbind),
                    Some(Err(e)) => return Err(e.into()),
                    None => break,
                },
            }
        }
        Ok(varbinds)
    }
}
