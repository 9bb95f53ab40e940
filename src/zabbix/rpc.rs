//! Zabbix JSON-RPC transport
//!
//! Owns the HTTP client, the request id counter and the session. The
//! session records where the token travels: Zabbix up to 5.x wants it in
//! the body `auth` field, 6.0+ rejects that and wants a Bearer header.
//! [`RpcClient::call`] is the only place that sniffs for the difference.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, trace};

use crate::config::Config;
use crate::error::{ProviderError, ProviderResult};
use crate::util::normalize_base_url;

pub(crate) const LOGIN_METHOD: &str = "user.login";

const API_PATH: &str = "/api_jsonrpc.php";

/// Where the session token is placed on outgoing requests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthTransport {
    #[default]
    Unauthenticated,
    /// `auth` field in the request body
    Legacy,
    /// `Authorization: Bearer` header
    Bearer,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Session {
    pub token: Option<String>,
    pub transport: AuthTransport,
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: &'a Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    auth: Option<&'a str>,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RpcError {
    #[serde(default, deserialize_with = "de_i64")]
    pub code: i64,
    #[serde(default, deserialize_with = "de_string")]
    pub message: String,
    #[serde(default, deserialize_with = "de_string")]
    pub data: String,
}

impl From<RpcError> for ProviderError {
    fn from(err: RpcError) -> Self {
        ProviderError::Api {
            system: "Zabbix",
            code: err.code,
            message: err.message,
            data: err.data,
        }
    }
}

/// True when the server rejected body-auth and wants the Bearer header.
pub(crate) fn wants_bearer(data: &str) -> bool {
    data.contains("unexpected parameter \"auth\"") || data.contains("Not authorized")
}

pub(crate) struct RpcClient {
    http: reqwest::Client,
    endpoint: String,
    next_id: AtomicU64,
    session: RwLock<Session>,
}

impl RpcClient {
    pub fn new(config: &Config) -> ProviderResult<Self> {
        if config.auth.url.trim().is_empty() {
            return Err(ProviderError::Config(
                "URL is required for Zabbix provider".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .cookie_store(true)
            .build()
            .map_err(|e| ProviderError::Config(format!("failed to build HTTP client: {e}")))?;

        let session = match config.auth.token() {
            Some(token) => Session {
                token: Some(token.to_string()),
                transport: AuthTransport::Legacy,
            },
            None => Session::default(),
        };

        Ok(Self {
            http,
            endpoint: format!("{}{API_PATH}", normalize_base_url(&config.auth.url)),
            next_id: AtomicU64::new(1),
            session: RwLock::new(session),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn session(&self) -> Session {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn token(&self) -> Option<String> {
        self.session().token
    }

    pub fn transport(&self) -> AuthTransport {
        self.session().transport
    }

    /// Replace the token. The transport restarts at `Legacy` and is
    /// re-negotiated on the next call.
    pub fn set_token(&self, token: Option<String>) {
        let mut session = self.session.write().unwrap_or_else(PoisonError::into_inner);
        session.transport = if token.is_some() {
            AuthTransport::Legacy
        } else {
            AuthTransport::Unauthenticated
        };
        session.token = token;
    }

    fn promote_to_bearer(&self, token: &str) {
        let mut session = self.session.write().unwrap_or_else(PoisonError::into_inner);
        // another caller may have swapped the token meanwhile
        if session.token.as_deref() == Some(token) {
            session.transport = AuthTransport::Bearer;
        }
    }

    /// Call `method` and decode its `result`.
    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> ProviderResult<T> {
        let result = self.call_value(method, &params).await?;
        serde_json::from_value(result)
            .map_err(|e| ProviderError::Parse(format!("{method}: {e}")))
    }

    /// Call `method` and return the raw `result`.
    ///
    /// When a held token is rejected in the body, the same request is sent
    /// once more with a Bearer header. A successful retry pins the session
    /// to `Bearer`; the retry's outcome is returned either way.
    #[instrument(skip(self, params), fields(endpoint = %self.endpoint))]
    pub async fn call_value(&self, method: &str, params: &Value) -> ProviderResult<Value> {
        let session = self.session();
        let token = match method {
            LOGIN_METHOD => None,
            _ => session.token.as_deref(),
        };
        let transport = match token {
            Some(_) if session.transport == AuthTransport::Bearer => AuthTransport::Bearer,
            Some(_) => AuthTransport::Legacy,
            None => AuthTransport::Unauthenticated,
        };

        match self.send(method, params, token, transport).await? {
            Ok(result) => Ok(result),
            Err(err) if transport == AuthTransport::Legacy && wants_bearer(&err.data) => {
                debug!("{method}: body auth rejected ({}), retrying with bearer header", err.data);
                let result = self
                    .send(method, params, token, AuthTransport::Bearer)
                    .await?
                    .map_err(ProviderError::from)?;
                if let Some(token) = token {
                    self.promote_to_bearer(token);
                }
                Ok(result)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn send(
        &self,
        method: &str,
        params: &Value,
        token: Option<&str>,
        transport: AuthTransport,
    ) -> ProviderResult<Result<Value, RpcError>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            auth: token.filter(|_| transport == AuthTransport::Legacy),
            id,
        };

        trace!("{method}: sending request {id}");

        let mut builder = self
            .http
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .json(&request);
        if let (Some(token), AuthTransport::Bearer) = (token, transport) {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Transport(format!(
                "{method}: HTTP status {status}"
            )));
        }

        let body = response.text().await?;
        let response: RpcResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::Parse(format!("{method}: {e}")))?;

        match (response.error, response.result) {
            (Some(error), _) => Ok(Err(error)),
            (None, Some(result)) => Ok(Ok(result)),
            (None, None) => Err(ProviderError::Parse(format!(
                "{method}: response carries neither result nor error"
            ))),
        }
    }
}

/// A JSON field that different Zabbix versions send either as a string
/// or as a number
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum StringOrNumber {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl StringOrNumber {
    pub fn into_string(self) -> String {
        match self {
            StringOrNumber::Str(s) => s,
            StringOrNumber::Int(i) => i.to_string(),
            StringOrNumber::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => {
                (f as i64).to_string()
            }
            StringOrNumber::Float(f) => f.to_string(),
            StringOrNumber::Bool(b) => u8::from(b).to_string(),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            StringOrNumber::Int(i) => Some(*i),
            StringOrNumber::Float(f) => Some(*f as i64),
            StringOrNumber::Bool(b) => Some(i64::from(*b)),
            StringOrNumber::Str(s) => s.trim().parse().ok(),
        }
    }
}

/// Deserializes a string-or-number field to `String`; null reads as empty.
pub fn de_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<StringOrNumber>::deserialize(deserializer)?;
    Ok(value.map(StringOrNumber::into_string).unwrap_or_default())
}

/// Deserializes a string-or-number field to `i64`; anything unparsable reads as 0.
pub fn de_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<StringOrNumber>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_i64()).unwrap_or_default())
}

/// Same as [`de_string`] for a list of ids.
pub fn de_string_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Option::<Vec<StringOrNumber>>::deserialize(deserializer)?;
    Ok(values
        .unwrap_or_default()
        .into_iter()
        .map(StringOrNumber::into_string)
        .collect())
}
