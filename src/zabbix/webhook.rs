//! Webhook media type, user binding and action setup
//!
//! Brings a Zabbix server to the state where every trigger event is POSTed
//! to a caller-chosen URL. Each resource is looked up by name first and
//! updated in place when it exists, so the routine can be re-run safely.

use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, instrument, warn};

use super::ZabbixProvider;
use super::rpc::{de_string, de_string_vec};
use crate::error::{ProviderError, ProviderResult, ResultExt};

pub const MEDIA_TYPE_NAME: &str = "Nagare Webhook";
pub const ACTION_NAME: &str = "Nagare Webhook Action";

const FALLBACK_USER: &str = "admin";

/// Zabbix media type 4 is "Webhook"
const MEDIA_TYPE_WEBHOOK: &str = "4";

const WEBHOOK_SCRIPT: &str = r#"var params = JSON.parse(value);
var req = new HttpRequest();
req.addHeader('Content-Type: application/json');
if (params.event_token) {
    req.addHeader('Authorization: Bearer ' + params.event_token);
}
var payload = {
    subject: params.subject,
    message: params.message,
    severity: params.severity,
    status: params.status,
    host: params.host,
    hostid: params.hostid,
    item: params.item,
    itemid: params.itemid,
    eventid: params.eventid,
    event_token: params.event_token
};
var resp = req.post(params.url, JSON.stringify(payload));
if (req.getStatus() < 200 || req.getStatus() >= 300) {
    throw 'webhook responded with HTTP ' + req.getStatus();
}
return 'OK';"#;

/// Severity bitmask covering not classified through disaster
const ALL_SEVERITIES: &str = "63";
const ALWAYS: &str = "1-7,00:00-24:00";

/// Fields Zabbix fills in itself and rejects when echoed back in `user.update`
const SERVER_MEDIA_FIELDS: [&str; 4] = ["mediaid", "userid", "provisioned", "userdirectory_mediaid"];

/// Fields of an action filter that are read-only or derived
const SERVER_FILTER_FIELDS: [&str; 2] = ["eval_formula", "formula"];
const SERVER_CONDITION_FIELDS: [&str; 2] = ["conditionid", "actionid"];

/// Parameters of the webhook setup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookSetup {
    pub webhook_url: String,
    /// Sent as `Authorization: Bearer` by the media script; may be empty
    #[serde(default)]
    pub event_token: String,
    /// Binds the media to this user when set
    #[serde(default)]
    pub user_id: Option<String>,
    /// Otherwise the user is looked up by this name
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default = "default_media_type_name")]
    pub media_type_name: String,
    #[serde(default = "default_action_name")]
    pub action_name: String,
}

fn default_media_type_name() -> String {
    MEDIA_TYPE_NAME.to_string()
}

fn default_action_name() -> String {
    ACTION_NAME.to_string()
}

impl WebhookSetup {
    pub fn new(webhook_url: impl Into<String>, event_token: impl Into<String>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            event_token: event_token.into(),
            user_id: None,
            username: None,
            media_type_name: default_media_type_name(),
            action_name: default_action_name(),
        }
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }
}

/// Outcome of one reconciliation step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "id", rename_all = "lowercase")]
pub enum Upserted {
    Created(String),
    Updated(String),
}

impl Upserted {
    pub fn id(&self) -> &str {
        match self {
            Upserted::Created(id) | Upserted::Updated(id) => id,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, Upserted::Created(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookSetupOutcome {
    pub media_type: Upserted,
    pub user_id: String,
    /// False when the user already had the media bound
    pub media_bound: bool,
    pub action: Upserted,
}

/// Looks a resource up and updates it in place, or creates it when the
/// lookup finds nothing.
pub async fn upsert_by_lookup<UF, CF>(
    lookup: impl Future<Output = ProviderResult<Option<String>>>,
    update: impl FnOnce(String) -> UF,
    create: impl FnOnce() -> CF,
) -> ProviderResult<Upserted>
where
    UF: Future<Output = ProviderResult<()>>,
    CF: Future<Output = ProviderResult<String>>,
{
    match lookup.await? {
        Some(id) => {
            update(id.clone()).await?;
            Ok(Upserted::Updated(id))
        }
        None => create().await.map(Upserted::Created),
    }
}

#[derive(Debug, Deserialize)]
struct RawMediaType {
    #[serde(default, deserialize_with = "de_string")]
    mediatypeid: String,
}

#[derive(Debug, Deserialize)]
struct RawAction {
    #[serde(default, deserialize_with = "de_string")]
    actionid: String,
    #[serde(default)]
    filter: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct RawUser {
    #[serde(default, deserialize_with = "de_string")]
    userid: String,
    #[serde(default, deserialize_with = "de_string")]
    username: String,
    #[serde(default, deserialize_with = "de_string")]
    alias: String,
    #[serde(default)]
    medias: Vec<Value>,
}

impl RawUser {
    /// Login name, whichever field this Zabbix version uses for it
    fn login(&self, field: &str) -> &str {
        match field {
            "alias" => &self.alias,
            _ => &self.username,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct CreatedIds {
    #[serde(default, deserialize_with = "de_string_vec")]
    mediatypeids: Vec<String>,
    #[serde(default, deserialize_with = "de_string_vec")]
    actionids: Vec<String>,
}

fn first_created(ids: Vec<String>, what: &str) -> ProviderResult<String> {
    ids.into_iter()
        .next()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ProviderError::Parse(format!("no {what} ID returned after creation")))
}

fn media_type_params(setup: &WebhookSetup) -> Value {
    let parameter = |name: &str, value: &str| json!({ "name": name, "value": value });
    json!({
        "name": setup.media_type_name,
        "type": MEDIA_TYPE_WEBHOOK,
        "script": WEBHOOK_SCRIPT,
        "timeout": "30s",
        "process_tags": "0",
        "parameters": [
            parameter("url", &setup.webhook_url),
            parameter("event_token", &setup.event_token),
            parameter("subject", "{ALERT.SUBJECT}"),
            parameter("message", "{ALERT.MESSAGE}"),
            parameter("severity", "{EVENT.SEVERITY}"),
            parameter("status", "{EVENT.STATUS}"),
            parameter("host", "{HOST.HOST}"),
            parameter("hostid", "{HOST.ID}"),
            parameter("item", "{ITEM.NAME}"),
            parameter("itemid", "{ITEM.ID}"),
            parameter("eventid", "{EVENT.ID}"),
        ],
        "message_templates": [
            {
                "eventsource": "0",
                "recovery": "0",
                "subject": "Problem: {EVENT.NAME}",
                "message": "Problem started at {EVENT.TIME} on {EVENT.DATE}\nProblem name: {EVENT.NAME}\nHost: {HOST.NAME}\nSeverity: {EVENT.SEVERITY}\nOriginal problem ID: {EVENT.ID}",
            },
            {
                "eventsource": "0",
                "recovery": "1",
                "subject": "Resolved: {EVENT.NAME}",
                "message": "Problem has been resolved at {EVENT.RECOVERY.TIME} on {EVENT.RECOVERY.DATE}\nProblem name: {EVENT.NAME}\nHost: {HOST.NAME}\nSeverity: {EVENT.SEVERITY}\nOriginal problem ID: {EVENT.ID}",
            },
            {
                "eventsource": "0",
                "recovery": "2",
                "subject": "Updated problem: {EVENT.NAME}",
                "message": "{USER.FULLNAME} {EVENT.UPDATE.ACTION} problem at {EVENT.UPDATE.DATE} {EVENT.UPDATE.TIME}.\n{EVENT.UPDATE.MESSAGE}\n\nCurrent problem status is {EVENT.STATUS}",
            },
        ],
    })
}

/// Existing media entries, minus the server-populated fields, followed by
/// a new binding to `media_type_id`.
pub fn merge_user_medias(existing: &[Value], media_type_id: &str, sendto: &str) -> Vec<Value> {
    let mut medias: Vec<Value> = existing
        .iter()
        .map(|media| {
            let mut media = media.clone();
            if let Some(fields) = media.as_object_mut() {
                for field in SERVER_MEDIA_FIELDS {
                    fields.remove(field);
                }
            }
            media
        })
        .collect();

    medias.push(json!({
        "mediatypeid": media_type_id,
        "sendto": sendto,
        "active": "0",
        "severity": ALL_SEVERITIES,
        "period": ALWAYS,
    }));
    medias
}

fn has_media(medias: &[Value], media_type_id: &str) -> bool {
    medias.iter().any(|media| match media.get("mediatypeid") {
        Some(Value::String(id)) => id == media_type_id,
        Some(Value::Number(id)) => id.to_string() == media_type_id,
        _ => false,
    })
}

/// Strips read-only fields from a filter cloned off another action.
pub fn sanitize_filter(mut filter: Value) -> Value {
    if let Some(fields) = filter.as_object_mut() {
        for field in SERVER_FILTER_FIELDS {
            fields.remove(field);
        }
        // custom expressions need the formula we just dropped
        let custom = fields
            .get("evaltype")
            .is_some_and(|v| v.as_str() == Some("3") || v.as_i64() == Some(3));
        if custom {
            fields.insert("evaltype".to_string(), json!("0"));
        }
        if let Some(Value::Array(conditions)) = fields.get_mut("conditions") {
            for condition in conditions.iter_mut().filter_map(Value::as_object_mut) {
                for field in SERVER_CONDITION_FIELDS {
                    condition.remove(field);
                }
            }
        }
    }
    filter
}

/// Trigger severity >= not classified, i.e. every trigger event
fn default_filter() -> Value {
    json!({
        "evaltype": "0",
        "conditions": [{ "conditiontype": "4", "operator": "5", "value": "0" }],
    })
}

fn action_operations(media_type_id: &str, user_id: &str) -> Value {
    let message = json!({
        "operationtype": "0",
        "opmessage_usr": [{ "userid": user_id }],
        "opmessage": { "default_msg": "1", "mediatypeid": media_type_id },
    });

    let mut operation = message.clone();
    if let Some(fields) = operation.as_object_mut() {
        fields.insert("esc_period".to_string(), json!("0"));
        fields.insert("esc_step_from".to_string(), json!("1"));
        fields.insert("esc_step_to".to_string(), json!("1"));
    }

    json!({
        "operations": [operation],
        "recovery_operations": [message.clone()],
        "update_operations": [message],
    })
}

impl ZabbixProvider {
    /// Create or refresh the webhook media type, bind it to a user and
    /// create or refresh the action that routes trigger events through it.
    #[instrument(skip_all, fields(url = %setup.webhook_url))]
    pub async fn setup_webhook_media_action_and_user(
        &self,
        setup: &WebhookSetup,
    ) -> ProviderResult<WebhookSetupOutcome> {
        if setup.webhook_url.trim().is_empty() {
            return Err(ProviderError::InvalidInput(
                "webhook URL is required".to_string(),
            ));
        }

        let media_type = self.ensure_media_type(setup).await?;
        let user_id = self.resolve_user(setup).await?;
        let media_bound = self
            .ensure_user_media(&user_id, media_type.id(), "nagare")
            .await?;
        let action = self.ensure_action(setup, media_type.id(), &user_id).await?;

        info!(
            "webhook ready: media type {} ({}), user {user_id}, action {} ({})",
            media_type.id(),
            if media_type.was_created() { "created" } else { "updated" },
            action.id(),
            if action.was_created() { "created" } else { "updated" },
        );

        Ok(WebhookSetupOutcome {
            media_type,
            user_id,
            media_bound,
            action,
        })
    }

    pub async fn ensure_media_type(&self, setup: &WebhookSetup) -> ProviderResult<Upserted> {
        let params = &media_type_params(setup);

        let lookup = async {
            let found: Vec<RawMediaType> = self
                .rpc()
                .call(
                    "mediatype.get",
                    json!({
                        "output": ["mediatypeid", "name"],
                        "filter": { "name": [setup.media_type_name] },
                    }),
                )
                .await
                .context("failed to check media type")?;
            Ok::<_, ProviderError>(found.into_iter().map(|m| m.mediatypeid).find(|id| !id.is_empty()))
        };

        let update = move |id: String| {
            let mut params = params.clone();
            params["mediatypeid"] = json!(id);
            async move {
                self.rpc()
                    .call_value("mediatype.update", &params)
                    .await
                    .context("failed to update media type")
                    .map(|_| ())
            }
        };

        let create = move || async move {
            let created: CreatedIds = self
                .rpc()
                .call("mediatype.create", params.clone())
                .await
                .context("failed to create media type")?;
            first_created(created.mediatypeids, "media type")
        };

        upsert_by_lookup(lookup, update, create).await
    }

    /// Explicit id, else the configured user by login name, else any admin,
    /// else the first user the server returns.
    pub async fn resolve_user(&self, setup: &WebhookSetup) -> ProviderResult<String> {
        if let Some(user_id) = setup.user_id.as_deref().filter(|id| !id.is_empty()) {
            return Ok(user_id.to_string());
        }

        if let Some(username) = setup.username.as_deref().filter(|u| !u.is_empty()) {
            // "username" since 5.4, "alias" before
            for field in ["username", "alias"] {
                let mut filter = serde_json::Map::new();
                filter.insert(field.to_string(), json!([username]));
                let result = self
                    .rpc()
                    .call::<Vec<RawUser>>(
                        "user.get",
                        json!({ "output": "extend", "filter": Value::Object(filter) }),
                    )
                    .await;

                match result {
                    Ok(users) => {
                        if let Some(user) = users.iter().find(|u| u.login(field) == username) {
                            return Ok(user.userid.clone());
                        }
                    }
                    Err(e) => debug!("user lookup by {field} failed: {e}"),
                }
            }
            warn!("user {username} not found, falling back to an admin user");
        }

        let users: Vec<RawUser> = self
            .rpc()
            .call("user.get", json!({ "output": "extend" }))
            .await
            .context("failed to list users")?;

        users
            .iter()
            .find(|u| {
                u.username.eq_ignore_ascii_case(FALLBACK_USER)
                    || u.alias.eq_ignore_ascii_case(FALLBACK_USER)
            })
            .or_else(|| users.first())
            .map(|u| u.userid.clone())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                ProviderError::InvalidInput("no Zabbix user available for the webhook".to_string())
            })
    }

    /// Binds the media type to the user unless it already is. Returns
    /// whether a binding was added.
    pub async fn ensure_user_media(
        &self,
        user_id: &str,
        media_type_id: &str,
        sendto: &str,
    ) -> ProviderResult<bool> {
        let users: Vec<RawUser> = self
            .rpc()
            .call(
                "user.get",
                json!({
                    "output": ["userid"],
                    "userids": [user_id],
                    "selectMedias": "extend",
                }),
            )
            .await
            .context("failed to read user media")?;

        let existing = users.into_iter().next().map(|u| u.medias).unwrap_or_default();
        if has_media(&existing, media_type_id) {
            debug!("user {user_id} already has media type {media_type_id}");
            return Ok(false);
        }

        let medias = merge_user_medias(&existing, media_type_id, sendto);
        let params = json!({ "userid": user_id, "medias": medias });
        match self.rpc().call_value("user.update", &params).await {
            Ok(_) => Ok(true),
            Err(e) if e.to_string().contains("unexpected parameter \"medias\"") => {
                // before 5.2 the field is called user_medias
                let params = json!({ "userid": user_id, "user_medias": medias });
                self.rpc()
                    .call_value("user.update", &params)
                    .await
                    .context("failed to bind media to user")
                    .map(|_| true)
            }
            Err(e) => Err(e).context("failed to bind media to user"),
        }
    }

    pub async fn ensure_action(
        &self,
        setup: &WebhookSetup,
        media_type_id: &str,
        user_id: &str,
    ) -> ProviderResult<Upserted> {
        let operations = &action_operations(media_type_id, user_id);

        let lookup = async {
            let found: Vec<RawAction> = self
                .rpc()
                .call(
                    "action.get",
                    json!({
                        "output": ["actionid", "name"],
                        "filter": { "name": [setup.action_name] },
                    }),
                )
                .await
                .context("failed to check action")?;
            Ok::<_, ProviderError>(found.into_iter().map(|a| a.actionid).find(|id| !id.is_empty()))
        };

        // the existing filter is left alone
        let update = move |id: String| {
            let mut params = operations.clone();
            params["actionid"] = json!(id);
            async move {
                self.rpc()
                    .call_value("action.update", &params)
                    .await
                    .context("failed to update action")
                    .map(|_| ())
            }
        };

        let create = move || async move {
            let filter = match self.trigger_action_filter().await {
                Some(filter) => filter,
                None => default_filter(),
            };
            let mut params = operations.clone();
            params["name"] = json!(setup.action_name);
            params["eventsource"] = json!("0");
            params["status"] = json!("0");
            params["esc_period"] = json!("1h");
            params["filter"] = filter;

            let created: CreatedIds = self
                .rpc()
                .call("action.create", params)
                .await
                .context("failed to create action")?;
            first_created(created.actionids, "action")
        };

        upsert_by_lookup(lookup, update, create).await
    }

    /// Filter of an enabled trigger action, cleaned for re-use.
    async fn trigger_action_filter(&self) -> Option<Value> {
        let result = self
            .rpc()
            .call::<Vec<RawAction>>(
                "action.get",
                json!({
                    "output": ["actionid", "name"],
                    "selectFilter": "extend",
                    "filter": { "eventsource": "0", "status": "0" },
                }),
            )
            .await;

        match result {
            Ok(actions) => actions
                .into_iter()
                .filter_map(|action| action.filter)
                .find(|filter| filter.get("conditions").is_some())
                .map(sanitize_filter),
            Err(e) => {
                debug!("no trigger action filter to clone: {e}");
                None
            }
        }
    }
}
