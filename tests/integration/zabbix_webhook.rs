//! Webhook media type, user media and action reconciliation
//!
//! These tests verify:
//! - A first run creates the media type and action and binds the media
//! - A second run updates in place and never duplicates the user media
//! - A cloned action filter is cleaned before re-use

use nagare_monitors::zabbix::webhook::Upserted;
use nagare_monitors::zabbix::{WebhookSetup, WebhookSetupOutcome, ZabbixProvider};
use nagare_monitors::ErrorKind;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::body_partial_json;
use wiremock::MockServer;

use crate::helpers::*;

const HOOK_URL: &str = "https://nagare.example.com/api/v1/alerts/webhook";

fn setup() -> WebhookSetup {
    WebhookSetup::new(HOOK_URL, "evt-token")
}

async fn provider(server: &MockServer) -> ZabbixProvider {
    ZabbixProvider::new(&zabbix_config_with_token(server, "api-token")).unwrap()
}

/// Users known to the server; the admin is picked as fallback
async fn mount_users(server: &MockServer, medias: serde_json::Value) {
    rpc("user.get")
        .and(body_partial_json(json!({ "params": { "selectMedias": "extend" } })))
        .respond_with(rpc_result(json!([{ "userid": "1", "medias": medias }])))
        .mount(server)
        .await;
    rpc("user.get")
        .respond_with(rpc_result(json!([
            { "userid": "3", "username": "guest" },
            { "userid": "1", "username": "Admin" }
        ])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_first_run_creates_everything() {
    let server = MockServer::start().await;
    rpc("mediatype.get")
        .respond_with(rpc_result(json!([])))
        .mount(&server)
        .await;
    rpc("mediatype.create")
        .and(body_partial_json(json!({
            "params": {
                "name": "Nagare Webhook",
                "type": "4",
                "parameters": [
                    { "name": "url", "value": HOOK_URL },
                    { "name": "event_token", "value": "evt-token" }
                ]
            }
        })))
        .respond_with(rpc_result(json!({ "mediatypeids": ["31"] })))
        .expect(1)
        .mount(&server)
        .await;
    mount_users(&server, json!([])).await;
    rpc("user.update")
        .and(body_partial_json(json!({
            "params": { "userid": "1", "medias": [{ "mediatypeid": "31", "sendto": "nagare" }] }
        })))
        .respond_with(rpc_result(json!({ "userids": ["1"] })))
        .expect(1)
        .mount(&server)
        .await;
    rpc("action.get")
        .and(body_partial_json(json!({ "params": { "selectFilter": "extend" } })))
        .respond_with(rpc_result(json!([])))
        .mount(&server)
        .await;
    rpc("action.get")
        .respond_with(rpc_result(json!([])))
        .mount(&server)
        .await;
    rpc("action.create")
        .and(body_partial_json(json!({
            "params": {
                "name": "Nagare Webhook Action",
                "eventsource": "0",
                "filter": { "evaltype": "0", "conditions": [{ "conditiontype": "4", "operator": "5" }] },
                "operations": [{ "opmessage_usr": [{ "userid": "1" }], "opmessage": { "mediatypeid": "31" } }]
            }
        })))
        .respond_with(rpc_result(json!({ "actionids": ["7"] })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = provider(&server)
        .await
        .setup_webhook_media_action_and_user(&setup())
        .await
        .unwrap();

    assert_eq!(
        outcome,
        WebhookSetupOutcome {
            media_type: Upserted::Created("31".to_string()),
            user_id: "1".to_string(),
            media_bound: true,
            action: Upserted::Created("7".to_string()),
        }
    );
}

#[tokio::test]
async fn test_second_run_updates_in_place() {
    let server = MockServer::start().await;
    rpc("mediatype.get")
        .respond_with(rpc_result(json!([{ "mediatypeid": "31", "name": "Nagare Webhook" }])))
        .mount(&server)
        .await;
    rpc("mediatype.update")
        .and(body_partial_json(json!({ "params": { "mediatypeid": "31" } })))
        .respond_with(rpc_result(json!({ "mediatypeids": ["31"] })))
        .expect(1)
        .mount(&server)
        .await;
    rpc("mediatype.create")
        .respond_with(rpc_result(json!({ "mediatypeids": ["32"] })))
        .expect(0)
        .mount(&server)
        .await;
    mount_users(
        &server,
        json!([{ "mediaid": "9", "mediatypeid": "31", "sendto": "nagare" }]),
    )
    .await;
    rpc("user.update")
        .respond_with(rpc_result(json!({ "userids": ["1"] })))
        .expect(0)
        .mount(&server)
        .await;
    rpc("action.get")
        .respond_with(rpc_result(json!([{ "actionid": "7", "name": "Nagare Webhook Action" }])))
        .mount(&server)
        .await;
    rpc("action.update")
        .and(body_partial_json(json!({ "params": { "actionid": "7" } })))
        .respond_with(rpc_result(json!({ "actionids": ["7"] })))
        .expect(1)
        .mount(&server)
        .await;
    rpc("action.create")
        .respond_with(rpc_result(json!({ "actionids": ["8"] })))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = provider(&server)
        .await
        .setup_webhook_media_action_and_user(&setup())
        .await
        .unwrap();

    assert_eq!(outcome.media_type, Upserted::Updated("31".to_string()));
    assert!(!outcome.media_bound);
    assert_eq!(outcome.action, Upserted::Updated("7".to_string()));
}

#[tokio::test]
async fn test_cloned_custom_filter_is_downgraded() {
    let server = MockServer::start().await;
    rpc("action.get")
        .and(body_partial_json(json!({ "params": { "selectFilter": "extend" } })))
        .respond_with(rpc_result(json!([{
            "actionid": "3",
            "name": "Report problems to Zabbix administrators",
            "filter": {
                "evaltype": "3",
                "formula": "A and B",
                "eval_formula": "A and B",
                "conditions": [
                    { "conditionid": "1", "actionid": "3", "conditiontype": "4",
                      "operator": "5", "value": "2", "formulaid": "A" }
                ]
            }
        }])))
        .mount(&server)
        .await;
    rpc("action.get")
        .respond_with(rpc_result(json!([])))
        .mount(&server)
        .await;
    rpc("action.create")
        .and(body_partial_json(json!({
            "params": {
                "filter": {
                    "evaltype": "0",
                    "conditions": [{ "conditiontype": "4", "value": "2" }]
                }
            }
        })))
        .respond_with(rpc_result(json!({ "actionids": ["8"] })))
        .expect(1)
        .mount(&server)
        .await;

    let action = provider(&server)
        .await
        .ensure_action(&setup(), "31", "1")
        .await
        .unwrap();

    assert_eq!(action, Upserted::Created("8".to_string()));
}

#[tokio::test]
async fn test_named_user_is_resolved() {
    let server = MockServer::start().await;
    rpc("user.get")
        .and(body_partial_json(json!({ "params": { "filter": { "username": ["ops"] } } })))
        .respond_with(rpc_result(json!([{ "userid": "5", "username": "ops" }])))
        .expect(1)
        .mount(&server)
        .await;

    let user_id = provider(&server)
        .await
        .resolve_user(&setup().with_username("ops"))
        .await
        .unwrap();

    assert_eq!(user_id, "5");
}

#[tokio::test]
async fn test_missing_url_is_rejected() {
    let server = MockServer::start().await;
    let err = provider(&server)
        .await
        .setup_webhook_media_action_and_user(&WebhookSetup::new("", ""))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}
