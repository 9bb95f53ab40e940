//! Item, history, trigger and template operations against the mocked Zabbix API

use nagare_monitors::zabbix::ZabbixProvider;
use nagare_monitors::{ErrorKind, Item, Provider, Severity};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, method, path};
use wiremock::{Mock, MockServer};

use crate::helpers::*;

async fn provider(server: &MockServer) -> ZabbixProvider {
    ZabbixProvider::new(&zabbix_config_with_token(server, "api-token")).unwrap()
}

#[tokio::test]
async fn test_create_item_follows_snmp_interface() {
    let server = MockServer::start().await;
    rpc("host.get")
        .and(body_partial_json(json!({ "params": { "hostids": "10085" } })))
        .respond_with(rpc_result(json!([{
            "hostid": "10085",
            "interfaces": [
                { "interfaceid": "30", "type": "1", "main": "0", "ip": "10.0.0.1" },
                { "interfaceid": "31", "type": "2", "main": "1", "ip": "10.0.0.1" }
            ]
        }])))
        .mount(&server)
        .await;
    rpc("item.create")
        .and(body_partial_json(json!({
            "params": {
                "key_": "ifInOctets[1]",
                "hostid": "10085",
                "type": "20",
                "value_type": "0",
                "interfaceid": "31",
                "delay": "30s",
                "status": "0"
            }
        })))
        .respond_with(rpc_result(json!({ "itemids": ["4001"] })))
        .expect(1)
        .mount(&server)
        .await;

    let item = Item {
        host_id: "10085".to_string(),
        name: "Inbound traffic".to_string(),
        key: "ifInOctets[1]".to_string(),
        ..Default::default()
    };
    let created = provider(&server).await.create_item(item).await.unwrap();

    assert_eq!(created.id, "4001");
    assert_eq!(created.item_type, "20");
    assert_eq!(created.interface_id, "31");
}

#[tokio::test]
async fn test_create_item_without_key_is_rejected() {
    let server = MockServer::start().await;
    let item = Item {
        host_id: "10085".to_string(),
        ..Default::default()
    };

    let err = provider(&server).await.create_item(item).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[tokio::test]
async fn test_update_item_sends_only_set_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(API_PATH))
        .and(body_json(json!({
            "jsonrpc": "2.0",
            "method": "item.update",
            "params": { "itemid": "4001", "name": "Inbound", "status": "1" },
            "auth": "api-token",
            "id": 1
        })))
        .respond_with(rpc_result(json!({ "itemids": ["4001"] })))
        .expect(1)
        .mount(&server)
        .await;

    let item = Item {
        id: "4001".to_string(),
        name: "Inbound".to_string(),
        units: "  ".to_string(),
        status: "disabled".to_string(),
        ..Default::default()
    };
    provider(&server).await.update_item(item).await.unwrap();
}

#[tokio::test]
async fn test_history_uses_item_value_type() {
    let server = MockServer::start().await;
    rpc("item.get")
        .respond_with(rpc_result(json!([{
            "itemid": "4002", "hostid": "10085", "name": "Interface Gi0/1: Speed",
            "key_": "net.if.speed[1]", "units": "bps", "value_type": "3"
        }])))
        .mount(&server)
        .await;
    rpc("history.get")
        .and(body_partial_json(json!({
            "params": {
                "itemids": "4002",
                "history": 3,
                "time_from": 1_700_000_000,
                "time_till": 1_700_003_600,
                "sortorder": "DESC",
                "limit": 1000
            }
        })))
        .respond_with(rpc_result(json!([
            { "itemid": "4002", "clock": "1700000300", "value": "2500000" },
            { "itemid": "4002", "clock": 1700000000, "value": "800" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let history = provider(&server)
        .await
        .get_item_history("4002", 1_700_000_000, 1_700_003_600)
        .await
        .unwrap();

    assert_eq!(history.len(), 2);
    assert_eq!((history[0].value.as_str(), history[0].units.as_str()), ("2.50", "Mbps"));
    assert_eq!(history[0].timestamp, 1_700_000_300);
    assert_eq!((history[1].value.as_str(), history[1].units.as_str()), ("800", "bps"));
}

#[tokio::test]
async fn test_history_of_unknown_item_is_rejected() {
    let server = MockServer::start().await;
    rpc("item.get").respond_with(rpc_result(json!([]))).mount(&server).await;

    let err = provider(&server)
        .await
        .get_item_history("404", 0, 1)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[tokio::test]
async fn test_get_triggers_maps_state_and_priority() {
    let server = MockServer::start().await;
    rpc("trigger.get")
        .and(body_partial_json(json!({ "params": { "only_true": true, "expandDescription": true } })))
        .respond_with(rpc_result(json!([
            { "triggerid": "13491", "description": "High CPU on web-01",
              "expression": "last(/web-01/system.cpu.util)>90", "priority": "3",
              "value": "1", "comments": "" },
            { "triggerid": "13500", "description": "Link down", "priority": 4,
              "value": 0, "comments": "Check the uplink" }
        ])))
        .mount(&server)
        .await;

    let triggers = provider(&server).await.get_triggers().await.unwrap();

    assert_eq!(triggers[0].status, "problem");
    assert_eq!(triggers[0].priority, Severity::Average);
    assert_eq!(triggers[0].description, "High CPU on web-01");
    assert_eq!(triggers[1].status, "ok");
    assert_eq!(triggers[1].priority, Severity::High);
    assert_eq!(triggers[1].description, "Check the uplink");
}

#[tokio::test]
async fn test_template_ids_by_name() {
    let server = MockServer::start().await;
    rpc("template.get")
        .and(body_partial_json(json!({ "params": { "filter": { "name": ["Linux by Zabbix agent"] } } })))
        .respond_with(rpc_result(json!([{ "templateid": 10001, "name": "Linux by Zabbix agent" }])))
        .mount(&server)
        .await;

    let ids = provider(&server)
        .await
        .get_template_ids_by_name("Linux by Zabbix agent")
        .await
        .unwrap();
    assert_eq!(ids, vec!["10001"]);
}
