//! Host, item, alert and group operations against the mocked Zabbix API

use nagare_monitors::zabbix::ZabbixProvider;
use nagare_monitors::{AlertStatus, Config, ErrorKind, Host, HostStatus, Provider, Severity};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::body_partial_json;
use wiremock::MockServer;

use crate::helpers::*;

async fn provider(server: &MockServer) -> ZabbixProvider {
    ZabbixProvider::new(&zabbix_config_with_token(server, "api-token")).unwrap()
}

#[tokio::test]
async fn test_get_hosts_judges_availability() {
    let server = MockServer::start().await;
    rpc("host.get")
        .respond_with(rpc_result(json!([
            {
                "hostid": "10084",
                "host": "web-01",
                "name": "Web 01",
                "status": "0",
                "interfaces": [
                    { "interfaceid": "1", "ip": "10.0.0.5", "type": "1", "main": "1",
                      "available": "2", "error": "Cannot connect to [[10.0.0.5]:10050]" }
                ],
                "hostgroups": [{ "groupid": "2", "name": "Linux servers" }]
            },
            {
                "hostid": 10085,
                "host": "core-sw",
                "status": 0,
                "snmp_available": 1,
                "interfaces": [
                    { "interfaceid": 2, "ip": "10.0.0.1", "type": 2, "main": 1, "available": 1 }
                ]
            }
        ])))
        .mount(&server)
        .await;

    let hosts = provider(&server).await.get_hosts().await.unwrap();

    assert_eq!(hosts.len(), 2);
    assert_eq!(hosts[0].status, HostStatus::Down);
    assert_eq!(
        hosts[0].meta("status_reason"),
        Some("Cannot connect to [[10.0.0.5]:10050]")
    );
    assert_eq!(hosts[0].meta("groupname"), Some("Linux servers"));

    assert_eq!(hosts[1].id, "10085");
    assert_eq!(hosts[1].name, "core-sw");
    assert_eq!(hosts[1].status, HostStatus::Up);
    assert_eq!(hosts[1].ip_address, "10.0.0.1");
    assert_eq!(hosts[1].meta("interface_type"), Some("snmp"));
}

#[tokio::test]
async fn test_create_host_uses_default_group_and_agent_interface() {
    let server = MockServer::start().await;
    rpc("host.create")
        .and(body_partial_json(json!({
            "params": {
                "host": "db-01",
                "groups": [{ "groupid": "7" }],
                "interfaces": [{ "type": 1, "port": "10050", "ip": "10.0.0.9" }]
            }
        })))
        .respond_with(rpc_result(json!({ "hostids": ["10100"] })))
        .expect(1)
        .mount(&server)
        .await;

    let host = Host {
        name: "db-01".to_string(),
        ip_address: "10.0.0.9".to_string(),
        ..Default::default()
    };
    let created = provider(&server).await.create_host(host).await.unwrap();

    assert_eq!(created.id, "10100");
    assert_eq!(created.meta("groupid"), Some("7"));
}

#[tokio::test]
async fn test_create_host_without_name_is_rejected() {
    let server = MockServer::start().await;
    let err = provider(&server)
        .await
        .create_host(Host::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[tokio::test]
async fn test_delete_host_sends_id_array() {
    let server = MockServer::start().await;
    rpc("host.delete")
        .and(body_partial_json(json!({ "params": ["10100"] })))
        .respond_with(rpc_result(json!({ "hostids": ["10100"] })))
        .expect(1)
        .mount(&server)
        .await;

    provider(&server).await.delete_host("10100").await.unwrap();
}

#[tokio::test]
async fn test_api_errors_carry_operation_context() {
    let server = MockServer::start().await;
    rpc("host.delete")
        .respond_with(rpc_error("Invalid params.", "No permissions to referred object or it does not exist!"))
        .mount(&server)
        .await;

    let err = provider(&server).await.delete_host("1").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Api);
    assert!(err.to_string().starts_with("failed to delete host: Zabbix API error"));
}

#[tokio::test]
async fn test_get_items_normalizes_values() {
    let server = MockServer::start().await;
    rpc("item.get")
        .respond_with(rpc_result(json!([
            {
                "itemid": "2001", "hostid": "10084", "name": "Interface Gi0/1: Speed",
                "key_": "net.if.speed[ifHighSpeed.1]", "lastvalue": "1000000000",
                "units": "bps", "value_type": "3", "lastclock": "1700000000"
            },
            {
                "itemid": "2002", "hostid": "10084", "name": "Fan 1 status",
                "key_": "sensor.fan.status[1]", "lastvalue": "3", "units": ""
            }
        ])))
        .mount(&server)
        .await;

    let items = provider(&server).await.get_items("10084").await.unwrap();

    assert_eq!(items[0].value, "1.00");
    assert_eq!(items[0].units, "Gbps");
    assert_eq!(items[0].timestamp, 1_700_000_000);
    assert_eq!(items[1].value, "Critical");
}

#[tokio::test]
async fn test_get_alerts_resolves_hosts_through_triggers() {
    let server = MockServer::start().await;
    rpc("problem.get")
        .respond_with(rpc_result(json!([
            { "eventid": "501", "objectid": "13491", "name": "High CPU on web-01",
              "severity": "4", "clock": "1700000100", "r_eventid": "0" },
            { "eventid": "502", "objectid": "13492", "name": "Disk full",
              "severity": "5", "clock": "1700000200", "r_eventid": "611" }
        ])))
        .mount(&server)
        .await;
    rpc("trigger.get")
        .and(body_partial_json(json!({ "params": { "triggerids": ["13491", "13492"] } })))
        .respond_with(rpc_result(json!([
            { "triggerid": "13491", "hosts": [{ "hostid": "10084" }] },
            { "triggerid": "13492", "hosts": [{ "hostid": "10085" }] }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let alerts = provider(&server).await.get_alerts().await.unwrap();

    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[0].host_id, "10084");
    assert_eq!(alerts[0].severity, Severity::High);
    assert_eq!(alerts[0].status, AlertStatus::Problem);
    assert_eq!(alerts[1].host_id, "10085");
    assert_eq!(alerts[1].severity, Severity::Disaster);
    assert_eq!(alerts[1].status, AlertStatus::Resolved);
}

#[tokio::test]
async fn test_create_host_group_returns_existing_id() {
    let server = MockServer::start().await;
    rpc("hostgroup.get")
        .respond_with(rpc_result(json!([{ "groupid": "22", "name": "Switches" }])))
        .mount(&server)
        .await;
    rpc("hostgroup.create")
        .respond_with(rpc_result(json!({ "groupids": ["99"] })))
        .expect(0)
        .mount(&server)
        .await;

    let id = provider(&server).await.create_host_group("Switches").await.unwrap();
    assert_eq!(id, "22");
}

#[tokio::test]
async fn test_create_host_group_creates_missing_group() {
    let server = MockServer::start().await;
    rpc("hostgroup.get")
        .respond_with(rpc_result(json!([])))
        .mount(&server)
        .await;
    rpc("hostgroup.create")
        .and(body_partial_json(json!({ "params": { "name": "Routers" } })))
        .respond_with(rpc_result(json!({ "groupids": ["23"] })))
        .expect(1)
        .mount(&server)
        .await;

    let id = provider(&server).await.create_host_group("Routers").await.unwrap();
    assert_eq!(id, "23");
}

#[tokio::test]
async fn test_missing_host_is_none() {
    let server = MockServer::start().await;
    rpc("host.get").respond_with(rpc_result(json!([]))).mount(&server).await;

    let host = provider(&server).await.get_host_by_name("ghost").await.unwrap();
    assert_eq!(host, None);
}

#[tokio::test]
async fn test_zero_timeout_falls_back_to_default() {
    let server = MockServer::start().await;
    rpc("host.get")
        .respond_with(rpc_result(json!([
            { "hostid": "10084", "host": "web-01", "status": "0", "available": "1" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let config: Config = serde_json::from_value(json!({
        "name": "persisted",
        "type": 1,
        "auth": { "url": server.uri(), "token": "api-token" },
        "timeout_secs": 0
    }))
    .unwrap();
    let hosts = ZabbixProvider::new(&config).unwrap().get_hosts().await.unwrap();

    assert_eq!(hosts.len(), 1);
    assert_eq!(hosts[0].name, "web-01");
}
