//! Client dispatch and registry fan-out across mixed backends

use nagare_monitors::{
    AuthConfig, Backend, Client, Config, ErrorKind, MonitorType, Provider, ProviderRegistry,
    SnmpConfig,
};
use serde_json::json;
use wiremock::MockServer;

use crate::helpers::*;

fn prometheus_config(name: &str) -> Config {
    Config::new(
        name,
        MonitorType::Prometheus,
        AuthConfig {
            url: "http://prometheus.local:9090/".to_string(),
            ..Default::default()
        },
    )
}

fn snmp_config(name: &str) -> Config {
    Config::new(
        name,
        MonitorType::Snmp,
        AuthConfig {
            url: "192.0.2.10".to_string(),
            ..Default::default()
        },
    )
    .with_snmp(SnmpConfig::default())
}

#[test]
fn test_unknown_monitor_type_is_rejected() {
    let parsed: Result<Config, _> = serde_json::from_value(json!({
        "name": "mystery",
        "type": 9,
        "auth": { "url": "http://example.com" }
    }));
    assert!(parsed.is_err());

    let err = MonitorType::try_from(9).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
}

#[test]
fn test_numeric_monitor_codes_select_backend() {
    let config: Config = serde_json::from_value(json!({
        "name": "prom",
        "type": 2,
        "auth": { "url": "http://prometheus.local:9090" }
    }))
    .unwrap();

    let client = Client::new(config).unwrap();
    assert!(matches!(client.backend(), Backend::Prometheus(_)));
    assert_eq!(client.monitor_type(), MonitorType::Prometheus);
}

#[tokio::test]
async fn test_prometheus_data_operations_are_not_implemented() {
    let client = Client::new(prometheus_config("prom")).unwrap();
    client.authenticate().await.unwrap();

    let err = client.get_hosts().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotImplemented);
    assert!(client.get_alerts().await.unwrap_err().is_not_implemented());
    assert!(client.delete_host("1").await.unwrap_err().is_not_implemented());
}

#[tokio::test]
async fn test_snmp_inventory_operations_are_empty() {
    let client = Client::new(snmp_config("switch")).unwrap();

    assert!(client.as_snmp().is_some());
    assert!(client.as_zabbix().is_none());
    assert!(client.get_hosts().await.unwrap().is_empty());
    assert!(client.get_alerts().await.unwrap().is_empty());
    assert!(client.get_host_groups().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_registry_collects_from_healthy_providers() {
    let server = MockServer::start().await;
    rpc("user.get")
        .respond_with(rpc_result(json!([{ "userid": "1" }])))
        .mount(&server)
        .await;
    rpc("host.get")
        .respond_with(rpc_result(json!([
            { "hostid": "10084", "host": "web-01", "status": "0", "available": "1" }
        ])))
        .mount(&server)
        .await;

    let mut broken = prometheus_config("broken");
    broken.auth.url.clear();

    let registry = ProviderRegistry::new();
    let failures = registry
        .initialize(vec![
            zabbix_config_with_token(&server, "api-token"),
            prometheus_config("prom"),
            broken,
        ])
        .await;

    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, "broken");
    assert_eq!(registry.list().await, vec!["prom", "zabbix-test"]);

    // prometheus has no host inventory and is skipped
    let hosts = registry.all_hosts().await.unwrap();
    assert_eq!(hosts.len(), 1);
    assert_eq!(hosts["zabbix-test"][0].name, "web-01");

    let stats = registry.stats().await;
    assert_eq!(stats.providers, 2);
    assert_eq!(stats.total_hosts, 1);
    assert!(!stats.per_provider["prom"].errors.is_empty());

    let health = registry.health_check().await;
    assert!(health.values().all(|status| status.healthy));
}

#[tokio::test]
async fn test_registry_fails_when_every_provider_fails() {
    let registry = ProviderRegistry::new();
    registry
        .register(Client::new(prometheus_config("prom")).unwrap())
        .await
        .unwrap();

    let err = registry.all_alerts().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotImplemented);
}
