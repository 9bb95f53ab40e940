//! Session handling against the mocked Zabbix API
//!
//! These tests verify:
//! - Login with credentials
//! - Token reuse without a second login
//! - The body-auth to Bearer fallback and that it sticks
//! - The username/user field retry of `user.login`

use nagare_monitors::zabbix::{AuthTransport, ZabbixProvider};
use nagare_monitors::{ErrorKind, Provider};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header};
use wiremock::MockServer;

use crate::helpers::*;

#[tokio::test]
async fn test_login_stores_token() {
    let server = MockServer::start().await;
    rpc("user.login")
        .and(body_partial_json(json!({ "params": { "username": "Admin", "password": "zabbix" } })))
        .respond_with(rpc_result(json!("0424bd59b807674191e7d77572075f33")))
        .expect(1)
        .mount(&server)
        .await;

    let provider = ZabbixProvider::new(&zabbix_config(&server)).unwrap();
    provider.authenticate().await.unwrap();

    assert_eq!(
        provider.auth_token().as_deref(),
        Some("0424bd59b807674191e7d77572075f33")
    );
    assert_eq!(provider.auth_transport(), AuthTransport::Legacy);
}

#[tokio::test]
async fn test_valid_token_skips_login() {
    let server = MockServer::start().await;
    rpc("user.get")
        .and(body_partial_json(json!({ "auth": "held-token" })))
        .respond_with(rpc_result(json!([{ "userid": "1" }])))
        .expect(1)
        .mount(&server)
        .await;
    rpc("user.login")
        .respond_with(rpc_result(json!("fresh-token")))
        .expect(0)
        .mount(&server)
        .await;

    let provider = ZabbixProvider::new(&zabbix_config_with_token(&server, "held-token")).unwrap();
    provider.authenticate().await.unwrap();

    assert_eq!(provider.auth_token().as_deref(), Some("held-token"));
}

#[tokio::test]
async fn test_rejected_token_falls_back_to_login() {
    let server = MockServer::start().await;
    rpc("user.get")
        .respond_with(rpc_error("Invalid params.", "Session terminated, re-login, please."))
        .expect(1)
        .mount(&server)
        .await;
    rpc("user.login")
        .respond_with(rpc_result(json!("fresh-token")))
        .expect(1)
        .mount(&server)
        .await;

    let provider = ZabbixProvider::new(&zabbix_config_with_token(&server, "stale-token")).unwrap();
    provider.authenticate().await.unwrap();

    assert_eq!(provider.auth_token().as_deref(), Some("fresh-token"));
}

#[tokio::test]
async fn test_bearer_fallback_retries_once_and_sticks() {
    let server = MockServer::start().await;
    rpc("host.get")
        .and(header("Authorization", "Bearer api-token"))
        .respond_with(rpc_result(json!([])))
        .expect(2)
        .mount(&server)
        .await;
    rpc("host.get")
        .and(body_partial_json(json!({ "auth": "api-token" })))
        .respond_with(rpc_error("Invalid params.", AUTH_FIELD_REJECTED))
        .expect(1)
        .mount(&server)
        .await;

    let provider = ZabbixProvider::new(&zabbix_config_with_token(&server, "api-token")).unwrap();
    assert_eq!(provider.auth_transport(), AuthTransport::Legacy);

    assert!(provider.get_hosts().await.unwrap().is_empty());
    assert_eq!(provider.auth_transport(), AuthTransport::Bearer);

    // goes straight to the header now
    assert!(provider.get_hosts().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_bearer_retry_is_returned() {
    let server = MockServer::start().await;
    rpc("host.get")
        .and(header("Authorization", "Bearer api-token"))
        .respond_with(rpc_error("Invalid params.", "Not authorized."))
        .expect(1)
        .mount(&server)
        .await;
    rpc("host.get")
        .and(body_partial_json(json!({ "auth": "api-token" })))
        .respond_with(rpc_error("Invalid params.", AUTH_FIELD_REJECTED))
        .expect(1)
        .mount(&server)
        .await;

    let provider = ZabbixProvider::new(&zabbix_config_with_token(&server, "api-token")).unwrap();
    let err = provider.get_hosts().await.unwrap_err();

    assert_eq!(err.api_data(), Some("Not authorized."));
    assert_eq!(provider.auth_transport(), AuthTransport::Legacy);
}

#[tokio::test]
async fn test_login_retries_with_user_field() {
    let server = MockServer::start().await;
    rpc("user.login")
        .and(body_partial_json(json!({ "params": { "username": "Admin" } })))
        .respond_with(rpc_error(
            "Invalid params.",
            "Invalid parameter \"/\": unexpected parameter \"username\".",
        ))
        .expect(1)
        .mount(&server)
        .await;
    rpc("user.login")
        .and(body_partial_json(json!({ "params": { "user": "Admin" } })))
        .respond_with(rpc_result(json!("legacy-token")))
        .expect(1)
        .mount(&server)
        .await;

    let provider = ZabbixProvider::new(&zabbix_config(&server)).unwrap();
    provider.authenticate().await.unwrap();

    assert_eq!(provider.auth_token().as_deref(), Some("legacy-token"));
}

#[tokio::test]
async fn test_wrong_password_is_auth_error() {
    let server = MockServer::start().await;
    rpc("user.login")
        .respond_with(rpc_error(
            "Application error.",
            "Incorrect user name or password or account is temporarily blocked.",
        ))
        .mount(&server)
        .await;

    let provider = ZabbixProvider::new(&zabbix_config(&server)).unwrap();
    let err = provider.authenticate().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Auth);
    assert_eq!(provider.auth_token(), None);
}

#[tokio::test]
async fn test_http_error_is_transport_error() {
    let server = MockServer::start().await;
    rpc("host.get")
        .respond_with(wiremock::ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let provider = ZabbixProvider::new(&zabbix_config_with_token(&server, "api-token")).unwrap();
    let err = provider.get_hosts().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
}

#[tokio::test]
async fn test_rehydrated_token_is_used() {
    let server = MockServer::start().await;
    rpc("hostgroup.get")
        .and(body_partial_json(json!({ "auth": "restored" })))
        .respond_with(rpc_result(json!([{ "groupid": "2", "name": "Linux servers" }])))
        .expect(1)
        .mount(&server)
        .await;

    let provider = ZabbixProvider::new(&zabbix_config(&server)).unwrap();
    provider.set_auth_token("restored".to_string());

    assert_eq!(provider.get_host_groups().await.unwrap(), vec!["Linux servers"]);
}
