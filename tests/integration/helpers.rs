//! Helper functions for integration tests

use nagare_monitors::{AuthConfig, Config, MonitorType};
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockBuilder, MockServer, ResponseTemplate};

pub const API_PATH: &str = "/api_jsonrpc.php";

/// Data Zabbix 6.0+ answers with when a token is sent in the body
pub const AUTH_FIELD_REJECTED: &str = "Invalid parameter \"/\": unexpected parameter \"auth\".";

pub fn zabbix_config(server: &MockServer) -> Config {
    Config::new(
        "zabbix-test",
        MonitorType::Zabbix,
        AuthConfig {
            url: server.uri(),
            username: Some("Admin".to_string()),
            password: Some("zabbix".to_string()),
            token: None,
        },
    )
}

pub fn zabbix_config_with_token(server: &MockServer, token: &str) -> Config {
    let mut config = zabbix_config(server);
    config.auth.token = Some(token.to_string());
    config
}

/// Matches one JSON-RPC call by method name
pub fn rpc(rpc_method: &str) -> MockBuilder {
    Mock::given(method("POST"))
        .and(path(API_PATH))
        .and(body_partial_json(json!({ "method": rpc_method })))
}

pub fn rpc_result(result: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "jsonrpc": "2.0",
        "result": result,
        "id": 1
    }))
}

pub fn rpc_error(message: &str, data: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "jsonrpc": "2.0",
        "error": { "code": -32602, "message": message, "data": data },
        "id": 1
    }))
}
