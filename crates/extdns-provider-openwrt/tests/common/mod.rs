//! Shared helpers for the provider integration tests
//!
//! The mock server stands in for the router's LuCI RPC endpoint; every
//! interaction is a POST whose JSON body names the UCI method, so tests
//! match on the body and assert call order from the recorded requests.

use extdns_provider_openwrt::LuciConfig;
use serde_json::{Value, json};
use wiremock::{MockServer, ResponseTemplate};

/// Connection settings pointed at a mock LuCI endpoint
pub fn luci_config(server: &MockServer) -> LuciConfig {
    LuciConfig {
        hostname: server.address().ip().to_string(),
        port: server.address().port(),
        ssl: false,
        username: "root".to_string(),
        password: "secret".to_string(),
        ..LuciConfig::default()
    }
}

/// A 200 response carrying the given envelope result
pub fn rpc_result(result: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id": 1,
        "result": result,
        "error": null,
    }))
}

/// The method of every RPC the server received, in order
pub async fn received_methods(server: &MockServer) -> Vec<String> {
    received_calls(server)
        .await
        .into_iter()
        .map(|(method, _)| method)
        .collect()
}

/// Method and params of every RPC the server received, in order
pub async fn received_calls(server: &MockServer) -> Vec<(String, Vec<String>)> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|request| {
            let body: Value = serde_json::from_slice(&request.body).unwrap();
            let method = body["method"].as_str().unwrap_or_default().to_string();
            let params = body["params"]
                .as_array()
                .map(|params| {
                    params
                        .iter()
                        .map(|v| v.as_str().unwrap_or_default().to_string())
                        .collect()
                })
                .unwrap_or_default();
            (method, params)
        })
        .collect()
}
