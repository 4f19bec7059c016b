//! Reconciliation behavior of the UCI record store against a mock router

mod common;

use common::*;
use extdns_core::endpoint::{Changes, Endpoint, RECORD_TYPE_A, RECORD_TYPE_CNAME};
use extdns_core::{DnsRecord, Error, Provider};
use extdns_provider_openwrt::{LuciClient, OpenWrtProvider, UciStore};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer};

const UCI_PATH: &str = "/cgi-bin/luci/rpc/uci";

fn store(server: &MockServer) -> UciStore {
    UciStore::new(LuciClient::new(luci_config(server)).unwrap())
}

fn a_record(name: &str, address: &str) -> DnsRecord {
    DnsRecord::A {
        name: name.to_string(),
        address: address.to_string(),
    }
}

fn cname_record(alias: &str, target: &str) -> DnsRecord {
    DnsRecord::Cname {
        alias: alias.to_string(),
        target: target.to_string(),
    }
}

async fn mount_uci(server: &MockServer, body: serde_json::Value, response: wiremock::ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(UCI_PATH))
        .and(body_partial_json(body))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn read_filters_unknown_section_kinds() {
    let server = MockServer::start().await;
    mount_uci(
        &server,
        json!({"method": "get_all", "params": ["dhcp"]}),
        rpc_result(json!({
            "s1": {".type": "domain", "name": "a.com", "ip": "1.1.1.1"},
            "s2": {".type": "cname", "cname": "b.com", "target": "a.com"},
            "s3": {".type": "dhcp_host", "name": "printer", "ip": "192.168.1.9"},
        })),
    )
    .await;

    let records = store(&server).records().await.unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records["s1"], a_record("a.com", "1.1.1.1"));
    assert_eq!(records["s2"], cname_record("b.com", "a.com"));
}

#[tokio::test]
async fn add_creates_sections_and_commits() {
    let server = MockServer::start().await;
    mount_uci(
        &server,
        json!({"method": "add", "params": ["dhcp", "domain"]}),
        rpc_result(json!("cfg0a1b2c")),
    )
    .await;
    mount_uci(
        &server,
        json!({"method": "set", "params": ["dhcp", "cfg0a1b2c", "name", "x.test"]}),
        rpc_result(json!(true)),
    )
    .await;
    mount_uci(
        &server,
        json!({"method": "set", "params": ["dhcp", "cfg0a1b2c", "ip", "9.9.9.9"]}),
        rpc_result(json!(true)),
    )
    .await;
    mount_uci(
        &server,
        json!({"method": "commit", "params": ["dhcp"]}),
        rpc_result(json!(true)),
    )
    .await;

    store(&server)
        .add(&[a_record("x.test", "9.9.9.9")])
        .await
        .unwrap();

    assert_eq!(
        received_methods(&server).await,
        vec!["add", "set", "set", "commit"]
    );
}

#[tokio::test]
async fn add_cname_sets_alias_and_target() {
    let server = MockServer::start().await;
    mount_uci(
        &server,
        json!({"method": "add", "params": ["dhcp", "cname"]}),
        rpc_result(json!("cfg0d4e5f")),
    )
    .await;
    mount_uci(&server, json!({"method": "set"}), rpc_result(json!(true))).await;
    mount_uci(&server, json!({"method": "commit"}), rpc_result(json!(true))).await;

    store(&server)
        .add(&[cname_record("b.com", "a.com")])
        .await
        .unwrap();

    let calls = received_calls(&server).await;
    assert_eq!(calls[1].1, vec!["dhcp", "cfg0d4e5f", "cname", "b.com"]);
    assert_eq!(calls[2].1, vec!["dhcp", "cfg0d4e5f", "target", "a.com"]);
}

#[tokio::test]
async fn add_invalid_record_fails_before_any_rpc() {
    let server = MockServer::start().await;

    let err = store(&server)
        .add(&[a_record("x.test", "")])
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidRecord(_)));
    assert!(received_methods(&server).await.is_empty());
}

#[tokio::test]
async fn update_replaces_matching_section() {
    let server = MockServer::start().await;
    mount_uci(
        &server,
        json!({"method": "get_all"}),
        rpc_result(json!({
            "s1": {".type": "domain", "name": "a.example.com", "ip": "1.1.1.1"},
        })),
    )
    .await;
    mount_uci(
        &server,
        json!({"method": "delete", "params": ["dhcp", "s1"]}),
        rpc_result(json!(true)),
    )
    .await;
    mount_uci(
        &server,
        json!({"method": "add", "params": ["dhcp", "domain"]}),
        rpc_result(json!("cfg0new")),
    )
    .await;
    mount_uci(&server, json!({"method": "set"}), rpc_result(json!(true))).await;
    mount_uci(&server, json!({"method": "commit"}), rpc_result(json!(true))).await;

    store(&server)
        .update(vec![a_record("a.example.com", "2.2.2.2")])
        .await
        .unwrap();

    let calls = received_calls(&server).await;
    let methods: Vec<&str> = calls.iter().map(|(m, _)| m.as_str()).collect();
    assert_eq!(
        methods,
        vec!["get_all", "delete", "add", "set", "set", "commit"]
    );
    assert_eq!(calls[3].1, vec!["dhcp", "cfg0new", "name", "a.example.com"]);
    assert_eq!(calls[4].1, vec!["dhcp", "cfg0new", "ip", "2.2.2.2"]);
}

#[tokio::test]
async fn update_unmatched_record_fails_without_commit() {
    let server = MockServer::start().await;
    mount_uci(&server, json!({"method": "get_all"}), rpc_result(json!({}))).await;

    let requested = a_record("missing.example.com", "1.2.3.4");
    let err = store(&server)
        .update(vec![requested.clone()])
        .await
        .unwrap_err();

    match err {
        Error::RecordsNotFound(records) => assert_eq!(records, vec![requested]),
        other => panic!("expected RecordsNotFound, got {other:?}"),
    }
    assert_eq!(received_methods(&server).await, vec!["get_all"]);
}

#[tokio::test]
async fn duplicate_update_keys_collapse_to_one_applied_change() {
    let server = MockServer::start().await;
    mount_uci(
        &server,
        json!({"method": "get_all"}),
        rpc_result(json!({
            "s1": {".type": "domain", "name": "a.com", "ip": "1.1.1.1"},
        })),
    )
    .await;
    mount_uci(&server, json!({"method": "delete"}), rpc_result(json!(true))).await;
    mount_uci(&server, json!({"method": "add"}), rpc_result(json!("cfg0new"))).await;
    mount_uci(&server, json!({"method": "set"}), rpc_result(json!(true))).await;

    // first match wins; the duplicate stays pending and fails the batch
    let err = store(&server)
        .update(vec![a_record("a.com", "2.2.2.2"), a_record("a.com", "3.3.3.3")])
        .await
        .unwrap_err();

    match err {
        Error::RecordsNotFound(records) => {
            assert_eq!(records, vec![a_record("a.com", "3.3.3.3")]);
        }
        other => panic!("expected RecordsNotFound, got {other:?}"),
    }

    let methods = received_methods(&server).await;
    assert_eq!(methods, vec!["get_all", "delete", "add", "set", "set"]);
}

#[tokio::test]
async fn delete_removes_matching_sections() {
    let server = MockServer::start().await;
    mount_uci(
        &server,
        json!({"method": "get_all"}),
        rpc_result(json!({
            "s1": {".type": "domain", "name": "a.com", "ip": "1.1.1.1"},
            "s2": {".type": "cname", "cname": "b.com", "target": "a.com"},
        })),
    )
    .await;
    mount_uci(
        &server,
        json!({"method": "delete", "params": ["dhcp", "s1"]}),
        rpc_result(json!(true)),
    )
    .await;
    mount_uci(&server, json!({"method": "commit"}), rpc_result(json!(true))).await;

    store(&server)
        .delete(vec![a_record("a.com", "1.1.1.1")])
        .await
        .unwrap();

    assert_eq!(
        received_methods(&server).await,
        vec!["get_all", "delete", "commit"]
    );
}

#[tokio::test]
async fn delete_unmatched_record_fails_without_commit() {
    let server = MockServer::start().await;
    mount_uci(
        &server,
        json!({"method": "get_all"}),
        rpc_result(json!({
            "s1": {".type": "domain", "name": "a.com", "ip": "1.1.1.1"},
        })),
    )
    .await;

    let err = store(&server)
        .delete(vec![cname_record("b.com", "a.com")])
        .await
        .unwrap_err();

    assert!(matches!(err, Error::RecordsNotFound(_)));
    assert_eq!(received_methods(&server).await, vec!["get_all"]);
}

#[tokio::test]
async fn provider_apply_changes_issues_expected_sequence() {
    let server = MockServer::start().await;
    mount_uci(&server, json!({"method": "get_all"}), rpc_result(json!({}))).await;
    mount_uci(
        &server,
        json!({"method": "add", "params": ["dhcp", "domain"]}),
        rpc_result(json!("cfg0a1b2c")),
    )
    .await;
    mount_uci(&server, json!({"method": "set"}), rpc_result(json!(true))).await;
    mount_uci(&server, json!({"method": "commit"}), rpc_result(json!(true))).await;

    let provider = OpenWrtProvider::new(luci_config(&server)).unwrap();
    let changes = Changes {
        create: vec![Endpoint::new("x.test", RECORD_TYPE_A, "9.9.9.9", 0)],
        ..Changes::default()
    };

    provider.apply_changes(changes).await.unwrap();

    let calls = received_calls(&server).await;
    let methods: Vec<&str> = calls.iter().map(|(m, _)| m.as_str()).collect();
    assert_eq!(
        methods,
        vec!["get_all", "add", "set", "set", "commit"]
    );
    assert_eq!(calls[2].1, vec!["dhcp", "cfg0a1b2c", "name", "x.test"]);
    assert_eq!(calls[3].1, vec!["dhcp", "cfg0a1b2c", "ip", "9.9.9.9"]);
}

#[tokio::test]
async fn provider_records_converts_sections_to_endpoints() {
    let server = MockServer::start().await;
    mount_uci(
        &server,
        json!({"method": "get_all"}),
        rpc_result(json!({
            "s1": {".type": "domain", "name": "a.com", "ip": "1.1.1.1"},
            "s2": {".type": "cname", "cname": "b.com", "target": "a.com"},
            "s3": {".type": "dhcp_host", "name": "printer", "ip": "192.168.1.9"},
        })),
    )
    .await;

    let provider = OpenWrtProvider::new(luci_config(&server)).unwrap();
    let mut endpoints = provider.records().await.unwrap();
    endpoints.sort_by(|a, b| a.dns_name.cmp(&b.dns_name));

    assert_eq!(
        endpoints,
        vec![
            Endpoint::new("a.com", RECORD_TYPE_A, "1.1.1.1", 300),
            Endpoint::new("b.com", RECORD_TYPE_CNAME, "a.com", 300),
        ]
    );
}

#[tokio::test]
async fn provider_aborts_apply_on_preflight_failure() {
    let server = MockServer::start().await;
    mount_uci(
        &server,
        json!({"method": "get_all"}),
        wiremock::ResponseTemplate::new(500),
    )
    .await;

    let provider = OpenWrtProvider::new(luci_config(&server)).unwrap();
    let changes = Changes {
        create: vec![Endpoint::new("x.test", RECORD_TYPE_A, "9.9.9.9", 0)],
        ..Changes::default()
    };

    let err = provider.apply_changes(changes).await.unwrap_err();
    assert!(matches!(err, Error::HttpStatus(500)));
    assert_eq!(received_methods(&server).await, vec!["get_all"]);
}
