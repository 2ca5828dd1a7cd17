use super::*;
use crate::api::test_helpers::{create_test_client, list_page_body};
use mockito::{Matcher, Server as MockServer};
use tfkit::TfkitError;

fn http_check() -> HealthCheckModel {
    HealthCheckModel {
        protocol: Value::Known("http".to_string()),
        port: Value::Known(8080),
        interval: Value::Known(15),
        timeout: Value::Known(10),
        retries: Value::Null,
        path: Value::Known("/healthz".to_string()),
    }
}

fn https_rule() -> ForwardingRuleModel {
    ForwardingRuleModel {
        entry_protocol: Value::Known("https".to_string()),
        entry_port: Value::Known(443),
        target_protocol: Value::Known("http".to_string()),
        target_port: Value::Known(8080),
    }
}

fn planned_model() -> LoadBalancerModel {
    LoadBalancerModel {
        id: Value::Unknown,
        name: Value::Known("edge".to_string()),
        load_balancer_type: Value::Known("lb11".to_string()),
        location: Value::Known("fsn1".to_string()),
        algorithm: Value::Unknown,
        vpc_id: Value::Known(11),
        ipv4_address: Value::Unknown,
        health_check: Value::Known(http_check()),
        forwarding_rules: Value::Known(vec![https_rule()]),
        target_server_ids: Value::Known(vec![42, 43]),
    }
}

fn lb_json() -> serde_json::Value {
    serde_json::json!({
        "id": 7,
        "name": "edge",
        "load_balancer_type": "lb11",
        "location": "fsn1",
        "algorithm": "round_robin",
        "vpc_id": 11,
        "ipv4_address": "198.51.100.7",
        "health_check": {
            "protocol": "http", "port": 8080, "interval": 15, "timeout": 10, "path": "/healthz"
        },
        "forwarding_rules": [
            {"entry_protocol": "https", "entry_port": 443, "target_protocol": "http", "target_port": 8080}
        ],
        "target_server_ids": [42, 43]
    })
}

fn resource(url: &str) -> LoadBalancerResource {
    LoadBalancerResource::new(Arc::new(create_test_client(url)))
}

#[test]
fn test_nested_objects_round_trip_through_state() {
    let state = planned_model().into_state().unwrap();

    let health_check = state.get(&AttributePath::new("health_check")).unwrap();
    let fields = health_check.as_map().unwrap();
    assert_eq!(fields.len(), 6);
    assert_eq!(fields["retries"], Dynamic::Null);

    assert_eq!(LoadBalancerModel::from_state(&state).unwrap(), planned_model());
}

#[test]
fn test_nested_object_with_unexpected_key_is_rejected() {
    let mut state = planned_model().into_state().unwrap();
    state
        .set(
            &AttributePath::new("health_check").attribute("unexpected"),
            Dynamic::Bool(true),
        )
        .unwrap();

    let err = LoadBalancerModel::from_state(&state).unwrap_err();
    match err {
        TfkitError::ObjectShape { unexpected, .. } => assert_eq!(unexpected, vec!["unexpected"]),
        other => panic!("expected shape error, got {:?}", other),
    }
}

#[test]
fn test_nested_number_type_mismatch() {
    let mut state = planned_model().into_state().unwrap();
    state
        .set(
            &AttributePath::new("forwarding_rules").index(0).attribute("entry_port"),
            Dynamic::String("443".to_string()),
        )
        .unwrap();

    let err = LoadBalancerModel::from_state(&state).unwrap_err();
    match err {
        TfkitError::TypeMismatch { path, .. } => assert!(path.contains("entry_port"), "{}", path),
        other => panic!("expected type mismatch, got {:?}", other),
    }
}

#[test]
fn test_apply_remote_absent_lists_are_empty() {
    let lb: LoadBalancer =
        serde_json::from_value(serde_json::json!({"id": 7, "name": "edge"})).unwrap();
    let mut model = planned_model();
    model.apply_remote(&lb);

    assert_eq!(model.forwarding_rules, Value::Known(vec![]));
    assert_eq!(model.target_server_ids, Value::Known(vec![]));
    assert_eq!(model.health_check, Value::Null);
    assert_eq!(model.algorithm, Value::Null);
}

#[test]
fn test_apply_remote_ignores_health_check_defaults() {
    let mut remote = lb_json();
    remote["health_check"]["retries"] = serde_json::json!(3);
    let lb: LoadBalancer = serde_json::from_value(remote).unwrap();

    let mut model = planned_model();
    model.apply_remote(&lb);
    assert_eq!(model.health_check, Value::Known(http_check()));

    let mut unconfigured = LoadBalancerModel {
        health_check: Value::Null,
        ..planned_model()
    };
    unconfigured.apply_remote(&lb);
    assert_eq!(unconfigured.health_check, Value::Null);
}

#[test]
fn test_apply_remote_after_import_takes_remote_health_check() {
    let mut remote = lb_json();
    remote["health_check"]["retries"] = serde_json::json!(3);
    let lb: LoadBalancer = serde_json::from_value(remote).unwrap();

    let mut model = LoadBalancerModel {
        id: Value::Known(7),
        ..LoadBalancerModel::default()
    };
    model.apply_remote(&lb);

    let check = model.health_check.into_option().unwrap();
    assert_eq!(check.retries, Value::Known(3));
    assert_eq!(check.path, Value::Known("/healthz".to_string()));
}

#[test]
fn test_create_request_projection() {
    let request = planned_model().to_create_request().unwrap();
    let body = serde_json::to_value(&request).unwrap();

    assert_eq!(body["health_check"]["path"], "/healthz");
    assert!(body["health_check"].get("retries").is_none());
    assert_eq!(body["forwarding_rules"][0]["entry_port"], 443);
    assert!(body.get("algorithm").is_none());
}

#[test]
fn test_unknown_forwarding_port_fails_projection() {
    let mut rule = https_rule();
    rule.target_port = Value::Unknown;
    let model = LoadBalancerModel {
        forwarding_rules: Value::Known(vec![rule]),
        ..planned_model()
    };
    assert!(model.to_create_request().is_err());
}

#[test]
fn test_schema_nested_types() {
    let schema = resource("http://localhost").schema();
    let health_check = schema.attribute("health_check").unwrap();
    assert!(matches!(health_check.r#type, AttributeType::Object(_)));
    let rules = schema.attribute("forwarding_rules").unwrap();
    assert!(matches!(rules.r#type, AttributeType::List(_)));
}

#[tokio::test]
async fn test_create_waits_and_refreshes() {
    let mut server = MockServer::new_async().await;
    let mut initial = lb_json();
    initial["ipv4_address"] = serde_json::Value::Null;
    let create_mock = server
        .mock("POST", "/load_balancers")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "name": "edge",
            "target_server_ids": [42, 43]
        })))
        .with_status(201)
        .with_body(
            serde_json::json!({
                "load_balancer": initial,
                "action": {"id": 31, "command": "create_load_balancer", "status": "running"}
            })
            .to_string(),
        )
        .create_async()
        .await;
    let _action = server
        .mock("GET", "/actions/31")
        .with_status(200)
        .with_body(r#"{"action":{"id":31,"status":"success","finished_at":"2026-03-01T12:00:00Z"}}"#)
        .create_async()
        .await;
    let _refresh = server
        .mock("GET", "/load_balancers/7")
        .with_status(200)
        .with_body(serde_json::json!({ "load_balancer": lb_json() }).to_string())
        .create_async()
        .await;

    let planned = planned_model().into_state().unwrap();
    let response = resource(&server.url())
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: TYPE_NAME.to_string(),
                planned_state: planned.clone(),
                config: planned,
            },
        )
        .await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    let model = LoadBalancerModel::from_state(&response.new_state).unwrap();
    assert_eq!(model.id, Value::Known(7));
    assert_eq!(model.ipv4_address, Value::Known("198.51.100.7".to_string()));
    assert_eq!(model.algorithm, Value::Known("round_robin".to_string()));
    assert_eq!(model.health_check, Value::Known(http_check()));
    create_mock.assert_async().await;
}

#[tokio::test]
async fn test_create_without_action_skips_polling() {
    let mut server = MockServer::new_async().await;
    let _create = server
        .mock("POST", "/load_balancers")
        .with_status(201)
        .with_body(serde_json::json!({ "load_balancer": lb_json() }).to_string())
        .create_async()
        .await;
    let actions = server
        .mock("GET", Matcher::Regex(r"^/actions/".to_string()))
        .expect(0)
        .create_async()
        .await;

    let planned = planned_model().into_state().unwrap();
    let response = resource(&server.url())
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: TYPE_NAME.to_string(),
                planned_state: planned.clone(),
                config: planned,
            },
        )
        .await;

    assert!(response.diagnostics.is_empty());
    actions.assert_async().await;
}

#[tokio::test]
async fn test_update_replaces_rules_and_targets() {
    let mut server = MockServer::new_async().await;
    let mut remote = lb_json();
    remote["target_server_ids"] = serde_json::json!([]);
    let mock = server
        .mock("PUT", "/load_balancers/7")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "target_server_ids": [],
            "algorithm": "least_connections"
        })))
        .with_status(200)
        .with_body(serde_json::json!({ "load_balancer": remote }).to_string())
        .create_async()
        .await;

    let prior = LoadBalancerModel {
        id: Value::Known(7),
        algorithm: Value::Known("round_robin".to_string()),
        ipv4_address: Value::Known("198.51.100.7".to_string()),
        ..planned_model()
    };
    let planned = LoadBalancerModel {
        algorithm: Value::Known("least_connections".to_string()),
        target_server_ids: Value::Null,
        ..prior.clone()
    };

    let response = resource(&server.url())
        .update(
            Context::new(),
            UpdateResourceRequest {
                type_name: TYPE_NAME.to_string(),
                prior_state: prior.into_state().unwrap(),
                planned_state: planned.clone().into_state().unwrap(),
                config: planned.into_state().unwrap(),
            },
        )
        .await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    let model = LoadBalancerModel::from_state(&response.new_state).unwrap();
    assert_eq!(model.target_server_ids, Value::Known(vec![]));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_import_by_name_walks_pages() {
    let mut server = MockServer::new_async().await;
    let _page1 = server
        .mock("GET", "/load_balancers")
        .match_query(Matcher::UrlEncoded("page".into(), "1".into()))
        .with_status(200)
        .with_body(list_page_body(
            "load_balancers",
            serde_json::json!([{"id": 1, "name": "internal"}]),
            Some(2),
        ))
        .create_async()
        .await;
    let _page2 = server
        .mock("GET", "/load_balancers")
        .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
        .with_status(200)
        .with_body(list_page_body(
            "load_balancers",
            serde_json::json!([{"id": 7, "name": "edge"}]),
            None,
        ))
        .create_async()
        .await;

    let response = resource(&server.url())
        .import_state(
            Context::new(),
            ImportResourceStateRequest {
                type_name: TYPE_NAME.to_string(),
                id: "edge".to_string(),
            },
        )
        .await;

    let model = LoadBalancerModel::from_state(&response.imported_resources[0].state).unwrap();
    assert_eq!(model.id, Value::Known(7));
}

#[tokio::test]
async fn test_import_aborts_on_page_error() {
    let mut server = MockServer::new_async().await;
    let _page1 = server
        .mock("GET", "/load_balancers")
        .match_query(Matcher::UrlEncoded("page".into(), "1".into()))
        .with_status(200)
        .with_body(list_page_body(
            "load_balancers",
            serde_json::json!([{"id": 1, "name": "internal"}]),
            Some(2),
        ))
        .create_async()
        .await;
    let _page2 = server
        .mock("GET", "/load_balancers")
        .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
        .with_status(503)
        .with_body("unavailable")
        .create_async()
        .await;

    let response = resource(&server.url())
        .import_state(
            Context::new(),
            ImportResourceStateRequest {
                type_name: TYPE_NAME.to_string(),
                id: "internal".to_string(),
            },
        )
        .await;

    assert!(response.imported_resources.is_empty());
    assert_eq!(
        response.diagnostics[0].summary,
        "Failed to look up load balancer"
    );
}
