use super::*;
use crate::api::test_helpers::{create_test_client, list_page_body};
use mockito::{Matcher, Server as MockServer};
use std::time::Duration;
use tfkit::resource::ValidateResourceConfigRequest;
use tfkit::Dynamic;

fn planned_model() -> ServerModel {
    ServerModel {
        id: Value::Unknown,
        name: Value::Known("web-1".to_string()),
        server_type: Value::Known("cx22".to_string()),
        image: Value::Known("debian-12".to_string()),
        location: Value::Known("fsn1".to_string()),
        ssh_keys: Value::Unknown,
        user_data: Value::Known("#cloud-config\n".to_string()),
        vpc_id: Value::Null,
        backups: Value::Unknown,
        delete_protection: Value::Unknown,
        status: Value::Unknown,
        ipv4_address: Value::Unknown,
        ipv6_address: Value::Unknown,
        created: Value::Unknown,
    }
}

fn stored_model() -> ServerModel {
    ServerModel {
        id: Value::Known(42),
        ssh_keys: Value::Known(vec![]),
        vpc_id: Value::Null,
        backups: Value::Known(false),
        delete_protection: Value::Known(false),
        status: Value::Known("running".to_string()),
        ipv4_address: Value::Known("203.0.113.10".to_string()),
        ipv6_address: Value::Known("2001:db8::1".to_string()),
        created: Value::Known("2026-01-05T10:00:00+00:00".to_string()),
        ..planned_model()
    }
}

fn server_json(status: &str) -> serde_json::Value {
    serde_json::json!({
        "id": 42,
        "name": "web-1",
        "status": status,
        "server_type": "cx22",
        "image": "debian-12",
        "location": "fsn1",
        "ssh_keys": [],
        "backups": false,
        "delete_protection": false,
        "ipv4_address": "203.0.113.10",
        "ipv6_address": "2001:db8::1",
        "created": "2026-01-05T10:00:00Z"
    })
}

fn resource(url: &str) -> ServerResource {
    ServerResource::new(Arc::new(create_test_client(url)))
}

fn create_request(model: ServerModel) -> CreateResourceRequest {
    let state = model.into_state().unwrap();
    CreateResourceRequest {
        type_name: TYPE_NAME.to_string(),
        planned_state: state.clone(),
        config: state,
    }
}

#[test]
fn test_resource_type_name() {
    let resource = resource("http://localhost");
    assert_eq!(resource.type_name(), "cloudinfra_server");
}

#[test]
fn test_schema_attributes() {
    let schema = resource("http://localhost").schema();
    let attr = |name: &str| schema.attribute(name).unwrap();

    assert!(attr("name").required);
    assert!(attr("image").required);
    assert!(attr("user_data").sensitive);
    assert!(attr("id").computed && !attr("id").optional);
    assert!(attr("ssh_keys").optional && attr("ssh_keys").computed);
    assert_eq!(attr("image").plan_modifiers.len(), 1);
}

#[tokio::test]
async fn test_validate_rejects_computed_and_missing_required() {
    let config = ServerModel {
        id: Value::Null,
        image: Value::Null,
        status: Value::Known("running".to_string()),
        ipv4_address: Value::Null,
        ipv6_address: Value::Null,
        created: Value::Null,
        ..planned_model()
    }
    .into_state()
    .unwrap();

    let response = resource("http://localhost")
        .validate(
            Context::new(),
            ValidateResourceConfigRequest {
                type_name: TYPE_NAME.to_string(),
                config,
            },
        )
        .await;

    let summaries: Vec<&str> = response
        .diagnostics
        .iter()
        .map(|d| d.summary.as_str())
        .collect();
    assert_eq!(
        summaries,
        vec!["Missing required argument", "Value for unconfigurable attribute"]
    );
}

#[test]
fn test_create_request_projection() {
    let request = planned_model().to_create_request().unwrap();
    assert_eq!(request.name, "web-1");
    assert!(request.ssh_keys.is_empty());
    assert_eq!(request.user_data.as_deref(), Some("#cloud-config\n"));
    assert_eq!(request.backups, None);
    assert_eq!(request.vpc_id, None);
}

#[test]
fn test_create_request_requires_known_image() {
    let model = ServerModel {
        image: Value::Unknown,
        ..planned_model()
    };
    assert!(model.to_create_request().is_err());
}

#[test]
fn test_update_request_contains_mutable_subset_only() {
    let model = ServerModel {
        name: Value::Known("web-2".to_string()),
        backups: Value::Known(true),
        ..stored_model()
    };
    let body = serde_json::to_value(model.to_update_request()).unwrap();
    assert_eq!(
        body,
        serde_json::json!({"name": "web-2", "backups": true, "delete_protection": false})
    );
}

#[test]
fn test_apply_remote_absent_fields() {
    let server: Server = serde_json::from_value(serde_json::json!({"id": 7, "name": "bare"})).unwrap();
    let mut model = planned_model();
    model.apply_remote(&server);

    assert_eq!(model.id, Value::Known(7));
    assert_eq!(model.ssh_keys, Value::Known(vec![]));
    assert_eq!(model.vpc_id, Value::Null);
    assert_eq!(model.ipv4_address, Value::Null);
    assert_eq!(model.user_data, Value::Known("#cloud-config\n".to_string()));
}

#[test]
fn test_state_round_trip_writes_every_attribute() {
    let state = stored_model().into_state().unwrap();
    let map = state.value.as_map().unwrap();
    assert_eq!(map.len(), 14);
    assert_eq!(map["vpc_id"], Dynamic::Null);
    assert_eq!(ServerModel::from_state(&state).unwrap(), stored_model());
}

#[tokio::test]
async fn test_create_waits_for_action() {
    let mut server = MockServer::new_async().await;
    let create_mock = server
        .mock("POST", "/servers")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "name": "web-1",
            "image": "debian-12",
            "ssh_keys": []
        })))
        .with_status(201)
        .with_body(
            serde_json::json!({
                "server": server_json("initializing"),
                "action": {"id": 9, "command": "create_server", "status": "running"}
            })
            .to_string(),
        )
        .create_async()
        .await;
    let action_mock = server
        .mock("GET", "/actions/9")
        .with_status(200)
        .with_body(
            r#"{"action":{"id":9,"status":"success","finished_at":"2026-01-05T10:00:30Z"}}"#,
        )
        .create_async()
        .await;
    let refresh_mock = server
        .mock("GET", "/servers/42")
        .with_status(200)
        .with_body(serde_json::json!({ "server": server_json("running") }).to_string())
        .create_async()
        .await;

    let response = resource(&server.url())
        .create(Context::new(), create_request(planned_model()))
        .await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    let model = ServerModel::from_state(&response.new_state).unwrap();
    assert_eq!(model, stored_model());
    create_mock.assert_async().await;
    action_mock.assert_async().await;
    refresh_mock.assert_async().await;
}

#[tokio::test]
async fn test_create_rejects_known_id() {
    let model = ServerModel {
        id: Value::Known(42),
        ..planned_model()
    };

    let response = resource("http://localhost")
        .create(Context::new(), create_request(model))
        .await;

    assert_eq!(response.diagnostics.len(), 1);
    assert_eq!(response.diagnostics[0].summary, "Resource already exists");
    assert!(response.new_state.is_null());
}

#[tokio::test]
async fn test_create_failure_reports_status_and_body() {
    let mut server = MockServer::new_async().await;
    let _mock = server
        .mock("POST", "/servers")
        .with_status(422)
        .with_body(r#"{"error":{"code":"invalid_input","message":"unknown image"}}"#)
        .create_async()
        .await;

    let response = resource(&server.url())
        .create(Context::new(), create_request(planned_model()))
        .await;

    assert!(response.new_state.is_null());
    assert_eq!(response.diagnostics[0].summary, "Failed to create server");
    assert!(response.diagnostics[0].detail.contains("422"));
    assert!(response.diagnostics[0].detail.contains("unknown image"));
}

#[tokio::test]
async fn test_create_timeout_keeps_created_state() {
    let mut server = MockServer::new_async().await;
    let _create = server
        .mock("POST", "/servers")
        .with_status(201)
        .with_body(
            serde_json::json!({
                "server": server_json("initializing"),
                "action": {"id": 9, "status": "running"}
            })
            .to_string(),
        )
        .create_async()
        .await;
    let _action = server
        .mock("GET", "/actions/9")
        .with_status(200)
        .with_body(r#"{"action":{"id":9,"status":"running"}}"#)
        .expect_at_least(2)
        .create_async()
        .await;

    let resource = ServerResource::with_poller_config(
        Arc::new(create_test_client(&server.url())),
        PollerConfig {
            interval: Duration::from_millis(10),
            timeout: Duration::from_millis(30),
        },
    );
    let response = resource
        .create(Context::new(), create_request(planned_model()))
        .await;

    assert_eq!(response.diagnostics.len(), 1);
    assert_eq!(
        response.diagnostics[0].summary,
        "Server creation did not complete"
    );
    assert!(response.diagnostics[0].detail.contains("Timed out"));
    let model = ServerModel::from_state(&response.new_state).unwrap();
    assert_eq!(model.id, Value::Known(42));
    assert_eq!(model.status, Value::Known("initializing".to_string()));
}

#[tokio::test]
async fn test_create_failed_action() {
    let mut server = MockServer::new_async().await;
    let _create = server
        .mock("POST", "/servers")
        .with_status(201)
        .with_body(
            serde_json::json!({
                "server": server_json("initializing"),
                "action": {"id": 9, "status": "running"}
            })
            .to_string(),
        )
        .create_async()
        .await;
    let _action = server
        .mock("GET", "/actions/9")
        .with_status(200)
        .with_body(
            r#"{"action":{"id":9,"status":"error","finished_at":"2026-01-05T10:00:30Z",
                "error":{"code":"no_capacity","message":"location is full"}}}"#,
        )
        .create_async()
        .await;

    let response = resource(&server.url())
        .create(Context::new(), create_request(planned_model()))
        .await;

    assert_eq!(response.diagnostics.len(), 1);
    assert!(response.diagnostics[0]
        .detail
        .contains("no_capacity: location is full"));
    assert!(!response.new_state.is_null());
}

#[tokio::test]
async fn test_read_refreshes_state() {
    let mut server = MockServer::new_async().await;
    let mut remote = server_json("off");
    remote["name"] = serde_json::json!("renamed");
    let _mock = server
        .mock("GET", "/servers/42")
        .with_status(200)
        .with_body(serde_json::json!({ "server": remote }).to_string())
        .create_async()
        .await;

    let response = resource(&server.url())
        .read(
            Context::new(),
            ReadResourceRequest {
                type_name: TYPE_NAME.to_string(),
                current_state: stored_model().into_state().unwrap(),
            },
        )
        .await;

    assert!(response.diagnostics.is_empty());
    let model = ServerModel::from_state(&response.new_state.unwrap()).unwrap();
    assert_eq!(model.name, Value::Known("renamed".to_string()));
    assert_eq!(model.status, Value::Known("off".to_string()));
    assert_eq!(model.user_data, Value::Known("#cloud-config\n".to_string()));
}

#[tokio::test]
async fn test_read_not_found_removes_from_state() {
    let mut server = MockServer::new_async().await;
    let _mock = server
        .mock("GET", "/servers/42")
        .with_status(404)
        .with_body(r#"{"error":{"code":"not_found"}}"#)
        .create_async()
        .await;

    let response = resource(&server.url())
        .read(
            Context::new(),
            ReadResourceRequest {
                type_name: TYPE_NAME.to_string(),
                current_state: stored_model().into_state().unwrap(),
            },
        )
        .await;

    assert!(response.new_state.is_none());
    assert!(response.diagnostics.is_empty());
}

#[tokio::test]
async fn test_read_server_error_keeps_state() {
    let mut server = MockServer::new_async().await;
    let _mock = server
        .mock("GET", "/servers/42")
        .with_status(500)
        .with_body("internal")
        .create_async()
        .await;

    let response = resource(&server.url())
        .read(
            Context::new(),
            ReadResourceRequest {
                type_name: TYPE_NAME.to_string(),
                current_state: stored_model().into_state().unwrap(),
            },
        )
        .await;

    assert!(response.new_state.is_some());
    assert_eq!(response.diagnostics[0].summary, "Failed to read server");
}

#[tokio::test]
async fn test_update_sends_mutable_fields() {
    let mut server = MockServer::new_async().await;
    let mut remote = server_json("running");
    remote["name"] = serde_json::json!("web-2");
    let mock = server
        .mock("PUT", "/servers/42")
        .match_body(Matcher::Json(serde_json::json!({
            "name": "web-2",
            "backups": false,
            "delete_protection": false
        })))
        .with_status(200)
        .with_body(serde_json::json!({ "server": remote }).to_string())
        .create_async()
        .await;

    let planned = ServerModel {
        name: Value::Known("web-2".to_string()),
        status: Value::Unknown,
        ..stored_model()
    };
    let response = resource(&server.url())
        .update(
            Context::new(),
            UpdateResourceRequest {
                type_name: TYPE_NAME.to_string(),
                prior_state: stored_model().into_state().unwrap(),
                planned_state: planned.clone().into_state().unwrap(),
                config: planned.into_state().unwrap(),
            },
        )
        .await;

    assert!(response.diagnostics.is_empty());
    let model = ServerModel::from_state(&response.new_state).unwrap();
    assert_eq!(model.name, Value::Known("web-2".to_string()));
    assert_eq!(model.status, Value::Known("running".to_string()));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_delete_requires_no_content() {
    let mut server = MockServer::new_async().await;
    let _mock = server
        .mock("DELETE", "/servers/42")
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let response = resource(&server.url())
        .delete(
            Context::new(),
            DeleteResourceRequest {
                type_name: TYPE_NAME.to_string(),
                prior_state: stored_model().into_state().unwrap(),
            },
        )
        .await;

    assert_eq!(response.diagnostics.len(), 1);
    assert!(response.diagnostics[0].detail.contains("200"));
}

#[tokio::test]
async fn test_delete_success() {
    let mut server = MockServer::new_async().await;
    let mock = server
        .mock("DELETE", "/servers/42")
        .with_status(204)
        .create_async()
        .await;

    let response = resource(&server.url())
        .delete(
            Context::new(),
            DeleteResourceRequest {
                type_name: TYPE_NAME.to_string(),
                prior_state: stored_model().into_state().unwrap(),
            },
        )
        .await;

    assert!(response.diagnostics.is_empty());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_import_by_numeric_id() {
    let response = resource("http://localhost")
        .import_state(
            Context::new(),
            ImportResourceStateRequest {
                type_name: TYPE_NAME.to_string(),
                id: "42".to_string(),
            },
        )
        .await;

    assert!(response.diagnostics.is_empty());
    let model = ServerModel::from_state(&response.imported_resources[0].state).unwrap();
    assert_eq!(model.id, Value::Known(42));
    assert_eq!(model.name, Value::Null);
}

#[tokio::test]
async fn test_import_by_name_on_second_page() {
    let mut server = MockServer::new_async().await;
    let page1 = server
        .mock("GET", "/servers")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("page".into(), "1".into()),
            Matcher::UrlEncoded("per_page".into(), "200".into()),
        ]))
        .with_status(200)
        .with_body(list_page_body(
            "servers",
            serde_json::json!([{"id": 1, "name": "web-1"}, {"id": 2, "name": "web-2"}]),
            Some(2),
        ))
        .create_async()
        .await;
    let page2 = server
        .mock("GET", "/servers")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("page".into(), "2".into()),
            Matcher::UrlEncoded("per_page".into(), "200".into()),
        ]))
        .with_status(200)
        .with_body(list_page_body(
            "servers",
            serde_json::json!([{"id": 3, "name": "db-1"}]),
            None,
        ))
        .create_async()
        .await;

    let response = resource(&server.url())
        .import_state(
            Context::new(),
            ImportResourceStateRequest {
                type_name: TYPE_NAME.to_string(),
                id: "db-1".to_string(),
            },
        )
        .await;

    assert!(response.diagnostics.is_empty());
    let model = ServerModel::from_state(&response.imported_resources[0].state).unwrap();
    assert_eq!(model.id, Value::Known(3));
    page1.assert_async().await;
    page2.assert_async().await;
}

#[tokio::test]
async fn test_import_unknown_name() {
    let mut server = MockServer::new_async().await;
    let _mock = server
        .mock("GET", "/servers")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(list_page_body(
            "servers",
            serde_json::json!([{"id": 1, "name": "web-1"}]),
            None,
        ))
        .create_async()
        .await;

    let response = resource(&server.url())
        .import_state(
            Context::new(),
            ImportResourceStateRequest {
                type_name: TYPE_NAME.to_string(),
                id: "missing".to_string(),
            },
        )
        .await;

    assert!(response.imported_resources.is_empty());
    assert_eq!(response.diagnostics[0].summary, "Server not found");
}
