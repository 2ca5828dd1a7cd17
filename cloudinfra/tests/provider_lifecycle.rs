//! End-to-end resource lifecycles through a configured provider

use cloudinfra::resources::server::ServerModel;
use cloudinfra::resources::vpc::VpcModel;
use cloudinfra::CloudInfraProvider;
use mockito::{Matcher, Server};
use tfkit::provider::ConfigureProviderRequest;
use tfkit::resource::{
    CreateResourceRequest, DeleteResourceRequest, ImportResourceStateRequest,
    PlanResourceChangeRequest, ReadResourceRequest, UpdateResourceRequest,
    ValidateResourceConfigRequest,
};
use tfkit::{AttributePath, Context, DynamicValue, Provider, Resource, Value};

const TOKEN: &str = "integration-token";

async fn configured_provider(url: &str) -> CloudInfraProvider {
    let mut config = DynamicValue::object();
    config
        .set_value(&AttributePath::new("token"), Value::Known(TOKEN.to_string()))
        .unwrap();
    config
        .set_value(&AttributePath::new("endpoint"), Value::Known(url.to_string()))
        .unwrap();

    let mut provider = CloudInfraProvider::new();
    let response = provider
        .configure(
            Context::new(),
            ConfigureProviderRequest {
                terraform_version: "1.9.0".to_string(),
                config,
            },
        )
        .await;
    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    provider
}

fn vpc_config(ip_range: &str, description: Value<String>) -> DynamicValue {
    VpcModel {
        id: Value::Null,
        name: Value::Known("backend".to_string()),
        ip_range: Value::Known(ip_range.to_string()),
        description,
        created: Value::Null,
    }
    .into_state()
    .unwrap()
}

fn vpc_body(description: Option<&str>) -> String {
    serde_json::json!({
        "vpc": {
            "id": 11,
            "name": "backend",
            "ip_range": "10.0.0.0/16",
            "description": description,
            "created": "2026-02-01T08:00:00Z"
        }
    })
    .to_string()
}

async fn plan(
    resource: &dyn Resource,
    config: &DynamicValue,
    prior: &DynamicValue,
    proposed: &DynamicValue,
) -> (DynamicValue, Vec<AttributePath>) {
    let response = resource
        .plan(
            Context::new(),
            PlanResourceChangeRequest {
                type_name: resource.type_name().to_string(),
                config: config.clone(),
                prior_state: prior.clone(),
                proposed_new_state: proposed.clone(),
            },
        )
        .await;
    assert!(response.diagnostics.is_empty());
    (response.planned_state, response.requires_replace)
}

#[tokio::test]
async fn vpc_full_lifecycle() {
    let mut server = Server::new_async().await;
    let provider = configured_provider(&server.url()).await;
    let resource = provider.create_resource("cloudinfra_vpc").unwrap();

    let config = vpc_config("10.0.0.0/16", Value::Known("app tier".to_string()));
    let validation = resource
        .validate(
            Context::new(),
            ValidateResourceConfigRequest {
                type_name: "cloudinfra_vpc".to_string(),
                config: config.clone(),
            },
        )
        .await;
    assert!(validation.diagnostics.is_empty(), "{:?}", validation.diagnostics);

    // create
    let (planned, replace) = plan(resource.as_ref(), &config, &DynamicValue::null(), &config).await;
    assert!(replace.is_empty());
    assert_eq!(VpcModel::from_state(&planned).unwrap().id, Value::Unknown);

    let create_mock = server
        .mock("POST", "/vpcs")
        .match_header("authorization", format!("Bearer {}", TOKEN).as_str())
        .match_body(Matcher::Json(serde_json::json!({
            "name": "backend",
            "ip_range": "10.0.0.0/16",
            "description": "app tier"
        })))
        .with_status(201)
        .with_body(vpc_body(Some("app tier")))
        .create_async()
        .await;

    let created = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "cloudinfra_vpc".to_string(),
                planned_state: planned,
                config: config.clone(),
            },
        )
        .await;
    assert!(created.diagnostics.is_empty(), "{:?}", created.diagnostics);
    create_mock.assert_async().await;
    let state = created.new_state;
    let model = VpcModel::from_state(&state).unwrap();
    assert_eq!(model.id, Value::Known(11));
    assert_eq!(model.created, Value::Known("2026-02-01T08:00:00+00:00".to_string()));

    // an unchanged config plans no change
    let (planned, replace) = plan(resource.as_ref(), &config, &state, &state).await;
    assert!(replace.is_empty());
    assert_eq!(planned, state);

    // refresh
    let _get = server
        .mock("GET", "/vpcs/11")
        .with_status(200)
        .with_body(vpc_body(Some("app tier")))
        .create_async()
        .await;
    let refreshed = resource
        .read(
            Context::new(),
            ReadResourceRequest {
                type_name: "cloudinfra_vpc".to_string(),
                current_state: state.clone(),
            },
        )
        .await;
    assert_eq!(refreshed.new_state.as_ref(), Some(&state));

    // clearing the description updates in place
    let mut proposed = state.clone();
    proposed
        .set_value(&AttributePath::new("description"), Value::<String>::Null)
        .unwrap();
    let new_config = vpc_config("10.0.0.0/16", Value::Null);
    let (planned, replace) = plan(resource.as_ref(), &new_config, &state, &proposed).await;
    assert!(replace.is_empty());
    let planned_model = VpcModel::from_state(&planned).unwrap();
    assert_eq!(planned_model.id, Value::Known(11));

    let update_mock = server
        .mock("PUT", "/vpcs/11")
        .match_body(Matcher::Json(serde_json::json!({
            "name": "backend",
            "description": null
        })))
        .with_status(200)
        .with_body(vpc_body(None))
        .create_async()
        .await;
    let updated = resource
        .update(
            Context::new(),
            UpdateResourceRequest {
                type_name: "cloudinfra_vpc".to_string(),
                prior_state: state,
                planned_state: planned,
                config: new_config,
            },
        )
        .await;
    assert!(updated.diagnostics.is_empty(), "{:?}", updated.diagnostics);
    update_mock.assert_async().await;
    let state = updated.new_state;
    assert_eq!(VpcModel::from_state(&state).unwrap().description, Value::Null);

    // a new ip range forces replacement
    let mut proposed = state.clone();
    proposed
        .set_value(
            &AttributePath::new("ip_range"),
            Value::Known("10.1.0.0/16".to_string()),
        )
        .unwrap();
    let (_, replace) = plan(
        resource.as_ref(),
        &vpc_config("10.1.0.0/16", Value::Null),
        &state,
        &proposed,
    )
    .await;
    assert_eq!(replace, vec![AttributePath::new("ip_range")]);

    let delete_mock = server
        .mock("DELETE", "/vpcs/11")
        .with_status(204)
        .create_async()
        .await;
    let deleted = resource
        .delete(
            Context::new(),
            DeleteResourceRequest {
                type_name: "cloudinfra_vpc".to_string(),
                prior_state: state,
            },
        )
        .await;
    assert!(deleted.diagnostics.is_empty());
    delete_mock.assert_async().await;
}

#[tokio::test]
async fn server_removed_outside_terraform_drops_from_state() {
    let mut server = Server::new_async().await;
    let provider = configured_provider(&server.url()).await;
    let resource = provider.create_resource("cloudinfra_server").unwrap();

    let _gone = server
        .mock("GET", "/servers/42")
        .with_status(404)
        .with_body(r#"{"error":{"code":"not_found","message":"server not found"}}"#)
        .create_async()
        .await;

    let state = ServerModel {
        id: Value::Known(42),
        name: Value::Known("web-1".to_string()),
        ..ServerModel::default()
    }
    .into_state()
    .unwrap();
    let response = resource
        .read(
            Context::new(),
            ReadResourceRequest {
                type_name: "cloudinfra_server".to_string(),
                current_state: state,
            },
        )
        .await;

    assert!(response.diagnostics.is_empty());
    assert!(response.new_state.is_none());
}

#[tokio::test]
async fn server_import_then_read() {
    let mut server = Server::new_async().await;
    let provider = configured_provider(&server.url()).await;
    let resource = provider.create_resource("cloudinfra_server").unwrap();

    let _list = server
        .mock("GET", "/servers")
        .match_query(Matcher::UrlEncoded("page".into(), "1".into()))
        .with_status(200)
        .with_body(
            serde_json::json!({
                "servers": [{"id": 42, "name": "web-1"}],
                "meta": {"pagination": {"page": 1, "per_page": 200}},
                "links": {"pages": {}}
            })
            .to_string(),
        )
        .create_async()
        .await;
    let _get = server
        .mock("GET", "/servers/42")
        .with_status(200)
        .with_body(
            serde_json::json!({
                "server": {
                    "id": 42,
                    "name": "web-1",
                    "status": "running",
                    "server_type": "cx22",
                    "image": "debian-12",
                    "location": "fsn1",
                    "ssh_keys": [7],
                    "backups": true,
                    "delete_protection": false,
                    "ipv4_address": "203.0.113.10"
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let imported = resource
        .import_state(
            Context::new(),
            ImportResourceStateRequest {
                type_name: "cloudinfra_server".to_string(),
                id: "web-1".to_string(),
            },
        )
        .await;
    assert!(imported.diagnostics.is_empty(), "{:?}", imported.diagnostics);
    let state = imported.imported_resources[0].state.clone();

    let read = resource
        .read(
            Context::new(),
            ReadResourceRequest {
                type_name: "cloudinfra_server".to_string(),
                current_state: state,
            },
        )
        .await;
    let model = ServerModel::from_state(&read.new_state.unwrap()).unwrap();
    assert_eq!(model.server_type, Value::Known("cx22".to_string()));
    assert_eq!(model.ssh_keys, Value::Known(vec![7]));
    assert_eq!(model.backups, Value::Known(true));
    assert_eq!(model.ipv6_address, Value::Null);
}
