//! VPC resource implementation

use super::{
    api_error, existing_id_conflict, import_failed, import_not_found, imported, required,
    state_error, state_id,
};
use crate::api::vpcs::{CreateVpcRequest, UpdateVpcRequest, Vpc};
use crate::api::Client;
use crate::pagination;
use async_trait::async_trait;
use std::sync::Arc;
use tfkit::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfkit::resource::{
    CreateResourceRequest, CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, UpdateResourceRequest, UpdateResourceResponse,
};
use tfkit::validator::StringLengthValidator;
use tfkit::{
    AttributeBuilder, AttributePath, AttributeType, Context, DynamicValue, Schema, SchemaBuilder,
    Value,
};

pub const TYPE_NAME: &str = "cloudinfra_vpc";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VpcModel {
    pub id: Value<i64>,
    pub name: Value<String>,
    pub ip_range: Value<String>,
    pub description: Value<String>,
    pub created: Value<String>,
}

impl VpcModel {
    pub fn from_state(state: &DynamicValue) -> tfkit::Result<Self> {
        Ok(Self {
            id: state.get_value(&AttributePath::new("id"))?,
            name: state.get_value(&AttributePath::new("name"))?,
            ip_range: state.get_value(&AttributePath::new("ip_range"))?,
            description: state.get_value(&AttributePath::new("description"))?,
            created: state.get_value(&AttributePath::new("created"))?,
        })
    }

    pub fn into_state(self) -> tfkit::Result<DynamicValue> {
        let mut state = DynamicValue::object();
        state.set_value(&AttributePath::new("id"), self.id)?;
        state.set_value(&AttributePath::new("name"), self.name)?;
        state.set_value(&AttributePath::new("ip_range"), self.ip_range)?;
        state.set_value(&AttributePath::new("description"), self.description)?;
        state.set_value(&AttributePath::new("created"), self.created)?;
        Ok(state)
    }

    pub fn to_create_request(&self) -> tfkit::Result<CreateVpcRequest> {
        Ok(CreateVpcRequest {
            name: required(&self.name, "name")?,
            ip_range: required(&self.ip_range, "ip_range")?,
            description: self.description.clone().into_option(),
        })
    }

    /// A null description is sent explicitly so the API clears it
    pub fn to_update_request(&self) -> UpdateVpcRequest {
        UpdateVpcRequest {
            name: self.name.clone().into_option(),
            description: self.description.clone().into_option(),
        }
    }

    pub fn apply_remote(&mut self, vpc: &Vpc) {
        self.id = Value::Known(vpc.id);
        self.name = Value::Known(vpc.name.clone());
        self.ip_range = Value::from_option(vpc.ip_range.clone());
        self.description = Value::from_option(vpc.description.clone());
        self.created = Value::from_option(vpc.created.map(|c| c.to_rfc3339()));
    }
}

pub struct VpcResource {
    client: Arc<Client>,
}

impl VpcResource {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Resource for VpcResource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a CloudInfra VPC")
            .attribute(
                AttributeBuilder::new("id", AttributeType::Number)
                    .description("VPC ID")
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("VPC name")
                    .required()
                    .validator(StringLengthValidator {
                        min: Some(1),
                        max: Some(63),
                    })
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("ip_range", AttributeType::String)
                    .description("Private IPv4 range in CIDR notation")
                    .required()
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("Free-form description")
                    .optional()
                    .validator(StringLengthValidator {
                        min: None,
                        max: Some(255),
                    })
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("created", AttributeType::String)
                    .description("Creation time (RFC 3339)")
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .build()
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let mut diagnostics = vec![];

        let mut model = match VpcModel::from_state(&request.planned_state) {
            Ok(model) => model,
            Err(e) => {
                diagnostics.push(state_error("Invalid planned state", &e));
                return CreateResourceResponse {
                    new_state: DynamicValue::null(),
                    diagnostics,
                };
            }
        };

        if let Some(diag) = existing_id_conflict(&model.id, TYPE_NAME) {
            diagnostics.push(diag);
            return CreateResourceResponse {
                new_state: DynamicValue::null(),
                diagnostics,
            };
        }

        let result = match model.to_create_request() {
            Ok(create_request) => self
                .client
                .vpcs()
                .create(&ctx, &create_request)
                .await
                .map_err(|e| api_error("Failed to create VPC", &e)),
            Err(e) => Err(state_error("Invalid VPC configuration", &e)),
        };

        match result {
            Ok(vpc) => {
                model.apply_remote(&vpc);
                match model.into_state() {
                    Ok(new_state) => CreateResourceResponse {
                        new_state,
                        diagnostics,
                    },
                    Err(e) => {
                        diagnostics.push(state_error("Failed to build VPC state", &e));
                        CreateResourceResponse {
                            new_state: DynamicValue::null(),
                            diagnostics,
                        }
                    }
                }
            }
            Err(diag) => {
                diagnostics.push(diag);
                CreateResourceResponse {
                    new_state: DynamicValue::null(),
                    diagnostics,
                }
            }
        }
    }

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let model = VpcModel::from_state(&request.current_state)
            .map_err(|e| state_error("Invalid VPC state", &e))
            .and_then(|model| state_id(&model.id).map(|id| (model, id)));
        let (mut model, id) = match model {
            Ok(found) => found,
            Err(diag) => {
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics: vec![diag],
                }
            }
        };

        match self.client.vpcs().get(&ctx, id).await {
            Ok(vpc) => {
                model.apply_remote(&vpc);
                match model.into_state() {
                    Ok(state) => ReadResourceResponse {
                        new_state: Some(state),
                        diagnostics: vec![],
                    },
                    Err(e) => ReadResourceResponse {
                        new_state: Some(request.current_state),
                        diagnostics: vec![state_error("Failed to build VPC state", &e)],
                    },
                }
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!("VPC {} no longer exists, removing from state", id);
                ReadResourceResponse {
                    new_state: None,
                    diagnostics: vec![],
                }
            }
            Err(e) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![api_error("Failed to read VPC", &e)],
            },
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let id = VpcModel::from_state(&request.prior_state)
            .map_err(|e| state_error("Invalid VPC state", &e))
            .and_then(|prior| state_id(&prior.id));
        let planned = VpcModel::from_state(&request.planned_state)
            .map_err(|e| state_error("Invalid planned state", &e));

        let (id, mut planned) = match (id, planned) {
            (Ok(id), Ok(planned)) => (id, planned),
            (Err(diag), _) | (_, Err(diag)) => {
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics: vec![diag],
                }
            }
        };

        match self
            .client
            .vpcs()
            .update(&ctx, id, &planned.to_update_request())
            .await
        {
            Ok(vpc) => {
                planned.apply_remote(&vpc);
                match planned.into_state() {
                    Ok(new_state) => UpdateResourceResponse {
                        new_state,
                        diagnostics: vec![],
                    },
                    Err(e) => UpdateResourceResponse {
                        new_state: request.prior_state,
                        diagnostics: vec![state_error("Failed to build VPC state", &e)],
                    },
                }
            }
            Err(e) => UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics: vec![api_error("Failed to update VPC", &e)],
            },
        }
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let id = VpcModel::from_state(&request.prior_state)
            .map_err(|e| state_error("Invalid VPC state", &e))
            .and_then(|model| state_id(&model.id));
        let id = match id {
            Ok(id) => id,
            Err(diag) => {
                return DeleteResourceResponse {
                    diagnostics: vec![diag],
                }
            }
        };

        tracing::info!("Deleting VPC {}", id);
        let diagnostics = match self.client.vpcs().delete(&ctx, id).await {
            Ok(()) => vec![],
            Err(e) => vec![api_error("Failed to delete VPC", &e)],
        };
        DeleteResourceResponse { diagnostics }
    }

    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let client = &self.client;
        let ctx = &ctx;
        let resolved = pagination::resolve_id(
            &request.id,
            move |page, per_page| async move { client.vpcs().list(ctx, page, per_page).await },
            |vpc: &Vpc| vpc.name.as_str(),
            |vpc| vpc.id,
        )
        .await;

        match resolved {
            Ok(Some(id)) => imported(
                TYPE_NAME,
                VpcModel {
                    id: Value::Known(id),
                    ..Default::default()
                }
                .into_state(),
            ),
            Ok(None) => import_failed(import_not_found("VPC", &request.id)),
            Err(e) => import_failed(api_error("Failed to look up VPC", &e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::{create_test_client, list_page_body};
    use mockito::{Matcher, Server as MockServer};

    fn resource(url: &str) -> VpcResource {
        VpcResource::new(Arc::new(create_test_client(url)))
    }

    fn stored_model() -> VpcModel {
        VpcModel {
            id: Value::Known(11),
            name: Value::Known("backend".to_string()),
            ip_range: Value::Known("10.0.0.0/16".to_string()),
            description: Value::Known("private network".to_string()),
            created: Value::Known("2026-02-01T08:00:00+00:00".to_string()),
        }
    }

    #[test]
    fn update_request_sends_null_description() {
        let model = VpcModel {
            description: Value::Null,
            ..stored_model()
        };
        let body = serde_json::to_value(model.to_update_request()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"name": "backend", "description": null})
        );
    }

    #[test]
    fn ip_range_forces_replacement() {
        let schema = resource("http://localhost").schema();
        let prior = stored_model().into_state().unwrap();
        let proposed = VpcModel {
            ip_range: Value::Known("10.1.0.0/16".to_string()),
            ..stored_model()
        }
        .into_state()
        .unwrap();

        let change = schema.plan(&proposed, &prior, &proposed);
        assert_eq!(change.requires_replace, vec![AttributePath::new("ip_range")]);
    }

    #[tokio::test]
    async fn create_stores_remote_values() {
        let mut server = MockServer::new_async().await;
        let mock = server
            .mock("POST", "/vpcs")
            .match_body(Matcher::Json(serde_json::json!({
                "name": "backend",
                "ip_range": "10.0.0.0/16"
            })))
            .with_status(201)
            .with_body(
                r#"{"vpc":{"id":11,"name":"backend","ip_range":"10.0.0.0/16",
                    "created":"2026-02-01T08:00:00Z"}}"#,
            )
            .create_async()
            .await;

        let planned = VpcModel {
            id: Value::Unknown,
            description: Value::Null,
            created: Value::Unknown,
            ..stored_model()
        }
        .into_state()
        .unwrap();
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
        let model = VpcModel::from_state(&response.new_state).unwrap();
        assert_eq!(
            model,
            VpcModel {
                description: Value::Null,
                ..stored_model()
            }
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn read_missing_vpc_drops_state() {
        let mut server = MockServer::new_async().await;
        let _mock = server
            .mock("GET", "/vpcs/11")
            .with_status(404)
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
    }

    #[tokio::test]
    async fn import_by_name() {
        let mut server = MockServer::new_async().await;
        let _mock = server
            .mock("GET", "/vpcs")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(list_page_body(
                "vpcs",
                serde_json::json!([{"id": 11, "name": "backend"}, {"id": 12, "name": "edge"}]),
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

        let model = VpcModel::from_state(&response.imported_resources[0].state).unwrap();
        assert_eq!(model.id, Value::Known(12));
    }
}
