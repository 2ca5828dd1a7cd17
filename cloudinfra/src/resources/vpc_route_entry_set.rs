//! VPC route entry set resource implementation

use super::{
    api_error, existing_id_conflict, import_failed, imported, parse_parent_id, required,
    state_error, state_id,
};
use crate::api::routes::{Route, SetRoutesRequest};
use crate::api::Client;
use async_trait::async_trait;
use std::sync::Arc;
use tfkit::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfkit::resource::{
    CreateResourceRequest, CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, UpdateResourceRequest, UpdateResourceResponse,
};
use tfkit::value::{object_type, ObjectBuilder, ObjectReader};
use tfkit::{
    AttributeBuilder, AttributePath, AttributeType, AttributeValue, Context, Diagnostic, Dynamic,
    DynamicValue, Schema, SchemaBuilder, Value,
};

pub const TYPE_NAME: &str = "cloudinfra_vpc_route_entry_set";

fn route_attributes() -> Vec<(&'static str, AttributeType)> {
    vec![
        ("destination", AttributeType::String),
        ("gateway", AttributeType::String),
    ]
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteModel {
    pub destination: Value<String>,
    pub gateway: Value<String>,
}

impl RouteModel {
    fn from_api(route: &Route) -> Self {
        Self {
            destination: Value::Known(route.destination.clone()),
            gateway: Value::Known(route.gateway.clone()),
        }
    }

    fn to_api(&self) -> tfkit::Result<Route> {
        Ok(Route {
            destination: required(&self.destination, "routes.destination")?,
            gateway: required(&self.gateway, "routes.gateway")?,
        })
    }
}

impl AttributeValue for RouteModel {
    fn attribute_type() -> AttributeType {
        object_type(&route_attributes())
    }

    fn from_dynamic(raw: &Dynamic) -> tfkit::Result<Self> {
        let object = ObjectReader::checked(raw, &route_attributes())?;
        Ok(Self {
            destination: object.get("destination")?,
            gateway: object.get("gateway")?,
        })
    }

    fn into_dynamic(self) -> tfkit::Result<Dynamic> {
        let types = route_attributes();
        ObjectBuilder::new(&types)
            .set("destination", self.destination)?
            .set("gateway", self.gateway)?
            .build()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VpcRouteEntrySetModel {
    pub id: Value<i64>,
    pub vpc_id: Value<i64>,
    pub routes: Value<Vec<RouteModel>>,
}

impl VpcRouteEntrySetModel {
    pub fn from_state(state: &DynamicValue) -> tfkit::Result<Self> {
        Ok(Self {
            id: state.get_value(&AttributePath::new("id"))?,
            vpc_id: state.get_value(&AttributePath::new("vpc_id"))?,
            routes: state.get_value(&AttributePath::new("routes"))?,
        })
    }

    pub fn into_state(self) -> tfkit::Result<DynamicValue> {
        let mut state = DynamicValue::object();
        state.set_value(&AttributePath::new("id"), self.id)?;
        state.set_value(&AttributePath::new("vpc_id"), self.vpc_id)?;
        state.set_value(&AttributePath::new("routes"), self.routes)?;
        Ok(state)
    }

    pub fn to_set_request(&self) -> tfkit::Result<SetRoutesRequest> {
        let routes = self
            .routes
            .clone()
            .to_remote_list()
            .iter()
            .map(RouteModel::to_api)
            .collect::<tfkit::Result<Vec<_>>>()?;
        Ok(SetRoutesRequest { routes })
    }

    pub fn apply_remote(&mut self, vpc_id: i64, routes: Option<&[Route]>) {
        self.id = Value::Known(vpc_id);
        self.vpc_id = Value::Known(vpc_id);
        self.routes = Value::from_remote_list(
            routes.map(|routes| routes.iter().map(RouteModel::from_api).collect()),
        );
    }
}

pub struct VpcRouteEntrySetResource {
    client: Arc<Client>,
}

impl VpcRouteEntrySetResource {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }

    fn build_state(model: VpcRouteEntrySetModel) -> Result<DynamicValue, Diagnostic> {
        model
            .into_state()
            .map_err(|e| state_error("Failed to build route state", &e))
    }
}

#[async_trait]
impl Resource for VpcRouteEntrySetResource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages the complete route table of a VPC")
            .attribute(
                AttributeBuilder::new("id", AttributeType::Number)
                    .description("Same as vpc_id")
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("vpc_id", AttributeType::Number)
                    .description("VPC owning the route table")
                    .required()
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("routes", Vec::<RouteModel>::attribute_type())
                    .description("Routes of the VPC; replaces any existing entries")
                    .required()
                    .build(),
            )
            .build()
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let prepared = VpcRouteEntrySetModel::from_state(&request.planned_state)
            .map_err(|e| state_error("Invalid planned state", &e))
            .and_then(|model| match existing_id_conflict(&model.id, TYPE_NAME) {
                Some(diag) => Err(diag),
                None => Ok(model),
            })
            .and_then(|model| {
                let vpc_id = required(&model.vpc_id, "vpc_id")
                    .map_err(|e| state_error("Invalid route configuration", &e))?;
                let set_request = model
                    .to_set_request()
                    .map_err(|e| state_error("Invalid route configuration", &e))?;
                Ok((model, vpc_id, set_request))
            });
        let (mut model, vpc_id, set_request) = match prepared {
            Ok(prepared) => prepared,
            Err(diag) => {
                return CreateResourceResponse {
                    new_state: DynamicValue::null(),
                    diagnostics: vec![diag],
                }
            }
        };

        match self.client.routes().get(&ctx, vpc_id).await {
            Ok(table) if table.routes.as_ref().is_some_and(|r| !r.is_empty()) => {
                return CreateResourceResponse {
                    new_state: DynamicValue::null(),
                    diagnostics: vec![Diagnostic::error(
                        "Routes already exist",
                        format!(
                            "VPC {} already has route entries. Import them with \
                             `terraform import {}.<name> {}` instead.",
                            vpc_id, TYPE_NAME, vpc_id
                        ),
                    )],
                };
            }
            Ok(_) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => {
                return CreateResourceResponse {
                    new_state: DynamicValue::null(),
                    diagnostics: vec![api_error("Failed to read existing routes", &e)],
                }
            }
        }

        tracing::info!("Setting {} routes on VPC {}", set_request.routes.len(), vpc_id);
        let result = self
            .client
            .routes()
            .set(&ctx, vpc_id, &set_request)
            .await
            .map_err(|e| api_error("Failed to create routes", &e))
            .and_then(|table| {
                model.apply_remote(vpc_id, table.routes.as_deref());
                Self::build_state(model)
            });

        match result {
            Ok(new_state) => CreateResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(diag) => CreateResourceResponse {
                new_state: DynamicValue::null(),
                diagnostics: vec![diag],
            },
        }
    }

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let loaded = VpcRouteEntrySetModel::from_state(&request.current_state)
            .map_err(|e| state_error("Invalid route state", &e))
            .and_then(|model| state_id(&model.id).map(|id| (model, id)));
        let (mut model, vpc_id) = match loaded {
            Ok(loaded) => loaded,
            Err(diag) => {
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics: vec![diag],
                }
            }
        };

        match self.client.routes().get(&ctx, vpc_id).await {
            Ok(table) => {
                model.apply_remote(vpc_id, table.routes.as_deref());
                match Self::build_state(model) {
                    Ok(state) => ReadResourceResponse {
                        new_state: Some(state),
                        diagnostics: vec![],
                    },
                    Err(diag) => ReadResourceResponse {
                        new_state: Some(request.current_state),
                        diagnostics: vec![diag],
                    },
                }
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!("VPC {} no longer exists, removing routes from state", vpc_id);
                ReadResourceResponse {
                    new_state: None,
                    diagnostics: vec![],
                }
            }
            Err(e) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![api_error("Failed to read routes", &e)],
            },
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let prepared = VpcRouteEntrySetModel::from_state(&request.prior_state)
            .and_then(|prior| {
                VpcRouteEntrySetModel::from_state(&request.planned_state).map(|p| (prior, p))
            })
            .map_err(|e| state_error("Invalid route state", &e))
            .and_then(|(prior, planned)| {
                let vpc_id = state_id(&prior.id)?;
                let set_request = planned
                    .to_set_request()
                    .map_err(|e| state_error("Invalid route configuration", &e))?;
                Ok((vpc_id, planned, set_request))
            });
        let (vpc_id, mut planned, set_request) = match prepared {
            Ok(prepared) => prepared,
            Err(diag) => {
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics: vec![diag],
                }
            }
        };

        let result = self
            .client
            .routes()
            .set(&ctx, vpc_id, &set_request)
            .await
            .map_err(|e| api_error("Failed to update routes", &e))
            .and_then(|table| {
                planned.apply_remote(vpc_id, table.routes.as_deref());
                Self::build_state(planned)
            });

        match result {
            Ok(new_state) => UpdateResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(diag) => UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics: vec![diag],
            },
        }
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let vpc_id = VpcRouteEntrySetModel::from_state(&request.prior_state)
            .map_err(|e| state_error("Invalid route state", &e))
            .and_then(|model| state_id(&model.id));

        let diagnostics = match vpc_id {
            Ok(vpc_id) => match self.client.routes().delete(&ctx, vpc_id).await {
                Ok(()) => vec![],
                Err(e) => vec![api_error("Failed to delete routes", &e)],
            },
            Err(diag) => vec![diag],
        };
        DeleteResourceResponse { diagnostics }
    }

    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        match parse_parent_id(&request.id, "VPC") {
            Ok(vpc_id) => imported(
                TYPE_NAME,
                VpcRouteEntrySetModel {
                    id: Value::Known(vpc_id),
                    vpc_id: Value::Known(vpc_id),
                    routes: Value::Null,
                }
                .into_state(),
            ),
            Err(diag) => import_failed(diag),
        }
    }
}
