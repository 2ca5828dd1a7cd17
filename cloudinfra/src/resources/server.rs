//! Server resource implementation

use super::{
    api_error, existing_id_conflict, import_failed, import_not_found, imported, required,
    state_error, state_id,
};
use crate::api::servers::{CreateServerRequest, Server, UpdateServerRequest};
use crate::api::Client;
use crate::pagination;
use crate::poller::{Poller, PollerConfig};
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
    AttributeBuilder, AttributePath, AttributeType, Context, Diagnostic, DynamicValue, Schema,
    SchemaBuilder, Value,
};

pub const TYPE_NAME: &str = "cloudinfra_server";

/// Terraform view of a server
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerModel {
    pub id: Value<i64>,
    pub name: Value<String>,
    pub server_type: Value<String>,
    pub image: Value<String>,
    pub location: Value<String>,
    pub ssh_keys: Value<Vec<i64>>,
    pub user_data: Value<String>,
    pub vpc_id: Value<i64>,
    pub backups: Value<bool>,
    pub delete_protection: Value<bool>,
    pub status: Value<String>,
    pub ipv4_address: Value<String>,
    pub ipv6_address: Value<String>,
    pub created: Value<String>,
}

impl ServerModel {
    pub fn from_state(state: &DynamicValue) -> tfkit::Result<Self> {
        Ok(Self {
            id: state.get_value(&AttributePath::new("id"))?,
            name: state.get_value(&AttributePath::new("name"))?,
            server_type: state.get_value(&AttributePath::new("server_type"))?,
            image: state.get_value(&AttributePath::new("image"))?,
            location: state.get_value(&AttributePath::new("location"))?,
            ssh_keys: state.get_value(&AttributePath::new("ssh_keys"))?,
            user_data: state.get_value(&AttributePath::new("user_data"))?,
            vpc_id: state.get_value(&AttributePath::new("vpc_id"))?,
            backups: state.get_value(&AttributePath::new("backups"))?,
            delete_protection: state.get_value(&AttributePath::new("delete_protection"))?,
            status: state.get_value(&AttributePath::new("status"))?,
            ipv4_address: state.get_value(&AttributePath::new("ipv4_address"))?,
            ipv6_address: state.get_value(&AttributePath::new("ipv6_address"))?,
            created: state.get_value(&AttributePath::new("created"))?,
        })
    }

    pub fn into_state(self) -> tfkit::Result<DynamicValue> {
        let mut state = DynamicValue::object();
        state.set_value(&AttributePath::new("id"), self.id)?;
        state.set_value(&AttributePath::new("name"), self.name)?;
        state.set_value(&AttributePath::new("server_type"), self.server_type)?;
        state.set_value(&AttributePath::new("image"), self.image)?;
        state.set_value(&AttributePath::new("location"), self.location)?;
        state.set_value(&AttributePath::new("ssh_keys"), self.ssh_keys)?;
        state.set_value(&AttributePath::new("user_data"), self.user_data)?;
        state.set_value(&AttributePath::new("vpc_id"), self.vpc_id)?;
        state.set_value(&AttributePath::new("backups"), self.backups)?;
        state.set_value(
            &AttributePath::new("delete_protection"),
            self.delete_protection,
        )?;
        state.set_value(&AttributePath::new("status"), self.status)?;
        state.set_value(&AttributePath::new("ipv4_address"), self.ipv4_address)?;
        state.set_value(&AttributePath::new("ipv6_address"), self.ipv6_address)?;
        state.set_value(&AttributePath::new("created"), self.created)?;
        Ok(state)
    }

    pub fn to_create_request(&self) -> tfkit::Result<CreateServerRequest> {
        Ok(CreateServerRequest {
            name: required(&self.name, "name")?,
            server_type: required(&self.server_type, "server_type")?,
            image: required(&self.image, "image")?,
            location: required(&self.location, "location")?,
            ssh_keys: self.ssh_keys.clone().to_remote_list(),
            user_data: self.user_data.clone().into_option(),
            vpc_id: self.vpc_id.clone().into_option(),
            backups: self.backups.clone().into_option(),
            delete_protection: self.delete_protection.clone().into_option(),
        })
    }

    /// Only name, backups and delete_protection change in place
    pub fn to_update_request(&self) -> UpdateServerRequest {
        UpdateServerRequest {
            name: self.name.clone().into_option(),
            backups: self.backups.clone().into_option(),
            delete_protection: self.delete_protection.clone().into_option(),
        }
    }

    /// Copies API values over the model. `user_data` is write-only and keeps
    /// its configured value.
    pub fn apply_remote(&mut self, server: &Server) {
        self.id = Value::Known(server.id);
        self.name = Value::Known(server.name.clone());
        self.server_type = Value::from_option(server.server_type.clone());
        self.image = Value::from_option(server.image.clone());
        self.location = Value::from_option(server.location.clone());
        self.ssh_keys = Value::from_remote_list(server.ssh_keys.clone());
        self.vpc_id = Value::from_option(server.vpc_id);
        self.backups = Value::from_option(server.backups);
        self.delete_protection = Value::from_option(server.delete_protection);
        self.status = Value::from_option(server.status.clone());
        self.ipv4_address = Value::from_option(server.ipv4_address.clone());
        self.ipv6_address = Value::from_option(server.ipv6_address.clone());
        self.created = Value::from_option(server.created.map(|c| c.to_rfc3339()));
    }
}

pub struct ServerResource {
    client: Arc<Client>,
    poller: Poller,
}

impl ServerResource {
    pub fn new(client: Arc<Client>) -> Self {
        Self::with_poller_config(client, PollerConfig::default())
    }

    pub fn with_poller_config(client: Arc<Client>, config: PollerConfig) -> Self {
        Self {
            client,
            poller: Poller::new(config),
        }
    }

    fn failed_create(diagnostic: Diagnostic) -> CreateResourceResponse {
        CreateResourceResponse {
            new_state: DynamicValue::null(),
            diagnostics: vec![diagnostic],
        }
    }
}

#[async_trait]
impl Resource for ServerResource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a CloudInfra server")
            .attribute(
                AttributeBuilder::new("id", AttributeType::Number)
                    .description("Server ID")
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Server name, unique per project")
                    .required()
                    .validator(StringLengthValidator {
                        min: Some(1),
                        max: Some(63),
                    })
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("server_type", AttributeType::String)
                    .description("Server type (e.g., cx22)")
                    .required()
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("image", AttributeType::String)
                    .description("Image name or ID to boot from")
                    .required()
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("location", AttributeType::String)
                    .description("Location to create the server in")
                    .required()
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "ssh_keys",
                    AttributeType::List(Box::new(AttributeType::Number)),
                )
                .description("SSH key IDs installed at creation")
                .optional()
                .computed()
                .plan_modifier(RequiresReplace)
                .build(),
            )
            .attribute(
                AttributeBuilder::new("user_data", AttributeType::String)
                    .description("Cloud-init user data")
                    .optional()
                    .sensitive()
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("vpc_id", AttributeType::Number)
                    .description("VPC to attach the server to")
                    .optional()
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("backups", AttributeType::Bool)
                    .description("Enable automatic backups")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("delete_protection", AttributeType::Bool)
                    .description("Prevent the server from being deleted")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("status", AttributeType::String)
                    .description("Server status")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("ipv4_address", AttributeType::String)
                    .description("Public IPv4 address")
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("ipv6_address", AttributeType::String)
                    .description("Public IPv6 address")
                    .computed()
                    .plan_modifier(UseStateForUnknown)
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

        let mut model = match ServerModel::from_state(&request.planned_state) {
            Ok(model) => model,
            Err(e) => return Self::failed_create(state_error("Invalid planned state", &e)),
        };

        if let Some(diag) = existing_id_conflict(&model.id, TYPE_NAME) {
            return Self::failed_create(diag);
        }

        let create_request = match model.to_create_request() {
            Ok(req) => req,
            Err(e) => return Self::failed_create(state_error("Invalid server configuration", &e)),
        };

        tracing::info!("Creating server {}", create_request.name);
        let created = match self.client.servers().create(&ctx, &create_request).await {
            Ok(created) => created,
            Err(e) => return Self::failed_create(api_error("Failed to create server", &e)),
        };

        model.apply_remote(&created.server);

        if let Some(action) = created.action {
            match self
                .poller
                .wait_for_action(&ctx, &self.client, action.id)
                .await
            {
                Ok(_) => match self.client.servers().get(&ctx, created.server.id).await {
                    Ok(server) => model.apply_remote(&server),
                    Err(e) => diagnostics.push(Diagnostic::warning(
                        "Failed to refresh server after creation",
                        format!("API error: {}", e),
                    )),
                },
                Err(e) => {
                    tracing::warn!("Server {} did not become ready: {}", created.server.id, e);
                    diagnostics.push(Diagnostic::error(
                        "Server creation did not complete",
                        e.to_string(),
                    ));
                }
            }
        }

        match model.into_state() {
            Ok(new_state) => CreateResourceResponse {
                new_state,
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(state_error("Failed to build server state", &e));
                CreateResourceResponse {
                    new_state: DynamicValue::null(),
                    diagnostics,
                }
            }
        }
    }

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let mut model = match ServerModel::from_state(&request.current_state) {
            Ok(model) => model,
            Err(e) => {
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics: vec![state_error("Invalid server state", &e)],
                }
            }
        };

        let id = match state_id(&model.id) {
            Ok(id) => id,
            Err(diag) => {
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics: vec![diag],
                }
            }
        };

        match self.client.servers().get(&ctx, id).await {
            Ok(server) => {
                model.apply_remote(&server);
                match model.into_state() {
                    Ok(state) => ReadResourceResponse {
                        new_state: Some(state),
                        diagnostics: vec![],
                    },
                    Err(e) => ReadResourceResponse {
                        new_state: Some(request.current_state),
                        diagnostics: vec![state_error("Failed to build server state", &e)],
                    },
                }
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!("Server {} no longer exists, removing from state", id);
                ReadResourceResponse {
                    new_state: None,
                    diagnostics: vec![],
                }
            }
            Err(e) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![api_error("Failed to read server", &e)],
            },
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let prior = ServerModel::from_state(&request.prior_state);
        let planned = ServerModel::from_state(&request.planned_state);
        let (prior, mut planned) = match (prior, planned) {
            (Ok(prior), Ok(planned)) => (prior, planned),
            (Err(e), _) | (_, Err(e)) => {
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics: vec![state_error("Invalid server state", &e)],
                }
            }
        };

        let id = match state_id(&prior.id) {
            Ok(id) => id,
            Err(diag) => {
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics: vec![diag],
                }
            }
        };

        let update_request = planned.to_update_request();
        tracing::debug!("Updating server {}: {:?}", id, update_request);

        match self.client.servers().update(&ctx, id, &update_request).await {
            Ok(server) => {
                planned.apply_remote(&server);
                match planned.into_state() {
                    Ok(new_state) => UpdateResourceResponse {
                        new_state,
                        diagnostics: vec![],
                    },
                    Err(e) => UpdateResourceResponse {
                        new_state: request.prior_state,
                        diagnostics: vec![state_error("Failed to build server state", &e)],
                    },
                }
            }
            Err(e) => UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics: vec![api_error("Failed to update server", &e)],
            },
        }
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let id = match ServerModel::from_state(&request.prior_state) {
            Ok(model) => state_id(&model.id),
            Err(e) => Err(state_error("Invalid server state", &e)),
        };
        let id = match id {
            Ok(id) => id,
            Err(diag) => {
                return DeleteResourceResponse {
                    diagnostics: vec![diag],
                }
            }
        };

        tracing::info!("Deleting server {}", id);
        match self.client.servers().delete(&ctx, id).await {
            Ok(()) => DeleteResourceResponse {
                diagnostics: vec![],
            },
            Err(e) => DeleteResourceResponse {
                diagnostics: vec![api_error("Failed to delete server", &e)],
            },
        }
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
            move |page, per_page| async move { client.servers().list(ctx, page, per_page).await },
            |server: &Server| server.name.as_str(),
            |server| server.id,
        )
        .await;

        match resolved {
            Ok(Some(id)) => {
                let model = ServerModel {
                    id: Value::Known(id),
                    ..Default::default()
                };
                imported(TYPE_NAME, model.into_state())
            }
            Ok(None) => import_failed(import_not_found("Server", &request.id)),
            Err(e) => import_failed(api_error("Failed to look up server", &e)),
        }
    }
}

#[cfg(test)]
#[path = "./server_test.rs"]
mod server_test;
