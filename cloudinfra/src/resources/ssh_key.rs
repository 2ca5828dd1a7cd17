//! SSH key resource implementation

use super::{
    api_error, existing_id_conflict, import_failed, import_not_found, imported, required,
    state_error, state_id,
};
use crate::api::ssh_keys::{CreateSshKeyRequest, SshKey, UpdateSshKeyRequest};
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
    TrimmedString, Value,
};

pub const TYPE_NAME: &str = "cloudinfra_ssh_key";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SshKeyModel {
    pub id: Value<i64>,
    pub name: Value<String>,
    pub public_key: Value<TrimmedString>,
    pub fingerprint: Value<String>,
}

impl SshKeyModel {
    pub fn from_state(state: &DynamicValue) -> tfkit::Result<Self> {
        Ok(Self {
            id: state.get_value(&AttributePath::new("id"))?,
            name: state.get_value(&AttributePath::new("name"))?,
            public_key: state.get_value(&AttributePath::new("public_key"))?,
            fingerprint: state.get_value(&AttributePath::new("fingerprint"))?,
        })
    }

    pub fn into_state(self) -> tfkit::Result<DynamicValue> {
        let mut state = DynamicValue::object();
        state.set_value(&AttributePath::new("id"), self.id)?;
        state.set_value(&AttributePath::new("name"), self.name)?;
        state.set_value(&AttributePath::new("public_key"), self.public_key)?;
        state.set_value(&AttributePath::new("fingerprint"), self.fingerprint)?;
        Ok(state)
    }

    pub fn to_create_request(&self) -> tfkit::Result<CreateSshKeyRequest> {
        Ok(CreateSshKeyRequest {
            name: required(&self.name, "name")?,
            public_key: required(&self.public_key, "public_key")?.0,
        })
    }

    pub fn to_update_request(&self) -> tfkit::Result<UpdateSshKeyRequest> {
        Ok(UpdateSshKeyRequest {
            name: required(&self.name, "name")?,
        })
    }

    /// The API returns the key without trailing whitespace; the configured
    /// spelling is kept when the two only differ there.
    pub fn apply_remote(&mut self, key: &SshKey) {
        self.id = Value::Known(key.id);
        self.name = Value::Known(key.name.clone());
        self.public_key =
            Value::Known(TrimmedString::new(key.public_key.clone())).prefer_prior(&self.public_key);
        self.fingerprint = Value::from_option(key.fingerprint.clone());
    }
}

pub struct SshKeyResource {
    client: Arc<Client>,
}

impl SshKeyResource {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Resource for SshKeyResource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages an SSH public key that can be installed on servers")
            .attribute(
                AttributeBuilder::new("id", AttributeType::Number)
                    .description("SSH key ID")
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("SSH key name")
                    .required()
                    .validator(StringLengthValidator {
                        min: Some(1),
                        max: Some(128),
                    })
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("public_key", AttributeType::String)
                    .description("Public key in OpenSSH format")
                    .required()
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("fingerprint", AttributeType::String)
                    .description("MD5 fingerprint of the key")
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .build()
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let mut diagnostics = vec![];

        let model = SshKeyModel::from_state(&request.planned_state)
            .map_err(|e| state_error("Invalid planned state", &e))
            .and_then(|model| match existing_id_conflict(&model.id, TYPE_NAME) {
                Some(diag) => Err(diag),
                None => Ok(model),
            })
            .and_then(|model| {
                model
                    .to_create_request()
                    .map(|req| (model, req))
                    .map_err(|e| state_error("Invalid SSH key configuration", &e))
            });
        let (mut model, create_request) = match model {
            Ok(found) => found,
            Err(diag) => {
                diagnostics.push(diag);
                return CreateResourceResponse {
                    new_state: DynamicValue::null(),
                    diagnostics,
                };
            }
        };

        match self.client.ssh_keys().create(&ctx, &create_request).await {
            Ok(key) => {
                tracing::info!("Created SSH key {} ({})", key.name, key.id);
                model.apply_remote(&key);
            }
            Err(e) => {
                diagnostics.push(api_error("Failed to create SSH key", &e));
                return CreateResourceResponse {
                    new_state: DynamicValue::null(),
                    diagnostics,
                };
            }
        }

        let new_state = model.into_state().unwrap_or_else(|e| {
            diagnostics.push(state_error("Failed to build SSH key state", &e));
            DynamicValue::null()
        });
        CreateResourceResponse {
            new_state,
            diagnostics,
        }
    }

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let mut diagnostics = vec![];

        let model = SshKeyModel::from_state(&request.current_state)
            .map_err(|e| state_error("Invalid SSH key state", &e))
            .and_then(|model| state_id(&model.id).map(|id| (model, id)));
        let (mut model, id) = match model {
            Ok(found) => found,
            Err(diag) => {
                diagnostics.push(diag);
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                };
            }
        };

        let key = match self.client.ssh_keys().get(&ctx, id).await {
            Ok(key) => key,
            Err(e) if e.is_not_found() => {
                tracing::warn!("SSH key {} no longer exists, removing from state", id);
                return ReadResourceResponse {
                    new_state: None,
                    diagnostics,
                };
            }
            Err(e) => {
                diagnostics.push(api_error("Failed to read SSH key", &e));
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                };
            }
        };

        model.apply_remote(&key);
        let new_state = match model.into_state() {
            Ok(state) => state,
            Err(e) => {
                diagnostics.push(state_error("Failed to build SSH key state", &e));
                request.current_state
            }
        };
        ReadResourceResponse {
            new_state: Some(new_state),
            diagnostics,
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let mut diagnostics = vec![];

        let prepared = SshKeyModel::from_state(&request.prior_state)
            .and_then(|prior| SshKeyModel::from_state(&request.planned_state).map(|p| (prior, p)))
            .map_err(|e| state_error("Invalid SSH key state", &e))
            .and_then(|(prior, planned)| {
                let id = state_id(&prior.id)?;
                let update_request = planned
                    .to_update_request()
                    .map_err(|e| state_error("Invalid SSH key configuration", &e))?;
                Ok((id, planned, update_request))
            });
        let (id, mut planned, update_request) = match prepared {
            Ok(prepared) => prepared,
            Err(diag) => {
                diagnostics.push(diag);
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                };
            }
        };

        match self.client.ssh_keys().update(&ctx, id, &update_request).await {
            Ok(key) => planned.apply_remote(&key),
            Err(e) => {
                diagnostics.push(api_error("Failed to update SSH key", &e));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                };
            }
        }

        match planned.into_state() {
            Ok(new_state) => UpdateResourceResponse {
                new_state,
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(state_error("Failed to build SSH key state", &e));
                UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                }
            }
        }
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let id = SshKeyModel::from_state(&request.prior_state)
            .map_err(|e| state_error("Invalid SSH key state", &e))
            .and_then(|model| state_id(&model.id));

        let diagnostics = match id {
            Ok(id) => match self.client.ssh_keys().delete(&ctx, id).await {
                Ok(()) => vec![],
                Err(e) => vec![api_error("Failed to delete SSH key", &e)],
            },
            Err(diag) => vec![diag],
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
            move |page, per_page| async move { client.ssh_keys().list(ctx, page, per_page).await },
            |key: &SshKey| key.name.as_str(),
            |key| key.id,
        )
        .await;

        match resolved {
            Ok(Some(id)) => imported(
                TYPE_NAME,
                SshKeyModel {
                    id: Value::Known(id),
                    ..Default::default()
                }
                .into_state(),
            ),
            Ok(None) => import_failed(import_not_found("SSH key", &request.id)),
            Err(e) => import_failed(api_error("Failed to look up SSH key", &e)),
        }
    }
}
