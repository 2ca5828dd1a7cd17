//! Load balancer resource implementation

use super::{
    api_error, existing_id_conflict, import_failed, import_not_found, imported, required,
    state_error, state_id,
};
use crate::api::load_balancers::{
    CreateLoadBalancerRequest, ForwardingRule, HealthCheck, LoadBalancer,
    UpdateLoadBalancerRequest,
};
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
use tfkit::validator::{ListLengthValidator, OneOfValidator, StringLengthValidator};
use tfkit::value::{object_type, ObjectBuilder, ObjectReader};
use tfkit::{
    AttributeBuilder, AttributePath, AttributeType, AttributeValue, Context, Diagnostic, Dynamic,
    DynamicValue, Schema, SchemaBuilder, Value,
};

pub const TYPE_NAME: &str = "cloudinfra_load_balancer";

fn health_check_attributes() -> Vec<(&'static str, AttributeType)> {
    vec![
        ("protocol", AttributeType::String),
        ("port", AttributeType::Number),
        ("interval", AttributeType::Number),
        ("timeout", AttributeType::Number),
        ("retries", AttributeType::Number),
        ("path", AttributeType::String),
    ]
}

fn forwarding_rule_attributes() -> Vec<(&'static str, AttributeType)> {
    vec![
        ("entry_protocol", AttributeType::String),
        ("entry_port", AttributeType::Number),
        ("target_protocol", AttributeType::String),
        ("target_port", AttributeType::Number),
    ]
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HealthCheckModel {
    pub protocol: Value<String>,
    pub port: Value<i64>,
    pub interval: Value<i64>,
    pub timeout: Value<i64>,
    pub retries: Value<i64>,
    pub path: Value<String>,
}

impl HealthCheckModel {
    /// Optional fields left null in `planned` stay null even when the API
    /// reports its own default for them.
    pub fn from_api(check: &HealthCheck, planned: Option<&HealthCheckModel>) -> Self {
        let remote = Self {
            protocol: Value::Known(check.protocol.clone()),
            port: Value::Known(check.port),
            interval: Value::from_option(check.interval),
            timeout: Value::from_option(check.timeout),
            retries: Value::from_option(check.retries),
            path: Value::from_option(check.path.clone()),
        };
        match planned {
            Some(planned) => Self {
                interval: remote.interval.unless_unset(&planned.interval),
                timeout: remote.timeout.unless_unset(&planned.timeout),
                retries: remote.retries.unless_unset(&planned.retries),
                path: remote.path.unless_unset(&planned.path),
                ..remote
            },
            None => remote,
        }
    }

    pub fn to_api(&self) -> tfkit::Result<HealthCheck> {
        Ok(HealthCheck {
            protocol: required(&self.protocol, "health_check.protocol")?,
            port: required(&self.port, "health_check.port")?,
            interval: self.interval.clone().into_option(),
            timeout: self.timeout.clone().into_option(),
            retries: self.retries.clone().into_option(),
            path: self.path.clone().into_option(),
        })
    }
}

impl AttributeValue for HealthCheckModel {
    fn attribute_type() -> AttributeType {
        object_type(&health_check_attributes())
    }

    fn from_dynamic(raw: &Dynamic) -> tfkit::Result<Self> {
        let object = ObjectReader::checked(raw, &health_check_attributes())?;
        Ok(Self {
            protocol: object.get("protocol")?,
            port: object.get("port")?,
            interval: object.get("interval")?,
            timeout: object.get("timeout")?,
            retries: object.get("retries")?,
            path: object.get("path")?,
        })
    }

    fn into_dynamic(self) -> tfkit::Result<Dynamic> {
        let types = health_check_attributes();
        ObjectBuilder::new(&types)
            .set("protocol", self.protocol)?
            .set("port", self.port)?
            .set("interval", self.interval)?
            .set("timeout", self.timeout)?
            .set("retries", self.retries)?
            .set("path", self.path)?
            .build()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForwardingRuleModel {
    pub entry_protocol: Value<String>,
    pub entry_port: Value<i64>,
    pub target_protocol: Value<String>,
    pub target_port: Value<i64>,
}

impl ForwardingRuleModel {
    pub fn from_api(rule: &ForwardingRule) -> Self {
        Self {
            entry_protocol: Value::Known(rule.entry_protocol.clone()),
            entry_port: Value::Known(rule.entry_port),
            target_protocol: Value::Known(rule.target_protocol.clone()),
            target_port: Value::Known(rule.target_port),
        }
    }

    pub fn to_api(&self) -> tfkit::Result<ForwardingRule> {
        Ok(ForwardingRule {
            entry_protocol: required(&self.entry_protocol, "forwarding_rules.entry_protocol")?,
            entry_port: required(&self.entry_port, "forwarding_rules.entry_port")?,
            target_protocol: required(&self.target_protocol, "forwarding_rules.target_protocol")?,
            target_port: required(&self.target_port, "forwarding_rules.target_port")?,
        })
    }
}

impl AttributeValue for ForwardingRuleModel {
    fn attribute_type() -> AttributeType {
        object_type(&forwarding_rule_attributes())
    }

    fn from_dynamic(raw: &Dynamic) -> tfkit::Result<Self> {
        let object = ObjectReader::checked(raw, &forwarding_rule_attributes())?;
        Ok(Self {
            entry_protocol: object.get("entry_protocol")?,
            entry_port: object.get("entry_port")?,
            target_protocol: object.get("target_protocol")?,
            target_port: object.get("target_port")?,
        })
    }

    fn into_dynamic(self) -> tfkit::Result<Dynamic> {
        let types = forwarding_rule_attributes();
        ObjectBuilder::new(&types)
            .set("entry_protocol", self.entry_protocol)?
            .set("entry_port", self.entry_port)?
            .set("target_protocol", self.target_protocol)?
            .set("target_port", self.target_port)?
            .build()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadBalancerModel {
    pub id: Value<i64>,
    pub name: Value<String>,
    pub load_balancer_type: Value<String>,
    pub location: Value<String>,
    pub algorithm: Value<String>,
    pub vpc_id: Value<i64>,
    pub ipv4_address: Value<String>,
    pub health_check: Value<HealthCheckModel>,
    pub forwarding_rules: Value<Vec<ForwardingRuleModel>>,
    pub target_server_ids: Value<Vec<i64>>,
}

impl LoadBalancerModel {
    pub fn from_state(state: &DynamicValue) -> tfkit::Result<Self> {
        Ok(Self {
            id: state.get_value(&AttributePath::new("id"))?,
            name: state.get_value(&AttributePath::new("name"))?,
            load_balancer_type: state.get_value(&AttributePath::new("load_balancer_type"))?,
            location: state.get_value(&AttributePath::new("location"))?,
            algorithm: state.get_value(&AttributePath::new("algorithm"))?,
            vpc_id: state.get_value(&AttributePath::new("vpc_id"))?,
            ipv4_address: state.get_value(&AttributePath::new("ipv4_address"))?,
            health_check: state.get_value(&AttributePath::new("health_check"))?,
            forwarding_rules: state.get_value(&AttributePath::new("forwarding_rules"))?,
            target_server_ids: state.get_value(&AttributePath::new("target_server_ids"))?,
        })
    }

    pub fn into_state(self) -> tfkit::Result<DynamicValue> {
        let mut state = DynamicValue::object();
        state.set_value(&AttributePath::new("id"), self.id)?;
        state.set_value(&AttributePath::new("name"), self.name)?;
        state.set_value(
            &AttributePath::new("load_balancer_type"),
            self.load_balancer_type,
        )?;
        state.set_value(&AttributePath::new("location"), self.location)?;
        state.set_value(&AttributePath::new("algorithm"), self.algorithm)?;
        state.set_value(&AttributePath::new("vpc_id"), self.vpc_id)?;
        state.set_value(&AttributePath::new("ipv4_address"), self.ipv4_address)?;
        state.set_value(&AttributePath::new("health_check"), self.health_check)?;
        state.set_value(
            &AttributePath::new("forwarding_rules"),
            self.forwarding_rules,
        )?;
        state.set_value(
            &AttributePath::new("target_server_ids"),
            self.target_server_ids,
        )?;
        Ok(state)
    }

    fn health_check_request(&self) -> tfkit::Result<Option<HealthCheck>> {
        self.health_check.as_known().map(HealthCheckModel::to_api).transpose()
    }

    fn forwarding_rules_request(&self) -> tfkit::Result<Vec<ForwardingRule>> {
        self.forwarding_rules
            .clone()
            .to_remote_list()
            .iter()
            .map(ForwardingRuleModel::to_api)
            .collect()
    }

    pub fn to_create_request(&self) -> tfkit::Result<CreateLoadBalancerRequest> {
        Ok(CreateLoadBalancerRequest {
            name: required(&self.name, "name")?,
            load_balancer_type: required(&self.load_balancer_type, "load_balancer_type")?,
            location: required(&self.location, "location")?,
            algorithm: self.algorithm.clone().into_option(),
            vpc_id: self.vpc_id.clone().into_option(),
            health_check: self.health_check_request()?,
            forwarding_rules: self.forwarding_rules_request()?,
            target_server_ids: self.target_server_ids.clone().to_remote_list(),
        })
    }

    /// Everything but type, location and VPC changes in place
    pub fn to_update_request(&self) -> tfkit::Result<UpdateLoadBalancerRequest> {
        Ok(UpdateLoadBalancerRequest {
            name: self.name.clone().into_option(),
            algorithm: self.algorithm.clone().into_option(),
            health_check: self.health_check_request()?,
            forwarding_rules: self.forwarding_rules_request()?,
            target_server_ids: self.target_server_ids.clone().to_remote_list(),
        })
    }

    pub fn apply_remote(&mut self, lb: &LoadBalancer) {
        // An imported state carries only the id, so take whatever the API has
        let importing = self.name.is_null();
        let planned_check = self.health_check.as_known().cloned();
        self.id = Value::Known(lb.id);
        self.name = Value::Known(lb.name.clone());
        self.load_balancer_type = Value::from_option(lb.load_balancer_type.clone());
        self.location = Value::from_option(lb.location.clone());
        self.algorithm = Value::from_option(lb.algorithm.clone());
        self.vpc_id = Value::from_option(lb.vpc_id);
        self.ipv4_address = Value::from_option(lb.ipv4_address.clone());
        if importing || !self.health_check.is_null() {
            self.health_check = Value::from_option(
                lb.health_check
                    .as_ref()
                    .map(|check| HealthCheckModel::from_api(check, planned_check.as_ref())),
            );
        }
        self.forwarding_rules = Value::from_remote_list(
            lb.forwarding_rules
                .as_ref()
                .map(|rules| rules.iter().map(ForwardingRuleModel::from_api).collect()),
        );
        self.target_server_ids = Value::from_remote_list(lb.target_server_ids.clone());
    }
}

pub struct LoadBalancerResource {
    client: Arc<Client>,
    poller: Poller,
}

impl LoadBalancerResource {
    pub fn new(client: Arc<Client>) -> Self {
        Self::with_poller_config(client, PollerConfig::default())
    }

    pub fn with_poller_config(client: Arc<Client>, config: PollerConfig) -> Self {
        Self {
            client,
            poller: Poller::new(config),
        }
    }
}

#[async_trait]
impl Resource for LoadBalancerResource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a CloudInfra load balancer")
            .attribute(
                AttributeBuilder::new("id", AttributeType::Number)
                    .description("Load balancer ID")
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Load balancer name")
                    .required()
                    .validator(StringLengthValidator {
                        min: Some(1),
                        max: Some(63),
                    })
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("load_balancer_type", AttributeType::String)
                    .description("Load balancer type (e.g., lb11)")
                    .required()
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("location", AttributeType::String)
                    .description("Location to create the load balancer in")
                    .required()
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("algorithm", AttributeType::String)
                    .description("Balancing algorithm")
                    .optional()
                    .computed()
                    .validator(OneOfValidator::new(&["round_robin", "least_connections"]))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("vpc_id", AttributeType::Number)
                    .description("VPC to attach the load balancer to")
                    .optional()
                    .plan_modifier(RequiresReplace)
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
                AttributeBuilder::new("health_check", HealthCheckModel::attribute_type())
                    .description("Health check run against targets")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "forwarding_rules",
                    Vec::<ForwardingRuleModel>::attribute_type(),
                )
                .description("Ports forwarded from the load balancer to its targets")
                .optional()
                .computed()
                .validator(ListLengthValidator {
                    min: None,
                    max: Some(5),
                })
                .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "target_server_ids",
                    AttributeType::List(Box::new(AttributeType::Number)),
                )
                .description("Servers receiving traffic")
                .optional()
                .computed()
                .build(),
            )
            .build()
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let mut diagnostics = vec![];

        let prepared = LoadBalancerModel::from_state(&request.planned_state)
            .map_err(|e| state_error("Invalid planned state", &e))
            .and_then(|model| match existing_id_conflict(&model.id, TYPE_NAME) {
                Some(diag) => Err(diag),
                None => Ok(model),
            })
            .and_then(|model| {
                model
                    .to_create_request()
                    .map(|req| (model, req))
                    .map_err(|e| state_error("Invalid load balancer configuration", &e))
            });
        let (mut model, create_request) = match prepared {
            Ok(prepared) => prepared,
            Err(diag) => {
                diagnostics.push(diag);
                return CreateResourceResponse {
                    new_state: DynamicValue::null(),
                    diagnostics,
                };
            }
        };

        tracing::info!("Creating load balancer {}", create_request.name);
        let created = match self
            .client
            .load_balancers()
            .create(&ctx, &create_request)
            .await
        {
            Ok(created) => created,
            Err(e) => {
                diagnostics.push(api_error("Failed to create load balancer", &e));
                return CreateResourceResponse {
                    new_state: DynamicValue::null(),
                    diagnostics,
                };
            }
        };

        let id = created.load_balancer.id;
        model.apply_remote(&created.load_balancer);

        if let Some(action) = created.action {
            if let Err(e) = self
                .poller
                .wait_for_action(&ctx, &self.client, action.id)
                .await
            {
                diagnostics.push(Diagnostic::error(
                    "Load balancer creation did not complete",
                    e.to_string(),
                ));
            } else {
                match self.client.load_balancers().get(&ctx, id).await {
                    Ok(lb) => model.apply_remote(&lb),
                    Err(e) => diagnostics.push(Diagnostic::warning(
                        "Failed to refresh load balancer after creation",
                        format!("API error: {}", e),
                    )),
                }
            }
        }

        match model.into_state() {
            Ok(new_state) => CreateResourceResponse {
                new_state,
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(state_error("Failed to build load balancer state", &e));
                CreateResourceResponse {
                    new_state: DynamicValue::null(),
                    diagnostics,
                }
            }
        }
    }

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let loaded = LoadBalancerModel::from_state(&request.current_state)
            .map_err(|e| state_error("Invalid load balancer state", &e))
            .and_then(|model| state_id(&model.id).map(|id| (model, id)));
        let (mut model, id) = match loaded {
            Ok(loaded) => loaded,
            Err(diag) => {
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics: vec![diag],
                }
            }
        };

        match self.client.load_balancers().get(&ctx, id).await {
            Ok(lb) => {
                model.apply_remote(&lb);
                match model.into_state() {
                    Ok(state) => ReadResourceResponse {
                        new_state: Some(state),
                        diagnostics: vec![],
                    },
                    Err(e) => ReadResourceResponse {
                        new_state: Some(request.current_state),
                        diagnostics: vec![state_error("Failed to build load balancer state", &e)],
                    },
                }
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!("Load balancer {} no longer exists, removing from state", id);
                ReadResourceResponse {
                    new_state: None,
                    diagnostics: vec![],
                }
            }
            Err(e) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![api_error("Failed to read load balancer", &e)],
            },
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let prepared = LoadBalancerModel::from_state(&request.prior_state)
            .and_then(|prior| {
                LoadBalancerModel::from_state(&request.planned_state).map(|p| (prior, p))
            })
            .map_err(|e| state_error("Invalid load balancer state", &e))
            .and_then(|(prior, planned)| {
                let id = state_id(&prior.id)?;
                let update_request = planned
                    .to_update_request()
                    .map_err(|e| state_error("Invalid load balancer configuration", &e))?;
                Ok((id, planned, update_request))
            });
        let (id, mut planned, update_request) = match prepared {
            Ok(prepared) => prepared,
            Err(diag) => {
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics: vec![diag],
                }
            }
        };

        match self
            .client
            .load_balancers()
            .update(&ctx, id, &update_request)
            .await
        {
            Ok(lb) => {
                planned.apply_remote(&lb);
                match planned.into_state() {
                    Ok(new_state) => UpdateResourceResponse {
                        new_state,
                        diagnostics: vec![],
                    },
                    Err(e) => UpdateResourceResponse {
                        new_state: request.prior_state,
                        diagnostics: vec![state_error("Failed to build load balancer state", &e)],
                    },
                }
            }
            Err(e) => UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics: vec![api_error("Failed to update load balancer", &e)],
            },
        }
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let id = LoadBalancerModel::from_state(&request.prior_state)
            .map_err(|e| state_error("Invalid load balancer state", &e))
            .and_then(|model| state_id(&model.id));

        let diagnostics = match id {
            Ok(id) => {
                tracing::info!("Deleting load balancer {}", id);
                match self.client.load_balancers().delete(&ctx, id).await {
                    Ok(()) => vec![],
                    Err(e) => vec![api_error("Failed to delete load balancer", &e)],
                }
            }
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
            move |page, per_page| async move {
                client.load_balancers().list(ctx, page, per_page).await
            },
            |lb: &LoadBalancer| lb.name.as_str(),
            |lb| lb.id,
        )
        .await;

        match resolved {
            Ok(Some(id)) => imported(
                TYPE_NAME,
                LoadBalancerModel {
                    id: Value::Known(id),
                    ..Default::default()
                }
                .into_state(),
            ),
            Ok(None) => import_failed(import_not_found("Load balancer", &request.id)),
            Err(e) => import_failed(api_error("Failed to look up load balancer", &e)),
        }
    }
}

#[cfg(test)]
#[path = "./load_balancer_test.rs"]
mod load_balancer_test;
