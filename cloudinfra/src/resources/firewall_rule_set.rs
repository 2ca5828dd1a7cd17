//! Firewall rule set resource implementation
//!
//! A server has exactly one rule set. The Terraform resource owns it as a
//! whole and is identified by the server id.

use super::{
    api_error, existing_id_conflict, import_failed, imported, parse_parent_id, required,
    state_error, state_id,
};
use crate::api::firewalls::{FirewallRule, SetFirewallRequest};
use crate::api::Client;
use async_trait::async_trait;
use std::sync::Arc;
use tfkit::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfkit::resource::{
    CreateResourceRequest, CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, UpdateResourceRequest, UpdateResourceResponse,
};
use tfkit::validator::ListLengthValidator;
use tfkit::value::{object_type, ObjectBuilder, ObjectReader};
use tfkit::{
    AttributeBuilder, AttributePath, AttributeType, AttributeValue, Context, Diagnostic, Dynamic,
    DynamicValue, Schema, SchemaBuilder, Value,
};

pub const TYPE_NAME: &str = "cloudinfra_firewall_rule_set";

const DIRECTIONS: &[&str] = &["in", "out"];
const PROTOCOLS: &[&str] = &["tcp", "udp", "icmp", "esp", "gre"];

fn rule_attributes() -> Vec<(&'static str, AttributeType)> {
    vec![
        ("direction", AttributeType::String),
        ("protocol", AttributeType::String),
        ("port", AttributeType::String),
        (
            "source_ips",
            AttributeType::List(Box::new(AttributeType::String)),
        ),
        (
            "destination_ips",
            AttributeType::List(Box::new(AttributeType::String)),
        ),
        ("description", AttributeType::String),
    ]
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FirewallRuleModel {
    pub direction: Value<String>,
    pub protocol: Value<String>,
    pub port: Value<String>,
    pub source_ips: Value<Vec<String>>,
    pub destination_ips: Value<Vec<String>>,
    pub description: Value<String>,
}

impl FirewallRuleModel {
    /// `planned` is the rule at the same position in the plan or prior
    /// state. Address lists it left null stay null when the API echoes
    /// them back empty.
    pub fn from_api(rule: &FirewallRule, planned: Option<&FirewallRuleModel>) -> Self {
        let ips = |remote: &Option<Vec<String>>, planned: Option<&Value<Vec<String>>>| {
            match planned {
                Some(planned) => Value::from_remote_list_for(remote.clone(), planned),
                None => Value::from_remote_list(remote.clone()),
            }
        };
        Self {
            direction: Value::Known(rule.direction.clone()),
            protocol: Value::Known(rule.protocol.clone()),
            port: Value::from_option(rule.port.clone()),
            source_ips: ips(&rule.source_ips, planned.map(|p| &p.source_ips)),
            destination_ips: ips(&rule.destination_ips, planned.map(|p| &p.destination_ips)),
            description: Value::from_option(rule.description.clone()),
        }
    }

    pub fn to_api(&self) -> tfkit::Result<FirewallRule> {
        let direction = required(&self.direction, "rules.direction")?;
        if !DIRECTIONS.contains(&direction.as_str()) {
            return Err(tfkit::TfkitError::InvalidConfiguration(format!(
                "rule direction must be one of {:?}, got '{}'",
                DIRECTIONS, direction
            )));
        }
        let protocol = required(&self.protocol, "rules.protocol")?;
        if !PROTOCOLS.contains(&protocol.as_str()) {
            return Err(tfkit::TfkitError::InvalidConfiguration(format!(
                "rule protocol must be one of {:?}, got '{}'",
                PROTOCOLS, protocol
            )));
        }

        Ok(FirewallRule {
            direction,
            protocol,
            port: self.port.clone().into_option(),
            source_ips: Some(self.source_ips.clone().to_remote_list()),
            destination_ips: Some(self.destination_ips.clone().to_remote_list()),
            description: self.description.clone().into_option(),
        })
    }
}

impl AttributeValue for FirewallRuleModel {
    fn attribute_type() -> AttributeType {
        object_type(&rule_attributes())
    }

    fn from_dynamic(raw: &Dynamic) -> tfkit::Result<Self> {
        let object = ObjectReader::checked(raw, &rule_attributes())?;
        Ok(Self {
            direction: object.get("direction")?,
            protocol: object.get("protocol")?,
            port: object.get("port")?,
            source_ips: object.get("source_ips")?,
            destination_ips: object.get("destination_ips")?,
            description: object.get("description")?,
        })
    }

    fn into_dynamic(self) -> tfkit::Result<Dynamic> {
        let types = rule_attributes();
        ObjectBuilder::new(&types)
            .set("direction", self.direction)?
            .set("protocol", self.protocol)?
            .set("port", self.port)?
            .set("source_ips", self.source_ips)?
            .set("destination_ips", self.destination_ips)?
            .set("description", self.description)?
            .build()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FirewallRuleSetModel {
    pub id: Value<i64>,
    pub server_id: Value<i64>,
    pub rules: Value<Vec<FirewallRuleModel>>,
}

impl FirewallRuleSetModel {
    pub fn from_state(state: &DynamicValue) -> tfkit::Result<Self> {
        Ok(Self {
            id: state.get_value(&AttributePath::new("id"))?,
            server_id: state.get_value(&AttributePath::new("server_id"))?,
            rules: state.get_value(&AttributePath::new("rules"))?,
        })
    }

    pub fn into_state(self) -> tfkit::Result<DynamicValue> {
        let mut state = DynamicValue::object();
        state.set_value(&AttributePath::new("id"), self.id)?;
        state.set_value(&AttributePath::new("server_id"), self.server_id)?;
        state.set_value(&AttributePath::new("rules"), self.rules)?;
        Ok(state)
    }

    /// Rule sets are replaced wholesale, so create and update send the same body
    pub fn to_set_request(&self) -> tfkit::Result<SetFirewallRequest> {
        let rules = self
            .rules
            .clone()
            .to_remote_list()
            .iter()
            .map(FirewallRuleModel::to_api)
            .collect::<tfkit::Result<Vec<_>>>()?;
        Ok(SetFirewallRequest { rules })
    }

    pub fn apply_remote(&mut self, server_id: i64, rules: Option<&[FirewallRule]>) {
        self.id = Value::Known(server_id);
        self.server_id = Value::Known(server_id);
        let planned = self.rules.as_known().cloned().unwrap_or_default();
        self.rules = Value::from_remote_list(rules.map(|rules| {
            rules
                .iter()
                .enumerate()
                .map(|(i, rule)| FirewallRuleModel::from_api(rule, planned.get(i)))
                .collect()
        }));
    }
}

pub struct FirewallRuleSetResource {
    client: Arc<Client>,
}

impl FirewallRuleSetResource {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }

    /// Refuses to take over a server that already has rules outside this state
    async fn check_unmanaged_rules(&self, ctx: &Context, server_id: i64) -> Result<(), Diagnostic> {
        match self.client.firewalls().get(ctx, server_id).await {
            Ok(existing) => match existing.rules {
                Some(rules) if !rules.is_empty() => Err(Diagnostic::error(
                    "Firewall rules already exist",
                    format!(
                        "Server {} already has {} firewall rules. Import them with \
                         `terraform import {}.<name> {}` instead of creating a new rule set.",
                        server_id,
                        rules.len(),
                        TYPE_NAME,
                        server_id
                    ),
                )),
                _ => Ok(()),
            },
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(api_error("Failed to read existing firewall rules", &e)),
        }
    }
}

#[async_trait]
impl Resource for FirewallRuleSetResource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages the complete firewall rule set of a server")
            .attribute(
                AttributeBuilder::new("id", AttributeType::Number)
                    .description("Same as server_id")
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("server_id", AttributeType::Number)
                    .description("Server the rules apply to")
                    .required()
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("rules", Vec::<FirewallRuleModel>::attribute_type())
                    .description("Ordered firewall rules; replaces any rules on the server")
                    .required()
                    .validator(ListLengthValidator {
                        min: None,
                        max: Some(50),
                    })
                    .build(),
            )
            .build()
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let mut diagnostics = vec![];

        let prepared = FirewallRuleSetModel::from_state(&request.planned_state)
            .map_err(|e| state_error("Invalid planned state", &e))
            .and_then(|model| match existing_id_conflict(&model.id, TYPE_NAME) {
                Some(diag) => Err(diag),
                None => Ok(model),
            })
            .and_then(|model| {
                let server_id = required(&model.server_id, "server_id")
                    .map_err(|e| state_error("Invalid firewall configuration", &e))?;
                let set_request = model
                    .to_set_request()
                    .map_err(|e| state_error("Invalid firewall configuration", &e))?;
                Ok((model, server_id, set_request))
            });
        let (mut model, server_id, set_request) = match prepared {
            Ok(prepared) => prepared,
            Err(diag) => {
                diagnostics.push(diag);
                return CreateResourceResponse {
                    new_state: DynamicValue::null(),
                    diagnostics,
                };
            }
        };

        if let Err(diag) = self.check_unmanaged_rules(&ctx, server_id).await {
            diagnostics.push(diag);
            return CreateResourceResponse {
                new_state: DynamicValue::null(),
                diagnostics,
            };
        }

        tracing::info!(
            "Setting {} firewall rules on server {}",
            set_request.rules.len(),
            server_id
        );
        match self.client.firewalls().set(&ctx, server_id, &set_request).await {
            Ok(firewall) => model.apply_remote(server_id, firewall.rules.as_deref()),
            Err(e) => {
                diagnostics.push(api_error("Failed to create firewall rules", &e));
                return CreateResourceResponse {
                    new_state: DynamicValue::null(),
                    diagnostics,
                };
            }
        }

        let new_state = model.into_state().unwrap_or_else(|e| {
            diagnostics.push(state_error("Failed to build firewall state", &e));
            DynamicValue::null()
        });
        CreateResourceResponse {
            new_state,
            diagnostics,
        }
    }

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let loaded = FirewallRuleSetModel::from_state(&request.current_state)
            .map_err(|e| state_error("Invalid firewall state", &e))
            .and_then(|model| state_id(&model.id).map(|id| (model, id)));
        let (mut model, server_id) = match loaded {
            Ok(loaded) => loaded,
            Err(diag) => {
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics: vec![diag],
                }
            }
        };

        match self.client.firewalls().get(&ctx, server_id).await {
            Ok(firewall) => {
                model.apply_remote(server_id, firewall.rules.as_deref());
                match model.into_state() {
                    Ok(state) => ReadResourceResponse {
                        new_state: Some(state),
                        diagnostics: vec![],
                    },
                    Err(e) => ReadResourceResponse {
                        new_state: Some(request.current_state),
                        diagnostics: vec![state_error("Failed to build firewall state", &e)],
                    },
                }
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!(
                    "Firewall of server {} no longer exists, removing from state",
                    server_id
                );
                ReadResourceResponse {
                    new_state: None,
                    diagnostics: vec![],
                }
            }
            Err(e) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![api_error("Failed to read firewall rules", &e)],
            },
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let prepared = FirewallRuleSetModel::from_state(&request.prior_state)
            .and_then(|prior| {
                FirewallRuleSetModel::from_state(&request.planned_state).map(|p| (prior, p))
            })
            .map_err(|e| state_error("Invalid firewall state", &e))
            .and_then(|(prior, planned)| {
                let server_id = state_id(&prior.id)?;
                let set_request = planned
                    .to_set_request()
                    .map_err(|e| state_error("Invalid firewall configuration", &e))?;
                Ok((server_id, planned, set_request))
            });
        let (server_id, mut planned, set_request) = match prepared {
            Ok(prepared) => prepared,
            Err(diag) => {
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics: vec![diag],
                }
            }
        };

        match self.client.firewalls().set(&ctx, server_id, &set_request).await {
            Ok(firewall) => {
                planned.apply_remote(server_id, firewall.rules.as_deref());
                match planned.into_state() {
                    Ok(new_state) => UpdateResourceResponse {
                        new_state,
                        diagnostics: vec![],
                    },
                    Err(e) => UpdateResourceResponse {
                        new_state: request.prior_state,
                        diagnostics: vec![state_error("Failed to build firewall state", &e)],
                    },
                }
            }
            Err(e) => UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics: vec![api_error("Failed to update firewall rules", &e)],
            },
        }
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let server_id = FirewallRuleSetModel::from_state(&request.prior_state)
            .map_err(|e| state_error("Invalid firewall state", &e))
            .and_then(|model| state_id(&model.id));

        let diagnostics = match server_id {
            Ok(server_id) => match self.client.firewalls().delete(&ctx, server_id).await {
                Ok(()) => vec![],
                Err(e) => vec![api_error("Failed to delete firewall rules", &e)],
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
        match parse_parent_id(&request.id, "server") {
            Ok(server_id) => imported(
                TYPE_NAME,
                FirewallRuleSetModel {
                    id: Value::Known(server_id),
                    server_id: Value::Known(server_id),
                    rules: Value::Null,
                }
                .into_state(),
            ),
            Err(diag) => import_failed(diag),
        }
    }
}
