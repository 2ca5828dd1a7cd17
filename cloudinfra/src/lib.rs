//! Terraform provider for the CloudInfra API

pub mod api;
pub mod pagination;
pub mod poller;
pub mod provider_data;
pub mod resources;

use async_trait::async_trait;
use provider_data::CloudInfraProviderData;
use tfkit::provider::{ConfigureProviderRequest, ConfigureProviderResponse};
use tfkit::{
    AttributeBuilder, AttributePath, AttributeType, Context, Diagnostic, DynamicValue, Provider,
    Resource, Schema, SchemaBuilder, TfkitError,
};

pub const TOKEN_ENV: &str = "CLOUDINFRA_TOKEN";
pub const ENDPOINT_ENV: &str = "CLOUDINFRA_ENDPOINT";
pub const INSECURE_ENV: &str = "CLOUDINFRA_INSECURE";

#[derive(Default)]
pub struct CloudInfraProvider {
    data: Option<CloudInfraProviderData>,
}

impl CloudInfraProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn config_string(config: &DynamicValue, name: &str) -> Result<Option<String>, Diagnostic> {
        config
            .get_value::<String>(&AttributePath::new(name))
            .map(|v| v.into_option())
            .map_err(|e| Diagnostic::error("Invalid provider configuration", e.to_string()))
    }

    fn config_bool(config: &DynamicValue, name: &str) -> Result<Option<bool>, Diagnostic> {
        config
            .get_value::<bool>(&AttributePath::new(name))
            .map(|v| v.into_option())
            .map_err(|e| Diagnostic::error("Invalid provider configuration", e.to_string()))
    }

    fn resolve(config: &DynamicValue) -> Result<CloudInfraProviderData, Diagnostic> {
        let token = Self::config_string(config, "token")?
            .or_else(|| std::env::var(TOKEN_ENV).ok())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                Diagnostic::error(
                    "Missing API token",
                    format!(
                        "token is required (set in provider config or {} env var)",
                        TOKEN_ENV
                    ),
                )
            })?;

        let endpoint = Self::config_string(config, "endpoint")?
            .or_else(|| std::env::var(ENDPOINT_ENV).ok())
            .unwrap_or_else(|| api::DEFAULT_ENDPOINT.to_string());

        let insecure = Self::config_bool(config, "insecure")?
            .or_else(|| {
                std::env::var(INSECURE_ENV)
                    .ok()
                    .and_then(|v| v.parse::<bool>().ok())
            })
            .unwrap_or(false);

        if insecure {
            tracing::warn!("TLS certificate verification is disabled for {}", endpoint);
        }

        api::Client::new(&endpoint, &token, insecure)
            .map(CloudInfraProviderData::new)
            .map_err(|e| {
                Diagnostic::error("Failed to create API client", format!("API error: {}", e))
            })
    }
}

#[async_trait]
impl Provider for CloudInfraProvider {
    fn type_name(&self) -> &str {
        "cloudinfra"
    }

    fn schema(&self) -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("CloudInfra provider")
            .attribute(
                AttributeBuilder::new("token", AttributeType::String)
                    .description(&format!("API token. Falls back to {}", TOKEN_ENV))
                    .optional()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("endpoint", AttributeType::String)
                    .description(&format!(
                        "API endpoint. Falls back to {}, then {}",
                        ENDPOINT_ENV,
                        api::DEFAULT_ENDPOINT
                    ))
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("insecure", AttributeType::Bool)
                    .description("Skip TLS certificate verification")
                    .optional()
                    .build(),
            )
            .build()
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        tracing::debug!(
            "Configuring provider for Terraform {}",
            request.terraform_version
        );
        match Self::resolve(&request.config) {
            Ok(data) => {
                tracing::info!("Provider configured for {}", data.client.base_url());
                self.data = Some(data);
                ConfigureProviderResponse {
                    diagnostics: vec![],
                }
            }
            Err(diag) => ConfigureProviderResponse {
                diagnostics: vec![diag],
            },
        }
    }

    fn resource_types(&self) -> Vec<String> {
        [
            resources::server::TYPE_NAME,
            resources::load_balancer::TYPE_NAME,
            resources::vpc::TYPE_NAME,
            resources::ssh_key::TYPE_NAME,
            resources::firewall_rule_set::TYPE_NAME,
            resources::vpc_route_entry_set::TYPE_NAME,
        ]
        .iter()
        .map(|name| name.to_string())
        .collect()
    }

    fn create_resource(&self, type_name: &str) -> tfkit::Result<Box<dyn Resource>> {
        let client = self
            .data
            .as_ref()
            .ok_or(TfkitError::ProviderNotConfigured)?
            .client
            .clone();

        match type_name {
            resources::server::TYPE_NAME => Ok(Box::new(resources::ServerResource::new(client))),
            resources::load_balancer::TYPE_NAME => {
                Ok(Box::new(resources::LoadBalancerResource::new(client)))
            }
            resources::vpc::TYPE_NAME => Ok(Box::new(resources::VpcResource::new(client))),
            resources::ssh_key::TYPE_NAME => Ok(Box::new(resources::SshKeyResource::new(client))),
            resources::firewall_rule_set::TYPE_NAME => {
                Ok(Box::new(resources::FirewallRuleSetResource::new(client)))
            }
            resources::vpc_route_entry_set::TYPE_NAME => {
                Ok(Box::new(resources::VpcRouteEntrySetResource::new(client)))
            }
            _ => Err(TfkitError::ResourceNotFound(type_name.to_string())),
        }
    }
}
