//! Provider trait and related types

use crate::context::Context;
use crate::error::Result;
use crate::resource::Resource;
use crate::schema::Schema;
use crate::types::{Diagnostic, DynamicValue};
use async_trait::async_trait;

/// Provider is the entry point Terraform talks to. It is configured once,
/// then acts as the factory for its resources.
///
/// Configuration results (API clients and the like) are handed to each
/// resource when it is constructed; resources never reach for global state.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Type name prefix shared by all resources (e.g., "cloudinfra")
    fn type_name(&self) -> &str;

    fn schema(&self) -> Schema;

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse {
        ValidateProviderConfigResponse {
            diagnostics: self.schema().validate(&request.config),
        }
    }

    /// Called once before any resource operation
    async fn configure(
        &mut self,
        ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse;

    /// Resource type names this provider serves
    fn resource_types(&self) -> Vec<String>;

    /// Builds a resource for `type_name`. Fails if the provider has not been
    /// configured or the type is unknown.
    fn create_resource(&self, type_name: &str) -> Result<Box<dyn Resource>>;
}

pub struct ValidateProviderConfigRequest {
    pub config: DynamicValue,
}

pub struct ValidateProviderConfigResponse {
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ConfigureProviderRequest {
    pub terraform_version: String,
    pub config: DynamicValue,
}

pub struct ConfigureProviderResponse {
    pub diagnostics: Vec<Diagnostic>,
}
