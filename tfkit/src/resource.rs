//! Resource trait and related types
//!
//! A resource adapts one remote object type to Terraform's lifecycle:
//! validate, plan, create, read, update, delete and import. Each operation
//! takes a [`Context`] and returns its diagnostics in the response rather
//! than failing, mirroring how Terraform reports partial success.

use crate::context::Context;
use crate::schema::Schema;
use crate::types::{AttributePath, Diagnostic, DynamicValue};
use async_trait::async_trait;

/// Base trait for resources - implement CRUD operations
/// Type name should be constant and match the provider's resource list
#[async_trait]
pub trait Resource: Send + Sync {
    /// Type name should be constant (e.g., "cloudinfra_server")
    fn type_name(&self) -> &str;

    fn schema(&self) -> Schema;

    /// Called during plan to validate configuration. The default checks the
    /// configuration against the schema.
    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse {
            diagnostics: self.schema().validate(&request.config),
        }
    }

    /// Called to compute the planned state. The default marks computed
    /// attributes unknown and applies the schema's plan modifiers.
    async fn plan(
        &self,
        _ctx: Context,
        request: PlanResourceChangeRequest,
    ) -> PlanResourceChangeResponse {
        let change =
            self.schema()
                .plan(&request.config, &request.prior_state, &request.proposed_new_state);
        PlanResourceChangeResponse {
            planned_state: change.planned_state,
            requires_replace: change.requires_replace,
            diagnostics: vec![],
        }
    }

    /// Called to create a new resource
    /// MUST populate all attributes in response.new_state (including computed)
    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse;

    /// Called to read current state - used for refresh and after import
    /// Returns None if the resource no longer exists
    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse;

    /// Called to update an existing resource in place
    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse;

    /// Called to delete a resource
    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse;

    /// Called during "terraform import". The returned state only needs the
    /// attributes `read` requires; Terraform reads the rest afterwards.
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![Diagnostic::error(
                "Resource import not supported",
                format!("{} does not support import", request.type_name),
            )],
        }
    }
}

// Request/Response types for Resource trait

pub struct ValidateResourceConfigRequest {
    pub type_name: String,
    pub config: DynamicValue,
}

pub struct ValidateResourceConfigResponse {
    pub diagnostics: Vec<Diagnostic>,
}

pub struct PlanResourceChangeRequest {
    pub type_name: String,
    pub config: DynamicValue,
    pub prior_state: DynamicValue,
    pub proposed_new_state: DynamicValue,
}

pub struct PlanResourceChangeResponse {
    pub planned_state: DynamicValue,
    pub requires_replace: Vec<AttributePath>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct CreateResourceRequest {
    pub type_name: String,
    pub planned_state: DynamicValue,
    pub config: DynamicValue,
}

pub struct CreateResourceResponse {
    pub new_state: DynamicValue,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ReadResourceRequest {
    pub type_name: String,
    pub current_state: DynamicValue,
}

pub struct ReadResourceResponse {
    /// None removes the resource from state
    pub new_state: Option<DynamicValue>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct UpdateResourceRequest {
    pub type_name: String,
    pub prior_state: DynamicValue,
    pub planned_state: DynamicValue,
    pub config: DynamicValue,
}

pub struct UpdateResourceResponse {
    pub new_state: DynamicValue,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct DeleteResourceRequest {
    pub type_name: String,
    pub prior_state: DynamicValue,
}

pub struct DeleteResourceResponse {
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ImportResourceStateRequest {
    pub type_name: String,
    pub id: String,
}

pub struct ImportResourceStateResponse {
    pub imported_resources: Vec<ImportedResource>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ImportedResource {
    pub type_name: String,
    pub state: DynamicValue,
}
