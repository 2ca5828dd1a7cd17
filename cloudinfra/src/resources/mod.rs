//! Resource adapters
//!
//! Each resource pairs a typed model (one [`Value`] per schema attribute)
//! with projections to and from the API types, and implements the CRUD
//! lifecycle on top of them.

pub mod firewall_rule_set;
pub mod load_balancer;
pub mod server;
pub mod ssh_key;
pub mod vpc;
pub mod vpc_route_entry_set;

pub use firewall_rule_set::FirewallRuleSetResource;
pub use load_balancer::LoadBalancerResource;
pub use server::ServerResource;
pub use ssh_key::SshKeyResource;
pub use vpc::VpcResource;
pub use vpc_route_entry_set::VpcRouteEntrySetResource;

use crate::api::ApiError;
use tfkit::resource::{ImportResourceStateResponse, ImportedResource};
use tfkit::{Diagnostic, DynamicValue, TfkitError, Value};

pub(crate) fn api_error(summary: &str, err: &ApiError) -> Diagnostic {
    Diagnostic::error(summary, format!("API error: {}", err))
}

pub(crate) fn state_error(summary: &str, err: &TfkitError) -> Diagnostic {
    Diagnostic::error(summary, err.to_string())
}

/// Value of an attribute the API requires, which must be known by apply
pub(crate) fn required<T: Clone>(value: &Value<T>, name: &str) -> tfkit::Result<T> {
    value.as_known().cloned().ok_or_else(|| {
        TfkitError::InvalidConfiguration(format!("'{}' must be known at apply time", name))
    })
}

/// The id of a resource already in state
pub(crate) fn state_id(id: &Value<i64>) -> Result<i64, Diagnostic> {
    id.as_known().copied().ok_or_else(|| {
        Diagnostic::error("Missing resource id", "The 'id' attribute is not set in state")
    })
}

/// Create starts from a plan without an id. A known id means the object
/// already exists and belongs to some other state.
pub(crate) fn existing_id_conflict(id: &Value<i64>, type_name: &str) -> Option<Diagnostic> {
    id.as_known().map(|id| {
        Diagnostic::error(
            "Resource already exists",
            format!(
                "{} was planned for creation with existing id {}; import it instead",
                type_name, id
            ),
        )
    })
}

/// Rule sets are keyed by their parent object, so they import by numeric id
pub(crate) fn parse_parent_id(identifier: &str, parent: &str) -> Result<i64, Diagnostic> {
    identifier.trim().parse::<i64>().map_err(|_| {
        Diagnostic::error(
            "Invalid import ID",
            format!("Import ID must be the numeric {} id, got '{}'", parent, identifier),
        )
    })
}

pub(crate) fn import_failed(diagnostic: Diagnostic) -> ImportResourceStateResponse {
    ImportResourceStateResponse {
        imported_resources: vec![],
        diagnostics: vec![diagnostic],
    }
}

pub(crate) fn imported(
    type_name: &str,
    state: tfkit::Result<DynamicValue>,
) -> ImportResourceStateResponse {
    match state {
        Ok(state) => ImportResourceStateResponse {
            imported_resources: vec![ImportedResource {
                type_name: type_name.to_string(),
                state,
            }],
            diagnostics: vec![],
        },
        Err(e) => import_failed(state_error("Failed to build imported state", &e)),
    }
}

pub(crate) fn import_not_found(kind: &str, identifier: &str) -> Diagnostic {
    Diagnostic::error(
        format!("{} not found", kind),
        format!("Nothing matched '{}' by id or name", identifier),
    )
}
