use crate::types::{AttributePath, Dynamic};

#[derive(Debug, Clone)]
pub struct PlanModifyRequest {
    pub path: AttributePath,
    pub config: Dynamic,
    pub state: Dynamic,
    pub plan: Dynamic,
}

#[derive(Debug, Clone)]
pub struct PlanModifyResponse {
    pub plan_value: Dynamic,
    pub requires_replace: bool,
}

/// Trait for modifying terraform plan behavior
///
/// Plan modifiers run after computed attributes have been marked unknown and
/// can:
/// - Modify the planned value
/// - Mark an attribute as requiring replacement
pub trait PlanModifier: Send + Sync {
    fn description(&self) -> String;

    fn modify_plan(&self, request: PlanModifyRequest) -> PlanModifyResponse;
}

/// Marks an attribute as requiring replacement when it changes
pub struct RequiresReplace;

impl PlanModifier for RequiresReplace {
    fn description(&self) -> String {
        "changing this value forces a new resource".to_string()
    }

    fn modify_plan(&self, request: PlanModifyRequest) -> PlanModifyResponse {
        // Unknown plans cannot be compared yet; Terraform re-plans once known.
        let requires_replace = !request.plan.is_unknown() && request.state != request.plan;

        PlanModifyResponse {
            plan_value: request.plan,
            requires_replace,
        }
    }
}

/// Copies the prior state value into the plan when the plan is unknown.
///
/// For computed attributes that never change after creation, such as ids.
pub struct UseStateForUnknown;

impl PlanModifier for UseStateForUnknown {
    fn description(&self) -> String {
        "value does not change after creation".to_string()
    }

    fn modify_plan(&self, request: PlanModifyRequest) -> PlanModifyResponse {
        let plan_value = match (&request.plan, &request.state) {
            (Dynamic::Unknown, state) if !state.is_null() => request.state.clone(),
            _ => request.plan,
        };

        PlanModifyResponse {
            plan_value,
            requires_replace: false,
        }
    }
}
