//! Schema types and builders for tfkit
//!
//! A resource schema declares its attributes, their types and flags, and the
//! validators and plan modifiers attached to them. The schema also drives
//! config validation and plan computation for resources that do not need
//! custom planning.

use crate::plan_modifier::{PlanModifier, PlanModifyRequest};
use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use crate::validator::Validator;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// AttributeType defines the type system for Terraform attributes
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Number, // Always f64
    Bool,
    List(Box<AttributeType>),
    Set(Box<AttributeType>),
    Map(Box<AttributeType>),
    Object(BTreeMap<String, AttributeType>),
}

impl AttributeType {
    /// Structural check of a value against this type. Null and unknown
    /// conform to every type.
    pub fn conforms(&self, value: &Dynamic) -> bool {
        match (self, value) {
            (_, Dynamic::Null) | (_, Dynamic::Unknown) => true,
            (AttributeType::String, Dynamic::String(_)) => true,
            (AttributeType::Number, Dynamic::Number(_)) => true,
            (AttributeType::Bool, Dynamic::Bool(_)) => true,
            (AttributeType::List(elem), Dynamic::List(items))
            | (AttributeType::Set(elem), Dynamic::List(items)) => {
                items.iter().all(|item| elem.conforms(item))
            }
            (AttributeType::Map(elem), Dynamic::Map(entries)) => {
                entries.values().all(|v| elem.conforms(v))
            }
            (AttributeType::Object(fields), Dynamic::Map(entries)) => {
                entries.keys().all(|k| fields.contains_key(k))
                    && fields
                        .iter()
                        .all(|(name, t)| entries.get(name).map_or(true, |v| t.conforms(v)))
            }
            _ => false,
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeType::String => write!(f, "string"),
            AttributeType::Number => write!(f, "number"),
            AttributeType::Bool => write!(f, "bool"),
            AttributeType::List(elem) => write!(f, "list({})", elem),
            AttributeType::Set(elem) => write!(f, "set({})", elem),
            AttributeType::Map(elem) => write!(f, "map({})", elem),
            AttributeType::Object(fields) => {
                write!(f, "object({{")?;
                for (i, (name, t)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}={}", name, t)?;
                }
                write!(f, "}})")
            }
        }
    }
}

/// Schema is returned by providers and resources
/// Version is used for state migration
#[derive(Debug, Clone)]
pub struct Schema {
    pub version: i64,
    pub description: String,
    pub attributes: Vec<Attribute>,
}

/// Attribute represents a single configuration attribute
#[derive(Clone)]
pub struct Attribute {
    pub name: String,
    pub r#type: AttributeType,
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    pub validators: Vec<Arc<dyn Validator>>,
    pub plan_modifiers: Vec<Arc<dyn PlanModifier>>,
}

// Manual Debug implementation since validators/modifiers don't implement Debug
impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("type", &self.r#type)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("sensitive", &self.sensitive)
            .field(
                "validators",
                &format!("{} validators", self.validators.len()),
            )
            .field(
                "plan_modifiers",
                &format!("{} plan modifiers", self.plan_modifiers.len()),
            )
            .finish()
    }
}

/// Outcome of planning a resource change
#[derive(Debug, Clone)]
pub struct PlannedChange {
    pub planned_state: DynamicValue,
    pub requires_replace: Vec<AttributePath>,
}

impl Schema {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Checks a configuration against the schema. Unknown values are
    /// skipped; Terraform validates again once they are known.
    pub fn validate(&self, config: &DynamicValue) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        if let Some(entries) = config.value.as_map() {
            for name in entries.keys() {
                if self.attribute(name).is_none() {
                    diagnostics.push(
                        Diagnostic::error(
                            "Unsupported argument",
                            format!("An argument named \"{}\" is not expected here", name),
                        )
                        .with_attribute(AttributePath::new(name)),
                    );
                }
            }
        }

        for attr in &self.attributes {
            let path = AttributePath::new(&attr.name);
            let value = config.get(&path).unwrap_or(&Dynamic::Null);

            if value.is_null() {
                if attr.required {
                    diagnostics.push(
                        Diagnostic::error(
                            "Missing required argument",
                            format!("The argument \"{}\" is required", attr.name),
                        )
                        .with_attribute(path),
                    );
                }
                continue;
            }

            if !attr.required && !attr.optional {
                diagnostics.push(
                    Diagnostic::error(
                        "Value for unconfigurable attribute",
                        format!("\"{}\" is computed and cannot be set", attr.name),
                    )
                    .with_attribute(path),
                );
                continue;
            }

            if !attr.r#type.conforms(value) {
                diagnostics.push(
                    Diagnostic::error(
                        "Incorrect attribute value type",
                        format!("\"{}\" must be {}, got {}", attr.name, attr.r#type, value.type_name()),
                    )
                    .with_attribute(path),
                );
                continue;
            }

            if value.is_unknown() {
                continue;
            }

            for validator in &attr.validators {
                validator.validate(value, &path, &mut diagnostics);
            }
        }

        diagnostics
    }

    /// Computes the planned state from the prior state and the proposed new
    /// state Terraform derived from config.
    ///
    /// Computed attributes not set in config become unknown whenever the
    /// resource is being created or changed, then plan modifiers run. A null
    /// prior state (create) never requires replacement; a null proposed
    /// state (destroy) is returned as is.
    pub fn plan(
        &self,
        config: &DynamicValue,
        prior: &DynamicValue,
        proposed: &DynamicValue,
    ) -> PlannedChange {
        if proposed.is_null() {
            return PlannedChange {
                planned_state: proposed.clone(),
                requires_replace: Vec::new(),
            };
        }

        let creating = prior.is_null();
        let changing = creating || self.differs(prior, proposed);
        let mut planned = BTreeMap::new();
        let mut requires_replace = Vec::new();

        for attr in &self.attributes {
            let path = AttributePath::new(&attr.name);
            let config_value = config.get(&path).cloned().unwrap_or(Dynamic::Null);
            let state_value = prior.get(&path).cloned().unwrap_or(Dynamic::Null);
            let mut plan_value = proposed.get(&path).cloned().unwrap_or(Dynamic::Null);

            if attr.computed && config_value.is_null() && changing {
                plan_value = Dynamic::Unknown;
            }

            for modifier in &attr.plan_modifiers {
                let response = modifier.modify_plan(PlanModifyRequest {
                    path: path.clone(),
                    config: config_value.clone(),
                    state: state_value.clone(),
                    plan: plan_value,
                });
                plan_value = response.plan_value;
                if response.requires_replace && !creating && !requires_replace.contains(&path) {
                    tracing::debug!("Change to {} requires replacement", path);
                    requires_replace.push(path.clone());
                }
            }

            planned.insert(attr.name.clone(), plan_value);
        }

        PlannedChange {
            planned_state: DynamicValue::new(Dynamic::Map(planned)),
            requires_replace,
        }
    }

    /// Compares only the attributes the user can set
    fn differs(&self, prior: &DynamicValue, proposed: &DynamicValue) -> bool {
        self.attributes
            .iter()
            .filter(|a| a.required || a.optional)
            .any(|a| {
                let path = AttributePath::new(&a.name);
                prior.get(&path).unwrap_or(&Dynamic::Null)
                    != proposed.get(&path).unwrap_or(&Dynamic::Null)
            })
    }
}

/// AttributeBuilder provides fluent API for building attributes
pub struct AttributeBuilder {
    attribute: Attribute,
}

impl AttributeBuilder {
    pub fn new(name: &str, type_: AttributeType) -> Self {
        Self {
            attribute: Attribute {
                name: name.to_string(),
                r#type: type_,
                description: String::new(),
                required: false,
                optional: false,
                computed: false,
                sensitive: false,
                validators: Vec::new(),
                plan_modifiers: Vec::new(),
            },
        }
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.attribute.description = desc.to_string();
        self
    }

    pub fn required(mut self) -> Self {
        self.attribute.required = true;
        self.attribute.optional = false;
        self
    }

    pub fn optional(mut self) -> Self {
        self.attribute.optional = true;
        self.attribute.required = false;
        self
    }

    pub fn computed(mut self) -> Self {
        self.attribute.computed = true;
        self
    }

    /// Mark as sensitive (hidden)
    pub fn sensitive(mut self) -> Self {
        self.attribute.sensitive = true;
        self
    }

    pub fn validator(mut self, validator: impl Validator + 'static) -> Self {
        self.attribute.validators.push(Arc::new(validator));
        self
    }

    pub fn plan_modifier(mut self, modifier: impl PlanModifier + 'static) -> Self {
        self.attribute.plan_modifiers.push(Arc::new(modifier));
        self
    }

    pub fn build(self) -> Attribute {
        self.attribute
    }
}

/// SchemaBuilder provides fluent API for building schemas
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            schema: Schema {
                version: 0,
                description: String::new(),
                attributes: Vec::new(),
            },
        }
    }

    pub fn version(mut self, version: i64) -> Self {
        self.schema.version = version;
        self
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.schema.description = desc.to_string();
        self
    }

    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.schema.attributes.push(attr);
        self
    }

    pub fn build(self) -> Schema {
        self.schema
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}
