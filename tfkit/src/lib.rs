//! tfkit - building blocks for Terraform providers in Rust
//!
//! Typed tri-state values, dynamic config/state containers, schemas with
//! validation and planning, cancellation contexts and the provider and
//! resource traits. The host transport is left to the embedding binary.

// Core modules
pub mod context;
pub mod error;
pub mod schema;
pub mod types;
pub mod value;

// Provider API modules
pub mod provider;
pub mod resource;

// Helper modules
pub mod logging;
pub mod plan_modifier;
pub mod validator;

// Re-exports for convenience
pub use context::Context;
pub use error::{Result, TfkitError};
pub use logging::LogLevel;
pub use provider::Provider;
pub use resource::Resource;
pub use schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
pub use types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
pub use value::{AttributeValue, TrimmedString, Value};
