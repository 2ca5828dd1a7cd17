//! Attribute validators run against known configuration values

use crate::types::{AttributePath, Diagnostic, Dynamic};
use regex::Regex;

pub trait Validator: Send + Sync {
    fn description(&self) -> String;

    /// Only called for known values; null and unknown are skipped by the schema
    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>);
}

pub struct StringLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl Validator for StringLengthValidator {
    fn description(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("length between {} and {}", min, max),
            (Some(min), None) => format!("length of at least {}", min),
            (None, Some(max)) => format!("length of at most {}", max),
            (None, None) => "any length".to_string(),
        }
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        let Some(s) = value.as_str() else { return };
        let len = s.chars().count();
        let too_short = self.min.is_some_and(|min| len < min);
        let too_long = self.max.is_some_and(|max| len > max);
        if too_short || too_long {
            diagnostics.push(
                Diagnostic::error(
                    format!("Invalid length for {}", path),
                    format!("Expected {}, got length {}", self.description(), len),
                )
                .with_attribute(path.clone()),
            );
        }
    }
}

pub struct StringPatternValidator {
    pub pattern: Regex,
    pub description: String,
}

impl StringPatternValidator {
    pub fn new(pattern: Regex, description: impl Into<String>) -> Self {
        Self {
            pattern,
            description: description.into(),
        }
    }
}

impl Validator for StringPatternValidator {
    fn description(&self) -> String {
        self.description.clone()
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Some(s) = value.as_str() {
            if !self.pattern.is_match(s) {
                diagnostics.push(
                    Diagnostic::error(
                        format!("{} must be {}", path, self.description),
                        format!("Value '{}' does not match", s),
                    )
                    .with_attribute(path.clone()),
                );
            }
        }
    }
}

pub struct OneOfValidator {
    pub allowed: Vec<String>,
}

impl OneOfValidator {
    pub fn new(allowed: &[&str]) -> Self {
        Self {
            allowed: allowed.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Validator for OneOfValidator {
    fn description(&self) -> String {
        format!("one of {}", self.allowed.join(", "))
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Some(s) = value.as_str() {
            if !self.allowed.iter().any(|a| a == s) {
                diagnostics.push(
                    Diagnostic::error(
                        format!("Invalid value for {}", path),
                        format!("Expected {}, got '{}'", self.description(), s),
                    )
                    .with_attribute(path.clone()),
                );
            }
        }
    }
}

pub struct IntRangeValidator {
    pub min: Option<i64>,
    pub max: Option<i64>,
}

impl Validator for IntRangeValidator {
    fn description(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("between {} and {}", min, max),
            (Some(min), None) => format!("at least {}", min),
            (None, Some(max)) => format!("at most {}", max),
            (None, None) => "any integer".to_string(),
        }
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        let Some(n) = value.as_number() else { return };
        let below = self.min.is_some_and(|min| n < min as f64);
        let above = self.max.is_some_and(|max| n > max as f64);
        if below || above {
            diagnostics.push(
                Diagnostic::error(
                    format!("{} out of range", path),
                    format!("Expected {}, got {}", self.description(), n),
                )
                .with_attribute(path.clone()),
            );
        }
    }
}

pub struct ListLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl Validator for ListLengthValidator {
    fn description(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("between {} and {} items", min, max),
            (Some(min), None) => format!("at least {} items", min),
            (None, Some(max)) => format!("at most {} items", max),
            (None, None) => "any number of items".to_string(),
        }
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        let Some(items) = value.as_list() else { return };
        let below = self.min.is_some_and(|min| items.len() < min);
        let above = self.max.is_some_and(|max| items.len() > max);
        if below || above {
            diagnostics.push(
                Diagnostic::error(
                    format!("Invalid number of items in {}", path),
                    format!("Expected {}, got {}", self.description(), items.len()),
                )
                .with_attribute(path.clone()),
            );
        }
    }
}
