//! Dynamic values exchanged with Terraform
//!
//! `Dynamic` is the untyped tree Terraform sends and receives for config,
//! plan and state. `DynamicValue` wraps a root value and provides path based
//! access plus the msgpack/JSON wire codecs. Typed access goes through
//! [`crate::value::Value`].

use crate::error::{Result, TfkitError};
use crate::value::{AttributeValue, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Marker used on the wire for values Terraform has not determined yet.
const UNKNOWN_SENTINEL: &str = "__unknown__";

/// Dynamic represents any Terraform value
#[derive(Debug, Clone, PartialEq)]
pub enum Dynamic {
    Null,
    Bool(bool),
    /// All numbers are f64 to match Terraform's number type
    Number(f64),
    String(String),
    List(Vec<Dynamic>),
    /// Objects and maps share this representation
    Map(BTreeMap<String, Dynamic>),
    /// Not yet known; filled in by the remote system during apply
    Unknown,
}

impl Dynamic {
    pub fn is_null(&self) -> bool {
        matches!(self, Dynamic::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Dynamic::Unknown)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Dynamic::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Dynamic::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Dynamic::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Dynamic]> {
        match self {
            Dynamic::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Dynamic>> {
        match self {
            Dynamic::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Dynamic::Null => "null",
            Dynamic::Bool(_) => "bool",
            Dynamic::Number(_) => "number",
            Dynamic::String(_) => "string",
            Dynamic::List(_) => "list",
            Dynamic::Map(_) => "map",
            Dynamic::Unknown => "unknown",
        }
    }
}

impl Serialize for Dynamic {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Dynamic::Null => serializer.serialize_unit(),
            Dynamic::Bool(b) => serializer.serialize_bool(*b),
            Dynamic::Number(n) => {
                if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                    serializer.serialize_i64(*n as i64)
                } else {
                    serializer.serialize_f64(*n)
                }
            }
            Dynamic::String(s) => serializer.serialize_str(s),
            Dynamic::List(l) => l.serialize(serializer),
            Dynamic::Map(m) => m.serialize(serializer),
            Dynamic::Unknown => serializer.serialize_str(UNKNOWN_SENTINEL),
        }
    }
}

impl<'de> Deserialize<'de> for Dynamic {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct DynamicVisitor;

        impl<'de> Visitor<'de> for DynamicVisitor {
            type Value = Dynamic;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a terraform value")
            }

            fn visit_unit<E: de::Error>(self) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Null)
            }

            fn visit_none<E: de::Error>(self) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Null)
            }

            fn visit_some<D2>(self, deserializer: D2) -> std::result::Result<Dynamic, D2::Error>
            where
                D2: serde::Deserializer<'de>,
            {
                Dynamic::deserialize(deserializer)
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Bool(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Number(v as f64))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Number(v as f64))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Number(v))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Dynamic, E> {
                if v == UNKNOWN_SENTINEL {
                    Ok(Dynamic::Unknown)
                } else {
                    Ok(Dynamic::String(v.to_string()))
                }
            }

            fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<Dynamic, E> {
                if v == UNKNOWN_SENTINEL {
                    Ok(Dynamic::Unknown)
                } else {
                    Ok(Dynamic::String(v))
                }
            }

            fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Dynamic, A::Error>
            where
                A: de::SeqAccess<'de>,
            {
                let mut items = Vec::new();
                while let Some(item) = seq.next_element()? {
                    items.push(item);
                }
                Ok(Dynamic::List(items))
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Dynamic, A::Error>
            where
                A: de::MapAccess<'de>,
            {
                let mut entries = BTreeMap::new();
                while let Some((key, value)) = map.next_entry::<String, Dynamic>()? {
                    entries.insert(key, value);
                }
                Ok(Dynamic::Map(entries))
            }
        }

        deserializer.deserialize_any(DynamicVisitor)
    }
}

/// DynamicValue is the container Terraform hands to and receives from
/// resources: config, planned state, prior state and new state.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicValue {
    pub value: Dynamic,
}

impl DynamicValue {
    pub fn new(value: Dynamic) -> Self {
        Self { value }
    }

    pub fn null() -> Self {
        Self::new(Dynamic::Null)
    }

    pub fn unknown() -> Self {
        Self::new(Dynamic::Unknown)
    }

    /// An empty object, the usual starting point for building state
    pub fn object() -> Self {
        Self::new(Dynamic::Map(BTreeMap::new()))
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    pub fn is_unknown(&self) -> bool {
        self.value.is_unknown()
    }

    pub fn encode_msgpack(&self) -> Result<Vec<u8>> {
        rmp_serde::encode::to_vec(&self.value)
            .map_err(|e| TfkitError::EncodingError(format!("msgpack encoding failed: {}", e)))
    }

    /// Terraform sends an empty payload for a null object
    pub fn decode_msgpack(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Ok(Self::null());
        }
        rmp_serde::decode::from_slice::<Dynamic>(data)
            .map(Self::new)
            .map_err(|e| TfkitError::DecodingError(format!("msgpack decoding failed: {}", e)))
    }

    pub fn encode_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(&self.value)
            .map_err(|e| TfkitError::EncodingError(format!("json encoding failed: {}", e)))
    }

    pub fn decode_json(data: &[u8]) -> Result<Self> {
        serde_json::from_slice::<Dynamic>(data)
            .map(Self::new)
            .map_err(|e| TfkitError::DecodingError(format!("json decoding failed: {}", e)))
    }

    /// Looks up the value at `path`. Missing attributes yield `None`.
    pub fn get(&self, path: &AttributePath) -> Option<&Dynamic> {
        let mut current = &self.value;
        for step in &path.steps {
            current = match (current, step) {
                (Dynamic::Map(m), AttributePathStep::AttributeName(name))
                | (Dynamic::Map(m), AttributePathStep::ElementKeyString(name)) => m.get(name)?,
                (Dynamic::List(l), AttributePathStep::ElementKeyInt(idx)) => {
                    l.get(usize::try_from(*idx).ok()?)?
                }
                _ => return None,
            };
        }
        Some(current)
    }

    /// Reads a typed field. Absent attributes read as `Value::Null`.
    pub fn get_value<T: AttributeValue>(&self, path: &AttributePath) -> Result<Value<T>> {
        match self.get(path) {
            Some(raw) => Value::from_dynamic(raw).map_err(|e| e.at(path)),
            None => Ok(Value::Null),
        }
    }

    /// Writes a typed field, including explicit nulls and unknowns.
    pub fn set_value<T: AttributeValue>(&mut self, path: &AttributePath, value: Value<T>) -> Result<()> {
        let raw = value.into_dynamic()?;
        self.set(path, raw)
    }

    pub fn set(&mut self, path: &AttributePath, new_value: Dynamic) -> Result<()> {
        let Some((last, parents)) = path.steps.split_last() else {
            self.value = new_value;
            return Ok(());
        };

        if !matches!(self.value, Dynamic::Map(_)) {
            self.value = Dynamic::Map(BTreeMap::new());
        }

        let mut current = &mut self.value;
        for step in parents {
            current = match (current, step) {
                (Dynamic::Map(m), AttributePathStep::AttributeName(name))
                | (Dynamic::Map(m), AttributePathStep::ElementKeyString(name)) => m
                    .entry(name.clone())
                    .or_insert_with(|| Dynamic::Map(BTreeMap::new())),
                (Dynamic::List(l), AttributePathStep::ElementKeyInt(idx)) => {
                    let len = l.len();
                    usize::try_from(*idx)
                        .ok()
                        .and_then(|i| l.get_mut(i))
                        .ok_or_else(|| {
                            TfkitError::InvalidPath(format!("index {} out of bounds ({})", idx, len))
                        })?
                }
                (other, step) => {
                    return Err(TfkitError::InvalidPath(format!(
                        "cannot step {:?} into {}",
                        step,
                        other.type_name()
                    )))
                }
            };
        }

        match (current, last) {
            (Dynamic::Map(m), AttributePathStep::AttributeName(name))
            | (Dynamic::Map(m), AttributePathStep::ElementKeyString(name)) => {
                m.insert(name.clone(), new_value);
                Ok(())
            }
            (Dynamic::List(l), AttributePathStep::ElementKeyInt(idx)) => {
                let len = l.len();
                let slot = usize::try_from(*idx)
                    .ok()
                    .and_then(|i| l.get_mut(i))
                    .ok_or_else(|| {
                        TfkitError::InvalidPath(format!("index {} out of bounds ({})", idx, len))
                    })?;
                *slot = new_value;
                Ok(())
            }
            (other, step) => Err(TfkitError::InvalidPath(format!(
                "cannot set {:?} on {}",
                step,
                other.type_name()
            ))),
        }
    }
}

/// AttributePath addresses a value inside a DynamicValue
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributePath {
    pub steps: Vec<AttributePathStep>,
}

impl AttributePath {
    pub fn new(name: &str) -> Self {
        Self {
            steps: vec![AttributePathStep::AttributeName(name.to_string())],
        }
    }

    pub fn root() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn attribute(mut self, name: &str) -> Self {
        self.steps
            .push(AttributePathStep::AttributeName(name.to_string()));
        self
    }

    pub fn index(mut self, idx: i64) -> Self {
        self.steps.push(AttributePathStep::ElementKeyInt(idx));
        self
    }

    pub fn key(mut self, key: &str) -> Self {
        self.steps
            .push(AttributePathStep::ElementKeyString(key.to_string()));
        self
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            match step {
                AttributePathStep::AttributeName(name) if i == 0 => write!(f, "{}", name)?,
                AttributePathStep::AttributeName(name) => write!(f, ".{}", name)?,
                AttributePathStep::ElementKeyString(key) => write!(f, "[\"{}\"]", key)?,
                AttributePathStep::ElementKeyInt(idx) => write!(f, "[{}]", idx)?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttributePathStep {
    AttributeName(String),
    ElementKeyString(String),
    ElementKeyInt(i64),
}

/// Diagnostic is a warning or error reported back to Terraform
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub summary: String,
    pub detail: String,
    pub attribute: Option<AttributePath>,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    pub fn with_attribute(mut self, path: AttributePath) -> Self {
        self.attribute = Some(path);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
}

pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

/// Config represents configuration values
pub type Config = DynamicValue;

/// State represents resource state values
pub type State = DynamicValue;
