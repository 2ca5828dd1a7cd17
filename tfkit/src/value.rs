//! Typed, tri-state attribute values
//!
//! Every attribute in a resource model is a [`Value<T>`]: known, null, or
//! unknown (to be filled in by the remote system during apply). Models are
//! read from and written back to a [`DynamicValue`](crate::types::DynamicValue)
//! through the [`AttributeValue`] conversions defined here.

use crate::error::{Result, TfkitError};
use crate::schema::AttributeType;
use crate::types::Dynamic;
use std::collections::{BTreeMap, BTreeSet};

/// Value is the state of a single attribute
#[derive(Debug, Clone, PartialEq)]
pub enum Value<T> {
    Known(T),
    Null,
    Unknown,
}

impl<T> Default for Value<T> {
    fn default() -> Self {
        Value::Null
    }
}

impl<T> Value<T> {
    pub fn is_known(&self) -> bool {
        matches!(self, Value::Known(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Value::Unknown)
    }

    pub fn as_known(&self) -> Option<&T> {
        match self {
            Value::Known(v) => Some(v),
            _ => None,
        }
    }

    /// Null and unknown both collapse to `None`
    pub fn into_option(self) -> Option<T> {
        match self {
            Value::Known(v) => Some(v),
            _ => None,
        }
    }

    /// Remote optionals map `None` to null
    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(v) => Value::Known(v),
            None => Value::Null,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Value<U> {
        match self {
            Value::Known(v) => Value::Known(f(v)),
            Value::Null => Value::Null,
            Value::Unknown => Value::Unknown,
        }
    }
}

impl<T: PartialEq + Clone> Value<T> {
    /// Keeps the prior spelling when the new value is equal to it under
    /// `T`'s equality. Used with semantic-equality types such as
    /// [`TrimmedString`].
    pub fn prefer_prior(self, prior: &Value<T>) -> Value<T> {
        match (&self, prior) {
            (Value::Known(new), Value::Known(old)) if new == old => prior.clone(),
            _ => self,
        }
    }
}

impl<T> Value<T> {
    /// A remote value for an optional attribute the user left unset.
    /// Stays null when `planned` is null, so server-side defaults do not
    /// show up as a diff against config.
    pub fn unless_unset(self, planned: &Value<T>) -> Value<T> {
        match planned {
            Value::Null => Value::Null,
            _ => self,
        }
    }
}

impl<T> Value<Vec<T>> {
    /// Lists read from the API are never null: an absent list is empty.
    pub fn from_remote_list(items: Option<Vec<T>>) -> Self {
        Value::Known(items.unwrap_or_default())
    }

    /// Lists sent to the API are never absent: null or unknown become empty.
    pub fn to_remote_list(self) -> Vec<T> {
        self.into_option().unwrap_or_default()
    }

    /// Like [`Value::from_remote_list`], but an empty or absent remote list
    /// reads back as null when the planned list was null.
    pub fn from_remote_list_for(items: Option<Vec<T>>, planned: &Value<Vec<T>>) -> Self {
        match items {
            Some(items) if !items.is_empty() => Value::Known(items),
            _ if planned.is_null() => Value::Null,
            _ => Value::Known(vec![]),
        }
    }
}

impl<T: AttributeValue> Value<T> {
    pub fn from_dynamic(raw: &Dynamic) -> Result<Self> {
        match raw {
            Dynamic::Null => Ok(Value::Null),
            Dynamic::Unknown => Ok(Value::Unknown),
            other => T::from_dynamic(other).map(Value::Known),
        }
    }

    pub fn into_dynamic(self) -> Result<Dynamic> {
        match self {
            Value::Known(v) => v.into_dynamic(),
            Value::Null => Ok(Dynamic::Null),
            Value::Unknown => Ok(Dynamic::Unknown),
        }
    }
}

/// Conversion between a Rust type and its Terraform representation
pub trait AttributeValue: Sized {
    fn attribute_type() -> AttributeType;

    fn from_dynamic(raw: &Dynamic) -> Result<Self>;

    /// Fallible because nested objects verify their shape on the way out
    fn into_dynamic(self) -> Result<Dynamic>;
}

pub(crate) fn mismatch(expected: &str, actual: &Dynamic) -> TfkitError {
    TfkitError::TypeMismatch {
        path: String::new(),
        expected: expected.to_string(),
        actual: actual.type_name().to_string(),
    }
}

impl AttributeValue for String {
    fn attribute_type() -> AttributeType {
        AttributeType::String
    }

    fn from_dynamic(raw: &Dynamic) -> Result<Self> {
        raw.as_str()
            .map(str::to_string)
            .ok_or_else(|| mismatch("string", raw))
    }

    fn into_dynamic(self) -> Result<Dynamic> {
        Ok(Dynamic::String(self))
    }
}

impl AttributeValue for i64 {
    fn attribute_type() -> AttributeType {
        AttributeType::Number
    }

    fn from_dynamic(raw: &Dynamic) -> Result<Self> {
        match raw.as_number() {
            Some(n) if n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64 => {
                Ok(n as i64)
            }
            Some(n) => Err(TfkitError::TypeMismatch {
                path: String::new(),
                expected: "int64".to_string(),
                actual: format!("number {}", n),
            }),
            None => Err(mismatch("number", raw)),
        }
    }

    fn into_dynamic(self) -> Result<Dynamic> {
        Ok(Dynamic::Number(self as f64))
    }
}

impl AttributeValue for bool {
    fn attribute_type() -> AttributeType {
        AttributeType::Bool
    }

    fn from_dynamic(raw: &Dynamic) -> Result<Self> {
        raw.as_bool().ok_or_else(|| mismatch("bool", raw))
    }

    fn into_dynamic(self) -> Result<Dynamic> {
        Ok(Dynamic::Bool(self))
    }
}

impl<T: AttributeValue> AttributeValue for Vec<T> {
    fn attribute_type() -> AttributeType {
        AttributeType::List(Box::new(T::attribute_type()))
    }

    fn from_dynamic(raw: &Dynamic) -> Result<Self> {
        let items = raw.as_list().ok_or_else(|| mismatch("list", raw))?;
        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                T::from_dynamic(item).map_err(|e| match e {
                    TfkitError::TypeMismatch {
                        path,
                        expected,
                        actual,
                    } => TfkitError::TypeMismatch {
                        path: if path.is_empty() {
                            format!("[{}]", i)
                        } else {
                            format!("[{}].{}", i, path)
                        },
                        expected,
                        actual,
                    },
                    other => other,
                })
            })
            .collect()
    }

    fn into_dynamic(self) -> Result<Dynamic> {
        self.into_iter()
            .map(AttributeValue::into_dynamic)
            .collect::<Result<Vec<_>>>()
            .map(Dynamic::List)
    }
}

/// String compared by its content without surrounding whitespace.
///
/// The API normalises some strings (SSH public keys lose their trailing
/// newline); comparing trimmed content keeps such values from showing up as
/// perpetual diffs.
#[derive(Debug, Clone, Eq)]
pub struct TrimmedString(pub String);

impl TrimmedString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn trimmed(&self) -> &str {
        self.0.trim()
    }
}

impl PartialEq for TrimmedString {
    fn eq(&self, other: &Self) -> bool {
        self.trimmed() == other.trimmed()
    }
}

impl AttributeValue for TrimmedString {
    fn attribute_type() -> AttributeType {
        AttributeType::String
    }

    fn from_dynamic(raw: &Dynamic) -> Result<Self> {
        String::from_dynamic(raw).map(TrimmedString)
    }

    fn into_dynamic(self) -> Result<Dynamic> {
        Ok(Dynamic::String(self.0))
    }
}

/// Builds an object value from attributes checked against their declared
/// types. The key sets must match exactly.
pub fn object_from_attributes(
    types: &[(&str, AttributeType)],
    attributes: BTreeMap<String, Dynamic>,
) -> Result<Dynamic> {
    let declared: BTreeSet<&str> = types.iter().map(|(name, _)| *name).collect();
    let supplied: BTreeSet<&str> = attributes.keys().map(String::as_str).collect();

    let missing: Vec<String> = declared
        .difference(&supplied)
        .map(|s| s.to_string())
        .collect();
    let unexpected: Vec<String> = supplied
        .difference(&declared)
        .map(|s| s.to_string())
        .collect();

    if !missing.is_empty() || !unexpected.is_empty() {
        return Err(TfkitError::ObjectShape {
            missing,
            unexpected,
        });
    }

    for (name, attr_type) in types {
        let value = &attributes[*name];
        if !attr_type.conforms(value) {
            return Err(TfkitError::TypeMismatch {
                path: name.to_string(),
                expected: attr_type.to_string(),
                actual: value.type_name().to_string(),
            });
        }
    }

    Ok(Dynamic::Map(attributes))
}

/// Collects typed attributes for [`object_from_attributes`]
pub struct ObjectBuilder<'a> {
    types: &'a [(&'a str, AttributeType)],
    attributes: BTreeMap<String, Dynamic>,
}

impl<'a> ObjectBuilder<'a> {
    pub fn new(types: &'a [(&'a str, AttributeType)]) -> Self {
        Self {
            types,
            attributes: BTreeMap::new(),
        }
    }

    pub fn set<T: AttributeValue>(mut self, name: &str, value: Value<T>) -> Result<Self> {
        let raw = value.into_dynamic()?;
        self.attributes.insert(name.to_string(), raw);
        Ok(self)
    }

    pub fn build(self) -> Result<Dynamic> {
        object_from_attributes(self.types, self.attributes)
    }
}

/// Typed reads out of an object value
pub struct ObjectReader<'a> {
    attributes: &'a BTreeMap<String, Dynamic>,
}

impl<'a> ObjectReader<'a> {
    pub fn new(raw: &'a Dynamic) -> Result<Self> {
        raw.as_map()
            .map(|attributes| Self { attributes })
            .ok_or_else(|| mismatch("object", raw))
    }

    /// Like [`ObjectReader::new`], but rejects keys not declared in `types`
    pub fn checked(raw: &'a Dynamic, types: &[(&str, AttributeType)]) -> Result<Self> {
        let reader = Self::new(raw)?;
        let unexpected: Vec<String> = reader
            .attributes
            .keys()
            .filter(|key| !types.iter().any(|(name, _)| *name == key.as_str()))
            .cloned()
            .collect();
        if !unexpected.is_empty() {
            return Err(TfkitError::ObjectShape {
                missing: vec![],
                unexpected,
            });
        }
        Ok(reader)
    }

    pub fn get<T: AttributeValue>(&self, name: &str) -> Result<Value<T>> {
        match self.attributes.get(name) {
            Some(raw) => Value::from_dynamic(raw).map_err(|e| match e {
                TfkitError::TypeMismatch {
                    path,
                    expected,
                    actual,
                } => TfkitError::TypeMismatch {
                    path: if path.is_empty() {
                        name.to_string()
                    } else {
                        format!("{}.{}", name, path)
                    },
                    expected,
                    actual,
                },
                other => other,
            }),
            None => Ok(Value::Null),
        }
    }
}

/// Attribute types as owned map, for [`AttributeType::Object`]
pub fn object_type(types: &[(&str, AttributeType)]) -> AttributeType {
    AttributeType::Object(
        types
            .iter()
            .map(|(name, t)| (name.to_string(), t.clone()))
            .collect(),
    )
}
