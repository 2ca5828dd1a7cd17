//! Error types for tfkit

use crate::types::AttributePath;

/// Error type for tfkit operations
#[derive(Debug, thiserror::Error)]
pub enum TfkitError {
    #[error("Resource type not found: {0}")]
    ResourceNotFound(String),

    #[error("Provider not configured")]
    ProviderNotConfigured,

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Decoding error: {0}")]
    DecodingError(String),

    #[error("Type mismatch at {path}: expected {expected}, got {actual}")]
    TypeMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    /// A nested object was assembled with a key set that does not match its
    /// declared attribute types. This is a projection defect, not user error.
    #[error("Object shape mismatch: missing {missing:?}, unexpected {unexpected:?}")]
    ObjectShape {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("{0}")]
    Custom(String),
}

impl TfkitError {
    /// Attaches the attribute path to a type mismatch raised by a conversion
    /// that did not know where its input came from.
    pub fn at(self, path: &AttributePath) -> Self {
        match self {
            TfkitError::TypeMismatch {
                path: inner,
                expected,
                actual,
            } => {
                let path = if inner.is_empty() {
                    path.to_string()
                } else if inner.starts_with('[') {
                    format!("{}{}", path, inner)
                } else {
                    format!("{}.{}", path, inner)
                };
                TfkitError::TypeMismatch {
                    path,
                    expected,
                    actual,
                }
            }
            other => other,
        }
    }
}

/// Result type alias for tfkit operations
pub type Result<T> = std::result::Result<T, TfkitError>;

impl From<String> for TfkitError {
    fn from(s: String) -> Self {
        TfkitError::Custom(s)
    }
}

impl From<&str> for TfkitError {
    fn from(s: &str) -> Self {
        TfkitError::Custom(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_shape_lists_both_sides() {
        let err = TfkitError::ObjectShape {
            missing: vec!["port".to_string()],
            unexpected: vec!["prot".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("port"));
        assert!(msg.contains("prot"));
    }

    #[test]
    fn nested_mismatch_gets_full_path() {
        let err = TfkitError::TypeMismatch {
            path: "[0].port".to_string(),
            expected: "number".to_string(),
            actual: "string".to_string(),
        }
        .at(&AttributePath::new("rules"));

        match err {
            TfkitError::TypeMismatch { path, .. } => assert_eq!(path, "rules[0].port"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn string_converts_to_custom() {
        let err: TfkitError = "boom".into();
        assert!(matches!(err, TfkitError::Custom(ref s) if s == "boom"));
    }
}
