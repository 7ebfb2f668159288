//! Host string values and the string-valuable extension point.
//!
//! The host tracks every attribute as unknown (not yet computed), null (not
//! set) or known. [`StringValue`] is the primitive form of a string attribute.
//! Custom attribute types wrap it and implement [`StringValuable`] to convert
//! back to the primitive, and optionally [`StringSemanticEquals`] to replace
//! byte equality during plan.

use std::any::Any;
use std::fmt;

use crate::diagnostics::Diagnostic;
use crate::error::ProviderError;

/// Type tag of the primitive string value.
pub const STRING_TYPE_NAME: &str = "StringType";

/// A primitive string attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StringValue {
    /// The attribute is not set.
    #[default]
    Null,
    /// The value will only be known after apply.
    Unknown,
    /// A concrete string.
    Known(String),
}

impl StringValue {
    /// Create a known value.
    pub fn new(value: impl Into<String>) -> Self {
        Self::Known(value.into())
    }

    /// Whether the value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Whether the value is unknown.
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// The string if the value is known.
    pub fn as_known(&self) -> Option<&str> {
        match self {
            Self::Known(s) => Some(s),
            Self::Null | Self::Unknown => None,
        }
    }

    /// The string, or an empty string when null or unknown.
    pub fn value_string(&self) -> &str {
        self.as_known().unwrap_or_default()
    }

    /// Convert from the host's JSON state encoding.
    ///
    /// `null` maps to [`StringValue::Null`]; anything other than a string or
    /// `null` is rejected.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, ProviderError> {
        match value {
            serde_json::Value::Null => Ok(Self::Null),
            serde_json::Value::String(s) => Ok(Self::Known(s.clone())),
            other => Err(ProviderError::Validation(format!(
                "expected a string or null, got {}",
                other
            ))),
        }
    }

    /// Convert to the host's JSON state encoding.
    ///
    /// Unknown values have no state encoding and become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Known(s) => serde_json::Value::String(s.clone()),
            Self::Null | Self::Unknown => serde_json::Value::Null,
        }
    }
}

impl fmt::Display for StringValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("<null>"),
            Self::Unknown => f.write_str("<unknown>"),
            Self::Known(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<&str> for StringValue {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for StringValue {
    fn from(value: String) -> Self {
        Self::Known(value)
    }
}

impl From<Option<String>> for StringValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::Null, Self::Known)
    }
}

/// A value usable wherever the host expects a string attribute.
pub trait StringValuable: fmt::Debug + Send + Sync {
    /// Stable type tag of the value's attribute type.
    fn type_name(&self) -> &'static str;

    /// Convert to the primitive string value.
    fn to_string_value(&self) -> StringValue;

    /// Access the concrete value, for downcasting.
    fn as_any(&self) -> &dyn Any;
}

/// A string value that defines its own equality for plan/diff.
///
/// The host calls this with the prior value as `self` and the newly
/// configured value as `other`. When it returns `true` the prior value is
/// kept and no change is reported.
pub trait StringSemanticEquals: StringValuable {
    /// Compare by meaning rather than by bytes.
    ///
    /// Returns whether the values match, plus advisory diagnostics.
    fn string_semantic_equals(&self, other: &dyn StringValuable) -> (bool, Vec<Diagnostic>);
}

impl StringValuable for StringValue {
    fn type_name(&self) -> &'static str {
        STRING_TYPE_NAME
    }

    fn to_string_value(&self) -> StringValue {
        self.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
