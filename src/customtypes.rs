//! Semantically comparable string attributes.
//!
//! Free-form payloads such as inventory `variables` or job `extra_vars` are
//! sent to AAP as JSON or YAML text. The server reformats that text before
//! echoing it back, so comparing bytes would report drift on every plan.
//! [`CustomStringValue`] is a drop-in string value whose plan-time equality
//! compares the parsed structure instead.
//!
//! # Example
//!
//! ```
//! use aap_provider::customtypes::CustomStringValue;
//! use aap_provider::value::StringSemanticEquals;
//!
//! let prior = CustomStringValue::new(r#"{"a": 1, "b": [1, 2]}"#);
//! let configured = CustomStringValue::new("b:\n  - 1\n  - 2\na: 1\n");
//!
//! let (matched, diagnostics) = prior.string_semantic_equals(&configured);
//! assert!(matched);
//! assert!(diagnostics.is_empty());
//! ```

use std::any::Any;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, trace};

use crate::canonical::{self, Format, ParseError};
use crate::diagnostics::Diagnostic;
use crate::error::ProviderError;
use crate::value::{StringSemanticEquals, StringValuable, StringValue};

/// The attribute type of [`CustomStringValue`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CustomStringType;

impl CustomStringType {
    /// Stable type tag.
    pub const NAME: &'static str = "CustomStringType";

    /// The type tag.
    pub fn name(&self) -> &'static str {
        Self::NAME
    }

    /// Wrap a primitive string value.
    pub fn value_from_string(&self, value: StringValue) -> CustomStringValue {
        CustomStringValue { inner: value }
    }

    /// Build a value from the host's JSON state encoding.
    pub fn value_from_json(
        &self,
        value: &serde_json::Value,
    ) -> Result<CustomStringValue, ProviderError> {
        StringValue::from_json(value).map(|inner| self.value_from_string(inner))
    }
}

/// A string value compared by JSON/YAML structure during plan.
///
/// Construction never parses and never fails; the raw text is kept
/// byte-for-byte. `==` is plain identity (same state, same bytes) and is only
/// meant for places where semantic comparison does not apply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomStringValue {
    inner: StringValue,
}

impl CustomStringValue {
    /// Wrap raw text verbatim.
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            inner: StringValue::new(raw),
        }
    }

    /// A null value.
    pub fn null() -> Self {
        Self {
            inner: StringValue::Null,
        }
    }

    /// An unknown value.
    pub fn unknown() -> Self {
        Self {
            inner: StringValue::Unknown,
        }
    }

    /// Whether the value is null.
    pub fn is_null(&self) -> bool {
        self.inner.is_null()
    }

    /// Whether the value is unknown.
    pub fn is_unknown(&self) -> bool {
        self.inner.is_unknown()
    }

    /// The raw text if the value is known.
    pub fn as_known(&self) -> Option<&str> {
        self.inner.as_known()
    }

    /// The exact original text, or an empty string when null or unknown.
    pub fn value_string(&self) -> &str {
        self.inner.value_string()
    }

    /// The attribute type of this value.
    pub fn attribute_type(&self) -> CustomStringType {
        CustomStringType
    }
}

impl From<StringValue> for CustomStringValue {
    fn from(inner: StringValue) -> Self {
        Self { inner }
    }
}

impl From<CustomStringValue> for StringValue {
    fn from(value: CustomStringValue) -> Self {
        value.inner
    }
}

impl From<&str> for CustomStringValue {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for CustomStringValue {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl Serialize for CustomStringValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_known().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CustomStringValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<String>::deserialize(deserializer).map(|raw| StringValue::from(raw).into())
    }
}

impl StringValuable for CustomStringValue {
    fn type_name(&self) -> &'static str {
        CustomStringType::NAME
    }

    fn to_string_value(&self) -> StringValue {
        self.inner.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl StringSemanticEquals for CustomStringValue {
    fn string_semantic_equals(&self, other: &dyn StringValuable) -> (bool, Vec<Diagnostic>) {
        let Some(other) = other.as_any().downcast_ref::<CustomStringValue>() else {
            return (
                false,
                vec![Diagnostic::error("Semantic Equality Check Error").with_detail(format!(
                    "An unexpected value type was received while performing semantic \
                     equality checks. Expected {}, got {}. Please report this to the \
                     provider developers.",
                    CustomStringType::NAME,
                    other.type_name()
                ))],
            );
        };

        match (self.as_known(), other.as_known()) {
            (Some(current), Some(given)) => semantic_equals(current, given),
            // Null and unknown only ever match themselves.
            _ => (self.inner == other.inner, Vec::new()),
        }
    }
}

/// Compare two payloads by structure.
///
/// Text that is identical once trailing whitespace is dropped is equal
/// without parsing. Otherwise both sides are parsed as JSON first. If either
/// side is not JSON, both are parsed as YAML. If no format parses on both
/// sides the payloads are reported as different, with a warning describing
/// the parse failure.
pub fn semantic_equals(current: &str, given: &str) -> (bool, Vec<Diagnostic>) {
    if current.trim_end() == given.trim_end() {
        trace!("payloads are textually identical");
        return (true, Vec::new());
    }

    let failures = match compare_as(Format::Json, current, given) {
        Ok(matched) => return (matched, Vec::new()),
        Err(json_failure) => {
            trace!(error = %json_failure, "payloads are not both JSON, trying YAML");
            match compare_as(Format::Yaml, current, given) {
                Ok(matched) => return (matched, Vec::new()),
                Err(yaml_failure) => [json_failure, yaml_failure],
            }
        },
    };

    debug!("payloads could not be parsed as JSON or YAML, reporting a difference");
    let detail = failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    (
        false,
        vec![Diagnostic::warning("Unable to compare structured values").with_detail(format!(
            "The values could not both be parsed as JSON or as YAML and are treated \
             as different: {}",
            detail
        ))],
    )
}

/// A side of the comparison that failed to parse.
#[derive(Debug)]
struct Failure {
    format: Format,
    side: &'static str,
    error: ParseError,
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} value is not {} ({})", self.side, self.format, self.error)
    }
}

fn compare_as(format: Format, current: &str, given: &str) -> Result<bool, Failure> {
    let parse = |side: &'static str, text: &str| {
        canonical::parse(format, text).map_err(|error| Failure {
            format,
            side,
            error,
        })
    };
    let current = parse("current", current)?;
    let given = parse("given", given)?;
    let matched = canonical::deep_equal(&current, &given);
    trace!(%format, matched, "compared payloads");
    Ok(matched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticSeverity;
    use proptest::prelude::*;

    fn check(current: &str, given: &str) -> bool {
        CustomStringValue::new(current)
            .string_semantic_equals(&CustomStringValue::new(given))
            .0
    }

    #[test]
    fn test_construction_keeps_raw_text() {
        let raw = "  {\"a\":\t1}\n\n";
        let value = CustomStringValue::new(raw);
        assert_eq!(value.value_string(), raw);
        assert_eq!(value.as_known(), Some(raw));
        assert!(!value.is_null());
        assert!(!value.is_unknown());

        let empty = CustomStringValue::new("");
        assert_eq!(empty.value_string(), "");
        assert!(!empty.is_null());
    }

    #[test]
    fn test_type_tag_and_primitive_conversion() {
        let value = CustomStringValue::new("a: 1");
        assert_eq!(value.type_name(), "CustomStringType");
        assert_eq!(value.attribute_type().name(), "CustomStringType");
        assert_eq!(value.to_string_value(), StringValue::new("a: 1"));

        let back = CustomStringType.value_from_string(value.to_string_value());
        assert_eq!(back, value);
        assert_eq!(StringValue::from(back), StringValue::new("a: 1"));
    }

    #[test]
    fn test_identity_equality_is_bytewise() {
        assert_eq!(CustomStringValue::new("{}"), CustomStringValue::new("{}"));
        assert_ne!(CustomStringValue::new("{}"), CustomStringValue::new("{ }"));
        assert_ne!(CustomStringValue::null(), CustomStringValue::new(""));
    }

    #[test]
    fn test_serde_state_encoding() {
        let value: CustomStringValue = serde_json::from_value(serde_json::json!("x: 1")).unwrap();
        assert_eq!(value, CustomStringValue::new("x: 1"));
        assert_eq!(serde_json::to_value(&value).unwrap(), serde_json::json!("x: 1"));

        let null: CustomStringValue = serde_json::from_value(serde_json::json!(null)).unwrap();
        assert!(null.is_null());
        assert_eq!(serde_json::to_value(&null).unwrap(), serde_json::json!(null));

        assert!(CustomStringType
            .value_from_json(&serde_json::json!({"not": "a string"}))
            .is_err());
    }

    #[test]
    fn not_equal_mismatched_field_values() {
        assert!(!check(
            r#"{"exampleVariables":[{"name":"bar","namespace":"bar-namespace","type":0}]}"#,
            r#"{"exampleVariables":[{"name":"bar","namespace":"bar-namespace","type":1}]}"#,
        ));
    }

    #[test]
    fn not_equal_malformed_payload() {
        let (matched, diags) = CustomStringValue::new(
            r#""{"exampleVariables":[{"name":"bar","namespace":"bar-namespace","type":0}]}""#,
        )
        .string_semantic_equals(&CustomStringValue::new(
            r#"{"exampleVariables":[{"name":"bar","namespace":"bar-namespace","type":0}]}"#,
        ));
        assert!(!matched);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, DiagnosticSeverity::Warning);
    }

    #[test]
    fn not_equal_mismatched_field_names() {
        assert!(!check(
            r#"{"exampleVariables":[{"Name":"bar","namespace":"bar-namespace","type":0}]}"#,
            r#"{"exampleVariables":[{"name":"bar","namespace":"bar-namespace","type":0}]}"#,
        ));
    }

    #[test]
    fn not_equal_additional_null_field() {
        let (matched, diags) = CustomStringValue::new(
            r#"{"exampleVariables":[{"name":"bar","namespace":"bar-namespace","type":0}],"new-field": null}"#,
        )
        .string_semantic_equals(&CustomStringValue::new(
            r#"{"exampleVariables":[{"name":"bar","namespace":"bar-namespace","type":0}]}"#,
        ));
        assert!(!matched);
        assert!(diags.is_empty());
    }

    #[test]
    fn equal_object_key_order_difference() {
        assert!(check(
            r#"{"exampleVariables":[{"namespace":"bar-namespace","name":"bar","type":0}]}"#,
            r#"{"exampleVariables":[{"name":"bar","namespace":"bar-namespace","type":0}]}"#,
        ));
    }

    #[test]
    fn not_equal_array_item_order_difference() {
        assert!(!check(
            r#"{"exampleVariables":[{"name":"foo"},{"name":"bar"}]}"#,
            r#"{"exampleVariables":[{"name":"bar"},{"name":"foo"}]}"#,
        ));
        assert!(!check(r#"{"a":[1,2]}"#, r#"{"a":[2,1]}"#));
    }

    #[test]
    fn equal_byte_for_byte_match() {
        let payload =
            r#"{"exampleVariables":[{"name":"bar","namespace":"bar-namespace","type":0}]}"#;
        let (matched, diags) = CustomStringValue::new(payload)
            .string_semantic_equals(&CustomStringValue::new(payload));
        assert!(matched);
        assert!(diags.is_empty());
    }

    // Structural equality is authoritative here: indentation and line breaks
    // between JSON tokens do not change the payload, so these compare equal.
    #[test]
    fn equal_object_whitespace_difference() {
        assert!(check(
            "{\n\t\"hello\": \"world\",\n\t\"nums\": [1, 2, 3],\n\t\"nested\": {\n\t\t\"test-bool\": true\n\t}\n}",
            r#"{"hello":"world","nums":[1,2,3],"nested":{"test-bool":true}}"#,
        ));
    }

    #[test]
    fn not_equal_whitespace_inside_string_value() {
        assert!(!check(r#"{"hello":"world "}"#, r#"{"hello":"world"}"#));
    }

    const TABBED_YAML: &str = "os: Linux\n\t\t\tautomation: ansible-devel";

    #[test]
    fn equal_yaml_no_difference() {
        assert_eq!(semantic_equals(TABBED_YAML, TABBED_YAML), (true, vec![]));
        assert_eq!(
            CustomStringValue::new(TABBED_YAML)
                .string_semantic_equals(&CustomStringValue::new(TABBED_YAML)),
            (true, vec![])
        );
    }

    #[test]
    fn equal_yaml_trailing_newlines() {
        let (matched, diags) = CustomStringValue::new(TABBED_YAML).string_semantic_equals(
            &CustomStringValue::new("os: Linux\n\t\t\tautomation: ansible-devel\n\n\t\t\t"),
        );
        assert!(matched);
        assert!(diags.is_empty());
    }

    #[test]
    fn equal_yaml_trailing_blank_lines_after_parsing() {
        let (matched, diags) = CustomStringValue::new("os: Linux\nautomation: ansible-devel")
            .string_semantic_equals(&CustomStringValue::new(
                "\nos: Linux\nautomation: ansible-devel\n\n   \n",
            ));
        assert!(matched);
        assert!(diags.is_empty());
    }

    #[test]
    fn equal_identical_unparseable_text() {
        assert_eq!(semantic_equals("not: [valid", "not: [valid"), (true, vec![]));
        assert_eq!(semantic_equals("", ""), (true, vec![]));
    }

    #[test]
    fn not_equal_tabbed_yaml_value_difference() {
        let (matched, diags) =
            semantic_equals(TABBED_YAML, "os: Linux\n\t\t\tautomation: ansible-core");
        assert!(!matched);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, DiagnosticSeverity::Warning);
    }

    #[test]
    fn equal_yaml_against_json() {
        assert!(check(
            r#"{"os": "Linux", "ports": [22, 443]}"#,
            "---\nports:\n  - 22\n  - 443\nos: Linux\n",
        ));
    }

    #[test]
    fn not_equal_yaml_value_difference() {
        assert!(!check("os: Linux\n", "os: Windows\n"));
        assert!(!check("os: Linux\n", "OS: Linux\n"));
    }

    #[test]
    fn not_equal_unstructured_text() {
        let (matched, diags) = CustomStringValue::new("hello world")
            .string_semantic_equals(&CustomStringValue::new("goodbye world"));
        assert!(!matched);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].summary, "Unable to compare structured values");
        let detail = diags[0].detail.as_deref().unwrap();
        assert!(detail.contains("not JSON"));
        assert!(detail.contains("not YAML"));
    }

    #[test]
    fn not_equal_one_side_unparseable() {
        assert!(!check("a: 1", "a: [1"));
        assert!(!check("{\"a\": 1}", ""));
    }

    #[test]
    fn test_null_and_unknown_states() {
        let null = CustomStringValue::null();
        let unknown = CustomStringValue::unknown();
        let known = CustomStringValue::new("{}");

        assert_eq!(null.string_semantic_equals(&CustomStringValue::null()), (true, vec![]));
        assert_eq!(null.string_semantic_equals(&known), (false, vec![]));
        assert_eq!(known.string_semantic_equals(&unknown), (false, vec![]));
        assert_eq!(unknown.string_semantic_equals(&CustomStringValue::unknown()), (true, vec![]));
    }

    #[test]
    fn test_mismatched_value_type_reports_error() {
        let (matched, diags) =
            CustomStringValue::new("{}").string_semantic_equals(&StringValue::new("{}"));
        assert!(!matched);
        assert_eq!(diags.len(), 1);
        assert!(diags[0].is_error());
        assert_eq!(diags[0].summary, "Semantic Equality Check Error");
        assert!(diags[0].detail.as_deref().unwrap().contains("StringType"));
    }

    #[test]
    fn test_concurrent_comparisons() {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                std::thread::spawn(move || {
                    let a = CustomStringValue::new(format!(r#"{{"n": {}, "k": "v"}}"#, i));
                    let b = CustomStringValue::new(format!("k: v\nn: {}\n", i));
                    a.string_semantic_equals(&b).0
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }

    fn arb_json() -> impl Strategy<Value = serde_json::Value> {
        let leaf = prop_oneof![
            Just(serde_json::Value::Null),
            any::<bool>().prop_map(serde_json::Value::from),
            any::<i64>().prop_map(serde_json::Value::from),
            "[a-zA-Z0-9 _-]{0,8}".prop_map(serde_json::Value::from),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(serde_json::Value::from),
                prop::collection::btree_map("[a-zA-Z]{1,6}", inner, 0..4).prop_map(|map| {
                    serde_json::Value::Object(map.into_iter().collect())
                }),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_symmetric(a in arb_json(), b in arb_json()) {
            let a = a.to_string();
            let b = b.to_string();
            prop_assert_eq!(check(&a, &b), check(&b, &a));
        }

        #[test]
        fn prop_reflexive_under_reformatting(value in arb_json()) {
            let compact = value.to_string();
            let pretty = serde_json::to_string_pretty(&value).unwrap();
            prop_assert!(check(&compact, &compact));
            prop_assert!(check(&compact, &pretty));
        }
    }
}
