//! Canonical tree for structured text payloads.
//!
//! JSON and YAML payloads are both lowered into a [`Node`] tree so that one
//! comparison routine, [`deep_equal`], serves both formats. Object keys are
//! held in a sorted map, which makes key order irrelevant; array order is
//! preserved and significant.

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use thiserror::Error;

/// The text format a payload was parsed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// JSON text.
    Json,
    /// A YAML stream of one or more documents.
    Yaml,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Json => f.write_str("JSON"),
            Format::Yaml => f.write_str("YAML"),
        }
    }
}

/// Why a payload could not be lowered into a canonical tree.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The payload is not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload is not a valid YAML document.
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The YAML document is a bare scalar or empty.
    #[error("YAML document is not a mapping or a sequence")]
    NotStructured,

    /// A YAML mapping uses a sequence or mapping as a key.
    #[error("YAML mapping key is not a scalar")]
    ComplexKey,
}

/// A numeric leaf.
///
/// Integers and floats compare by numeric value, so `1` equals `1.0`.
#[derive(Debug, Clone, Copy)]
pub enum Number {
    /// A value that fits in a signed or unsigned 64-bit integer.
    Integer(i128),
    /// Any other number.
    Float(f64),
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (*self, *other) {
            (Number::Integer(a), Number::Integer(b)) => a == b,
            (Number::Integer(i), Number::Float(f)) | (Number::Float(f), Number::Integer(i)) => {
                // Equal only when both casts round-trip.
                f.fract() == 0.0 && f as i128 == i && i as f64 == f
            },
            (Number::Float(a), Number::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
        }
    }
}

impl From<&serde_json::Number> for Number {
    fn from(n: &serde_json::Number) -> Self {
        if let Some(i) = n.as_i64() {
            Number::Integer(i128::from(i))
        } else if let Some(u) = n.as_u64() {
            Number::Integer(i128::from(u))
        } else {
            Number::Float(n.as_f64().unwrap_or(f64::NAN))
        }
    }
}

impl From<&serde_yaml::Number> for Number {
    fn from(n: &serde_yaml::Number) -> Self {
        if let Some(i) = n.as_i64() {
            Number::Integer(i128::from(i))
        } else if let Some(u) = n.as_u64() {
            Number::Integer(i128::from(u))
        } else {
            Number::Float(n.as_f64().unwrap_or(f64::NAN))
        }
    }
}

/// A parser-independent structural representation of a payload.
#[derive(Debug, Clone)]
pub enum Node {
    /// `null` / `~`.
    Null,
    /// A boolean leaf.
    Bool(bool),
    /// A numeric leaf.
    Number(Number),
    /// A string leaf.
    String(String),
    /// An ordered sequence.
    Array(Vec<Node>),
    /// A mapping from string keys to values.
    Object(BTreeMap<String, Node>),
}

impl Node {
    /// Lower a parsed JSON value.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Node::Null,
            serde_json::Value::Bool(b) => Node::Bool(*b),
            serde_json::Value::Number(n) => Node::Number(n.into()),
            serde_json::Value::String(s) => Node::String(s.clone()),
            serde_json::Value::Array(items) => Node::Array(items.iter().map(Node::from_json).collect()),
            serde_json::Value::Object(map) => Node::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Node::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Lower a parsed YAML value.
    ///
    /// Tags are dropped and the tagged value is used in their place. Scalar
    /// mapping keys that are not strings are rendered to their scalar text.
    pub fn from_yaml(value: &serde_yaml::Value) -> Result<Self, ParseError> {
        Ok(match value {
            serde_yaml::Value::Null => Node::Null,
            serde_yaml::Value::Bool(b) => Node::Bool(*b),
            serde_yaml::Value::Number(n) => Node::Number(n.into()),
            serde_yaml::Value::String(s) => Node::String(s.clone()),
            serde_yaml::Value::Sequence(items) => Node::Array(
                items
                    .iter()
                    .map(Node::from_yaml)
                    .collect::<Result<_, _>>()?,
            ),
            serde_yaml::Value::Mapping(map) => {
                let mut object = BTreeMap::new();
                for (k, v) in map {
                    object.insert(yaml_key(k)?, Node::from_yaml(v)?);
                }
                Node::Object(object)
            },
            serde_yaml::Value::Tagged(tagged) => Node::from_yaml(&tagged.value)?,
        })
    }

    /// Short name of the node kind, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Null => "null",
            Node::Bool(_) => "bool",
            Node::Number(_) => "number",
            Node::String(_) => "string",
            Node::Array(_) => "array",
            Node::Object(_) => "object",
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        deep_equal(self, other)
    }
}

fn yaml_key(key: &serde_yaml::Value) -> Result<String, ParseError> {
    match key {
        serde_yaml::Value::String(s) => Ok(s.clone()),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        serde_yaml::Value::Null => Ok("null".to_string()),
        serde_yaml::Value::Tagged(tagged) => yaml_key(&tagged.value),
        serde_yaml::Value::Sequence(_) | serde_yaml::Value::Mapping(_) => {
            Err(ParseError::ComplexKey)
        },
    }
}

/// Parse JSON text into a canonical tree.
///
/// Any JSON value is accepted at the root, including bare scalars.
pub fn parse_json(text: &str) -> Result<Node, ParseError> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    Ok(Node::from_json(&value))
}

/// Parse a YAML stream into a canonical tree.
///
/// A single document must have a mapping or a sequence at its root; a bare
/// scalar or an empty stream carries no structure to compare and is rejected.
/// A stream of several documents becomes an array of them, in order.
pub fn parse_yaml(text: &str) -> Result<Node, ParseError> {
    let mut documents = serde_yaml::Deserializer::from_str(text)
        .map(|document| -> Result<Node, ParseError> {
            let value = serde_yaml::Value::deserialize(document)?;
            Node::from_yaml(&value)
        })
        .collect::<Result<Vec<_>, _>>()?;

    if documents.len() > 1 {
        return Ok(Node::Array(documents));
    }
    match documents.pop() {
        Some(node @ (Node::Object(_) | Node::Array(_))) => Ok(node),
        _ => Err(ParseError::NotStructured),
    }
}

/// Parse text in the given format.
pub fn parse(format: Format, text: &str) -> Result<Node, ParseError> {
    match format {
        Format::Json => parse_json(text),
        Format::Yaml => parse_yaml(text),
    }
}

/// Structural equality over canonical trees.
///
/// Objects must have exactly the same keys (case-sensitive) with equal
/// values, arrays must match element by element in order, and leaves must be
/// of the same kind with the same value. A kind mismatch is plain inequality.
pub fn deep_equal(a: &Node, b: &Node) -> bool {
    match (a, b) {
        (Node::Null, Node::Null) => true,
        (Node::Bool(x), Node::Bool(y)) => x == y,
        (Node::Number(x), Node::Number(y)) => x == y,
        (Node::String(x), Node::String(y)) => x == y,
        (Node::Array(xs), Node::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| deep_equal(x, y))
        },
        (Node::Object(xs), Node::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| deep_equal(x, y)))
        },
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json(text: &str) -> Node {
        parse_json(text).unwrap()
    }

    fn yaml(text: &str) -> Node {
        parse_yaml(text).unwrap()
    }

    #[test]
    fn test_key_order_ignored() {
        assert_eq!(json(r#"{"a":1,"b":2}"#), json(r#"{"b":2,"a":1}"#));
    }

    #[test]
    fn test_array_order_significant() {
        assert_ne!(json(r#"{"a":[1,2]}"#), json(r#"{"a":[2,1]}"#));
        assert_ne!(json("[1,2]"), json("[1,2,3]"));
    }

    #[test]
    fn test_missing_and_null_keys_differ() {
        assert_ne!(json(r#"{"a":1}"#), json(r#"{"a":1,"b":null}"#));
        assert_ne!(json(r#"{"a":1,"b":null}"#), json(r#"{"a":1}"#));
    }

    #[test]
    fn test_key_case_significant() {
        assert_ne!(json(r#"{"Name":"x"}"#), json(r#"{"name":"x"}"#));
    }

    #[test]
    fn test_kind_mismatch_is_inequality() {
        assert_ne!(json(r#"{"a":"1"}"#), json(r#"{"a":1}"#));
        assert_ne!(json(r#"{"a":{}}"#), json(r#"{"a":[]}"#));
        assert_ne!(json(r#"{"a":null}"#), json(r#"{"a":false}"#));
    }

    #[test]
    fn test_numeric_value_equality() {
        assert_eq!(json("[1]"), json("[1.0]"));
        assert_eq!(json("[-0]"), json("[0.0]"));
        assert_eq!(json("[18446744073709551615]"), json("[18446744073709551615]"));
        assert_ne!(json("[1]"), json("[1.5]"));
        assert_ne!(json("[9007199254740993]"), json("[9007199254740992.0]"));
    }

    #[test]
    fn test_yaml_nan_is_reflexive() {
        assert_eq!(yaml("a: .nan"), yaml("a: .nan"));
    }

    #[test]
    fn test_json_and_yaml_trees_compare() {
        assert_eq!(
            json(r#"{"os":"Linux","ports":[22,80],"debug":false}"#),
            yaml("os: Linux\nports:\n  - 22\n  - 80\ndebug: false\n")
        );
    }

    #[test]
    fn test_yaml_trailing_blank_lines_ignored() {
        assert_eq!(
            yaml("os: Linux\nautomation: ansible-devel"),
            yaml("\nos: Linux\nautomation: ansible-devel   \n\n\n")
        );
    }

    #[test]
    fn test_yaml_tags_are_transparent() {
        assert_eq!(yaml("a: !custom {b: 1}"), yaml("a: {b: 1}"));
    }

    #[test]
    fn test_yaml_scalar_keys_rendered() {
        let node = yaml("1: one\ntrue: yes\n");
        match node {
            Node::Object(map) => {
                assert!(map.contains_key("1"));
                assert!(map.contains_key("true"));
            },
            other => panic!("expected object, got {}", other.kind()),
        }
    }

    #[test]
    fn test_yaml_complex_key_rejected() {
        let err = parse_yaml("? [a, b]\n: c\n").unwrap_err();
        assert!(matches!(err, ParseError::ComplexKey));
    }

    #[test]
    fn test_yaml_scalar_root_rejected() {
        assert!(matches!(
            parse_yaml("just some text"),
            Err(ParseError::NotStructured)
        ));
        assert!(parse_yaml("").is_err());
    }

    #[test]
    fn test_yaml_multiple_documents_become_array() {
        assert_eq!(
            yaml("---\na: 1\n---\nb: 2\n"),
            json(r#"[{"a":1},{"b":2}]"#)
        );
        assert_ne!(yaml("---\na: 1\n---\nb: 2\n"), yaml("a: 1\n"));
        assert_ne!(
            yaml("---\na: 1\n---\nb: 2\n"),
            yaml("---\nb: 2\n---\na: 1\n")
        );
    }

    #[test]
    fn test_yaml_single_document_marker_is_transparent() {
        assert_eq!(yaml("---\na: 1\n"), yaml("a: 1\n"));
        assert_eq!(yaml("---\na: 1\n...\n"), yaml("a: 1\n"));
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(parse_json("os: Linux"), Err(ParseError::Json(_))));
        assert!(matches!(
            parse_yaml("a: [1, 2"),
            Err(ParseError::Yaml(_))
        ));
        assert!(parse(Format::Json, "{").is_err());
        assert!(parse(Format::Yaml, "- a\n- b").is_ok());
    }

    #[test]
    fn test_format_display() {
        assert_eq!(Format::Json.to_string(), "JSON");
        assert_eq!(Format::Yaml.to_string(), "YAML");
    }
}
