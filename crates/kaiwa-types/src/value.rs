//! Runtime value types produced by evaluations.

use serde::{Deserialize, Serialize};

/// A runtime value reported by the compiler service.
///
/// Covers primitives, aggregates, and two special cases the formatter
/// treats specially: `Raw` (pre-rendered text that must not be quoted or
/// escaped) and `Type` (a type descriptor that expands to a full
/// description only at the top level).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Char(char),
    Str(String),
    /// Pre-rendered report text (help screens, variable dumps).
    /// Bypasses all quoting and escaping in the formatter.
    Raw(String),
    /// Ordered sequence. General enumerables are materialized into this
    /// form before formatting so the element count is known up front.
    List(Vec<Value>),
    /// Key/value mapping in original iteration order.
    Map(Vec<(Value, Value)>),
    /// A type descriptor.
    Type(TypeDesc),
    /// Anything else, carried as its default textual conversion.
    Opaque(String),
}

impl Value {
    /// Short type name for binding-table displays.
    pub fn type_name(&self) -> &str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Char(_) => "char",
            Value::Str(_) => "string",
            Value::Raw(_) => "message",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Type(_) => "type",
            Value::Opaque(_) => "object",
        }
    }

    /// True for the `Raw` wrapper, which display layers pass through
    /// without quoting.
    pub fn is_raw(&self) -> bool {
        matches!(self, Value::Raw(_))
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

/// Describes a type: a short name plus a full human-readable interface
/// description. The formatter emits `describe` at depth zero and `name`
/// anywhere nested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDesc {
    pub name: String,
    pub describe: String,
}

impl TypeDesc {
    pub fn new(name: impl Into<String>, describe: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            describe: describe.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names_cover_variants() {
        assert_eq!(Value::Null.type_name(), "null");
        assert_eq!(Value::Int(3).type_name(), "int");
        assert_eq!(Value::Str("x".into()).type_name(), "string");
        assert_eq!(Value::Map(vec![]).type_name(), "map");
    }

    #[test]
    fn raw_is_raw() {
        assert!(Value::Raw("help text".into()).is_raw());
        assert!(!Value::Str("help text".into()).is_raw());
    }

    #[test]
    fn value_round_trips_through_serde() {
        let v = Value::List(vec![Value::Int(1), Value::Str("two".into())]);
        let json = serde_json::to_string(&v).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }
}
