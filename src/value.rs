//! The unstructured tree: a closed set of JSON-compatible kinds.

use std::{collections::BTreeMap, fmt};

use facet::Facet;

/// String-keyed mapping of unstructured values.
///
/// Keys iterate in sorted order, so a tree always renders the same way.
pub type Map = BTreeMap<String, Value>;

/// A dynamically-typed value restricted to JSON-compatible primitives.
///
/// Byte sequences never appear here directly; they travel as base64 strings.
#[derive(Debug, Clone, PartialEq, Facet)]
#[repr(u8)]
pub enum Value {
    /// Absent value.
    Null,
    /// Boolean.
    Bool(bool),
    /// Every integer kind widens to this.
    Int(i64),
    /// Every float kind widens to this.
    Float(f64),
    /// UTF-8 string.
    String(String),
    /// Ordered sequence.
    Array(Vec<Value>),
    /// String-keyed mapping.
    Object(Map),
}

/// The kind of an unstructured value, used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// `null`
    Null,
    /// `bool`
    Bool,
    /// `int64`
    Int,
    /// `float64`
    Float,
    /// `string`
    String,
    /// `array`
    Array,
    /// `object`
    Object,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Int => "int64",
            ValueKind::Float => "float64",
            ValueKind::String => "string",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
        };
        f.write_str(name)
    }
}

impl Value {
    /// The kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Object(_) => ValueKind::Object,
        }
    }

    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The boolean, if this is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The integer, if this is one.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// The value as a float. Integers widen.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(n) => Some(*n),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// The string slice, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The elements, if this is an array.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// The mapping, if this is an object.
    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Deep-copies the tree. See [`deep_copy`].
    pub fn deep_copy(&self) -> Value {
        deep_copy(self)
    }
}

/// Recursively copies an unstructured tree.
///
/// The result shares no container with `value`. A null stays null and an empty
/// container stays empty; neither is ever turned into the other.
///
/// # Example
/// ```
/// # use facet_unstructured::{Map, Value, deep_copy};
/// let mut inner = Map::new();
/// inner.insert("replicas".into(), Value::Int(3));
/// let original = Value::Array(vec![Value::Object(inner), Value::Null]);
///
/// let mut copy = deep_copy(&original);
/// if let Value::Array(items) = &mut copy {
///     items.push(Value::Bool(true));
/// }
/// assert_eq!(original.as_array().unwrap().len(), 2);
/// assert_eq!(copy.as_array().unwrap().len(), 3);
/// ```
pub fn deep_copy(value: &Value) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::Bool(b) => Value::Bool(*b),
        Value::Int(n) => Value::Int(*n),
        Value::Float(n) => Value::Float(*n),
        Value::String(s) => Value::String(s.clone()),
        Value::Array(items) => Value::Array(items.iter().map(deep_copy).collect()),
        Value::Object(map) => Value::Object(deep_copy_map(map)),
    }
}

/// Deep-copies a whole object.
pub fn deep_copy_map(map: &Map) -> Map {
    map.iter()
        .map(|(k, v)| (k.clone(), deep_copy(v)))
        .collect()
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(value)
    }
}

impl From<Map> for Value {
    fn from(value: Map) -> Self {
        Value::Object(value)
    }
}
