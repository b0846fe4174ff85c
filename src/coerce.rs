//! Which primitive conversions the decoder accepts.
//!
//! Mirrors the boundaries of JSON: strings, booleans, integers and floats form
//! four families. Integers may become floats; floats may become integers only
//! when they carry no fractional part. Nothing crosses the other boundaries.

use facet_core::{NumericType, PrimitiveType, Shape, TextualType, Type};

use crate::value::Value;

/// A primitive coercion family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// Strings and characters.
    String,
    /// Booleans.
    Bool,
    /// Integers of any width or signedness.
    Integer,
    /// Floating point numbers.
    Float,
}

impl Family {
    /// Classifies a source value. Containers and null have no family.
    pub fn of_value(value: &Value) -> Option<Family> {
        match value {
            Value::String(_) => Some(Family::String),
            Value::Bool(_) => Some(Family::Bool),
            Value::Int(_) => Some(Family::Integer),
            Value::Float(_) => Some(Family::Float),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Classifies a destination shape. Non-primitive shapes have no family.
    pub fn of_shape(shape: &Shape) -> Option<Family> {
        match shape.ty {
            Type::Primitive(PrimitiveType::Boolean) => Some(Family::Bool),
            Type::Primitive(PrimitiveType::Numeric(NumericType::Integer { .. })) => {
                Some(Family::Integer)
            }
            Type::Primitive(PrimitiveType::Numeric(NumericType::Float)) => Some(Family::Float),
            Type::Primitive(PrimitiveType::Textual(TextualType::Char | TextualType::Str)) => {
                Some(Family::String)
            }
            _ if shape.type_identifier == "String" => Some(Family::String),
            _ => None,
        }
    }
}

/// Whether `value`, of family `src`, may be stored into a destination of family `dst`.
///
/// Width and range checks happen later, at assignment.
pub fn coerce_allowed(src: Family, dst: Family, value: &Value) -> bool {
    match (src, dst) {
        (a, b) if a == b => true,
        (Family::Integer, Family::Float) => true,
        (Family::Float, Family::Integer) => match value {
            Value::Float(f) => f.is_finite() && f.trunc() == *f,
            _ => false,
        },
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed(value: Value, dst: Family) -> bool {
        let src = Family::of_value(&value).unwrap();
        coerce_allowed(src, dst, &value)
    }

    #[test]
    fn integral_float_becomes_integer() {
        assert!(allowed(Value::Float(3.0), Family::Integer));
        assert!(allowed(Value::Float(-12.0), Family::Integer));
    }

    #[test]
    fn fractional_float_is_rejected() {
        assert!(!allowed(Value::Float(3.5), Family::Integer));
        assert!(!allowed(Value::Float(f64::NAN), Family::Integer));
        assert!(!allowed(Value::Float(f64::INFINITY), Family::Integer));
    }

    #[test]
    fn integer_becomes_float() {
        assert!(allowed(Value::Int(7), Family::Float));
    }

    #[test]
    fn no_crossing_string_or_bool() {
        assert!(!allowed(Value::from("true"), Family::Bool));
        assert!(!allowed(Value::from("1"), Family::Integer));
        assert!(!allowed(Value::Bool(true), Family::Integer));
        assert!(!allowed(Value::Int(1), Family::Bool));
        assert!(!allowed(Value::Float(1.0), Family::String));
    }
}
