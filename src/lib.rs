#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

use facet_core::Facet;

mod coerce;
mod converter;
mod decode;
mod encode;
mod error;
mod fields;
mod hooks;
mod strict;
mod value;

pub use coerce::{Family, coerce_allowed};
pub use converter::{Converter, ConverterBuilder, DEFAULT_MAX_DEPTH};
pub use error::{Result, UnstructuredError, UnstructuredErrorKind};
pub use fields::{FieldCache, FieldInfo};
pub use hooks::{FromUnstructured, Hooks, ToUnstructured};
pub use strict::{StrictDecodingError, UnknownFieldError};
pub use value::{Map, Value, ValueKind, deep_copy, deep_copy_map};

// ============================================================================
// Encoding
// ============================================================================

/// Converts a value of type `T` into a string-keyed mapping.
///
/// Fails with [`UnstructuredErrorKind::InvalidArgument`] if `T` does not encode
/// as a mapping.
///
/// # Example
/// ```
/// # use facet::Facet;
/// # use facet_unstructured::{Value, to_unstructured};
/// #[derive(Facet)]
/// struct Server {
///     host: String,
///     port: u16,
/// }
///
/// # fn main() -> Result<(), facet_unstructured::UnstructuredError> {
/// let server = Server { host: "localhost".into(), port: 8080 };
/// let map = to_unstructured(&server)?;
/// assert_eq!(map["host"], Value::from("localhost"));
/// assert_eq!(map["port"], Value::Int(8080));
/// # Ok(())
/// # }
/// ```
pub fn to_unstructured<T: Facet<'static>>(value: &T) -> Result<Map> {
    Converter::default_ref().to_unstructured(value)
}

/// Converts any supported value of type `T` into its unstructured form.
///
/// Unlike [`to_unstructured`] this accepts scalars and sequences too.
pub fn to_value<T: Facet<'static>>(value: &T) -> Result<Value> {
    Converter::default_ref().to_value(value)
}

// ============================================================================
// Decoding
// ============================================================================

/// Builds a value of type `T` from a string-keyed mapping.
///
/// Keys that match no field are ignored; fields with no matching key are
/// set to their default.
///
/// # Example
/// ```
/// # use facet::Facet;
/// # use facet_unstructured::{Map, Value, from_unstructured};
/// #[derive(Facet, Debug, PartialEq)]
/// struct Server {
///     host: String,
///     port: u16,
/// }
///
/// # fn main() -> Result<(), facet_unstructured::UnstructuredError> {
/// let mut map = Map::new();
/// map.insert("host".into(), Value::from("localhost"));
/// map.insert("port".into(), Value::Float(8080.0));
/// map.insert("ignored".into(), Value::Bool(true));
///
/// let server: Server = from_unstructured(&map)?;
/// assert_eq!(server, Server { host: "localhost".into(), port: 8080 });
/// # Ok(())
/// # }
/// ```
pub fn from_unstructured<T: Facet<'static>>(source: &Map) -> Result<T> {
    Converter::default_ref().from_unstructured(source)
}

/// Builds a value of type `T` from a mapping, rejecting unknown keys.
///
/// All unknown keys are reported together, sorted, in one
/// [`StrictDecodingError`].
///
/// # Example
/// ```
/// # use facet::Facet;
/// # use facet_unstructured::{Map, Value, from_unstructured_with_validation};
/// #[derive(Facet, Debug)]
/// struct Server {
///     host: String,
/// }
///
/// let mut map = Map::new();
/// map.insert("host".into(), Value::from("localhost"));
/// map.insert("extra".into(), Value::Int(1));
///
/// let err = from_unstructured_with_validation::<Server>(&map).unwrap_err();
/// assert_eq!(err.to_string(), r#"strict decoding error: unknown field "extra""#);
/// ```
pub fn from_unstructured_with_validation<T: Facet<'static>>(source: &Map) -> Result<T> {
    Converter::default_ref().from_unstructured_with_validation(source)
}

/// Builds a value of type `T` from any unstructured value.
pub fn from_value<T: Facet<'static>>(source: &Value) -> Result<T> {
    Converter::default_ref().from_value(source, false)
}
