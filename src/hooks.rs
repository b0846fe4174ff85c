//! Per-type override of the reflection-driven conversion.

use std::collections::HashMap;

use facet_core::{ConstTypeId, Facet};
use facet_reflect::{Partial, Peek};

use crate::{Result, value::Value};

/// A type that produces its own unstructured representation.
///
/// Returning [`Value::Null`] stores a null (or nothing, for omit-if-empty fields).
pub trait ToUnstructured {
    /// Converts `self` into an unstructured value.
    fn to_unstructured(&self) -> Result<Value>;
}

/// A type that builds itself from an unstructured value.
pub trait FromUnstructured: Sized {
    /// Builds a value from `value`.
    fn from_unstructured(value: &Value) -> Result<Self>;
}

impl ToUnstructured for Value {
    fn to_unstructured(&self) -> Result<Value> {
        Ok(self.deep_copy())
    }
}

impl FromUnstructured for Value {
    fn from_unstructured(value: &Value) -> Result<Self> {
        Ok(value.deep_copy())
    }
}

pub(crate) type EncodeHook = for<'mem> fn(Peek<'mem, 'static>) -> Result<Value>;
pub(crate) type DecodeHook = fn(&Value, &mut Partial<'static>) -> Result<()>;

#[derive(Clone, Copy, Default)]
struct Hook {
    encode: Option<EncodeHook>,
    decode: Option<DecodeHook>,
}

fn encode_via<T>(peek: Peek<'_, 'static>) -> Result<Value>
where
    T: Facet<'static> + ToUnstructured,
{
    peek.get::<T>()?.to_unstructured()
}

fn decode_via<T>(value: &Value, partial: &mut Partial<'static>) -> Result<()>
where
    T: Facet<'static> + FromUnstructured,
{
    partial.set(T::from_unstructured(value)?)?;
    Ok(())
}

/// Registry of types whose conversion bypasses reflection.
///
/// Every registry starts with [`Value`] registered in both directions, which
/// is how a `Value` field acts as a dynamic slot holding any unstructured tree.
#[derive(Clone)]
pub struct Hooks {
    by_type: HashMap<ConstTypeId, Hook>,
}

impl Default for Hooks {
    fn default() -> Self {
        let mut hooks = Hooks {
            by_type: HashMap::new(),
        };
        hooks.register::<Value>();
        hooks
    }
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("registered", &self.by_type.len())
            .finish()
    }
}

impl Hooks {
    /// A registry holding only the built-in [`Value`] hook.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T`'s [`ToUnstructured`] implementation.
    pub fn register_to<T>(&mut self) -> &mut Self
    where
        T: Facet<'static> + ToUnstructured,
    {
        let hook = self.by_type.entry(T::SHAPE.id).or_default();
        hook.encode = Some(encode_via::<T> as EncodeHook);
        self
    }

    /// Registers `T`'s [`FromUnstructured`] implementation.
    pub fn register_from<T>(&mut self) -> &mut Self
    where
        T: Facet<'static> + FromUnstructured,
    {
        let hook = self.by_type.entry(T::SHAPE.id).or_default();
        hook.decode = Some(decode_via::<T> as DecodeHook);
        self
    }

    /// Registers both directions for `T`.
    pub fn register<T>(&mut self) -> &mut Self
    where
        T: Facet<'static> + ToUnstructured + FromUnstructured,
    {
        self.register_to::<T>().register_from::<T>()
    }

    pub(crate) fn encoder(&self, id: ConstTypeId) -> Option<EncodeHook> {
        self.by_type.get(&id).and_then(|h| h.encode)
    }

    pub(crate) fn decoder(&self, id: ConstTypeId) -> Option<DecodeHook> {
        self.by_type.get(&id).and_then(|h| h.decode)
    }
}
