//! The converter: configuration shared by both conversion directions.

use std::sync::{Arc, LazyLock};

use facet_core::Facet;
use facet_reflect::{Partial, Peek};

use crate::{
    FieldCache, Hooks, Result, UnstructuredErrorKind,
    decode::{Decoder, accepts_object},
    encode::Encoder,
    value::{Map, Value},
};

/// Nesting limit used unless the builder says otherwise.
pub const DEFAULT_MAX_DEPTH: usize = 256;

static DEFAULT: LazyLock<Converter> = LazyLock::new(Converter::default);

/// Converts between typed values and unstructured trees.
///
/// A converter is immutable once built and can be shared freely between
/// threads. The free functions at the crate root use [`Converter::default_ref`],
/// which shares the process-wide [`FieldCache`].
#[derive(Debug, Clone)]
pub struct Converter {
    field_cache: Arc<FieldCache>,
    hooks: Hooks,
    max_depth: usize,
}

impl Default for Converter {
    fn default() -> Self {
        Self {
            field_cache: FieldCache::global(),
            hooks: Hooks::default(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Converter {
    /// Starts configuring a converter.
    pub fn builder() -> ConverterBuilder {
        ConverterBuilder::default()
    }

    /// The shared default converter.
    pub fn default_ref() -> &'static Converter {
        &DEFAULT
    }

    /// The field metadata cache in use.
    pub fn field_cache(&self) -> &Arc<FieldCache> {
        &self.field_cache
    }

    /// The registered per-type hooks.
    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    /// Maximum nesting depth accepted in either direction.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Converts `value` into a string-keyed mapping.
    ///
    /// Fails with [`UnstructuredErrorKind::InvalidArgument`] when `T` does not
    /// encode as a mapping (scalars, sequences, a `None` option).
    pub fn to_unstructured<T: Facet<'static>>(&self, value: &T) -> Result<Map> {
        log::trace!("to_unstructured::<{}>", T::SHAPE);
        match self.to_value(value)? {
            Value::Object(map) => Ok(map),
            _ => Err(UnstructuredErrorKind::InvalidArgument(format!(
                "ToUnstructured requires a non-nil pointer to an object, got {}",
                T::SHAPE
            ))
            .into()),
        }
    }

    /// Converts any supported value into its unstructured form.
    pub fn to_value<T: Facet<'static>>(&self, value: &T) -> Result<Value> {
        Encoder::new(self).encode(Peek::new(value))
    }

    /// Builds a `T` from `source`, ignoring keys no field consumes.
    pub fn from_unstructured<T: Facet<'static>>(&self, source: &Map) -> Result<T> {
        self.decode_object(source, false)
    }

    /// Builds a `T` from `source`, failing on keys no field consumes.
    ///
    /// Every unknown key is collected before failing, so a single
    /// [`UnstructuredErrorKind::StrictDecoding`] lists all of them, sorted.
    /// Any other failure takes precedence and is returned on its own.
    pub fn from_unstructured_with_validation<T: Facet<'static>>(
        &self,
        source: &Map,
    ) -> Result<T> {
        self.decode_object(source, true)
    }

    /// Builds a `T` from any unstructured value, with no top-level shape restriction.
    pub fn from_value<T: Facet<'static>>(&self, source: &Value, strict: bool) -> Result<T> {
        log::trace!("from_value::<{}> (strict: {strict})", T::SHAPE);
        self.build_with(strict, |decoder, partial| decoder.decode(partial, source))
    }

    /// Decodes `source` and replaces `dest` with the result.
    ///
    /// Fields absent from `source` end up at their defaults, as with
    /// [`Converter::from_unstructured`]. On error `dest` is left untouched.
    pub fn from_unstructured_into<T: Facet<'static>>(
        &self,
        source: &Map,
        dest: &mut T,
        strict: bool,
    ) -> Result<()> {
        *dest = self.decode_object(source, strict)?;
        Ok(())
    }

    fn decode_object<T: Facet<'static>>(&self, source: &Map, strict: bool) -> Result<T> {
        if !accepts_object(self, T::SHAPE) {
            return Err(UnstructuredErrorKind::InvalidArgument(format!(
                "FromUnstructured requires a non-nil pointer to an object, got {}",
                T::SHAPE
            ))
            .into());
        }
        log::trace!("from_unstructured::<{}> (strict: {strict})", T::SHAPE);
        self.build_with(strict, |decoder, partial| decoder.decode_object(partial, source))
    }

    fn build_with<T: Facet<'static>>(
        &self,
        strict: bool,
        decode: impl FnOnce(&mut Decoder<'_>, &mut Partial<'static>) -> Result<()>,
    ) -> Result<T> {
        let mut typed_partial = Partial::alloc::<T>()?;
        let mut decoder = Decoder::new(self, strict);
        decode(&mut decoder, typed_partial.inner_mut())?;
        let value = typed_partial.build().map(|b| *b)?;

        if let Some(err) = decoder.finish() {
            log::trace!("Strict decoding found {} unknown fields", err.errors().len());
            return Err(err.into());
        }
        Ok(value)
    }
}

/// Configures a [`Converter`].
///
/// ```
/// # use facet_unstructured::{Converter, FieldCache, Hooks};
/// # use std::sync::Arc;
/// let converter = Converter::builder()
///     .field_cache(Arc::new(FieldCache::new()))
///     .hooks(Hooks::new())
///     .max_depth(32)
///     .build();
/// assert_eq!(converter.max_depth(), 32);
/// ```
#[derive(Debug, Clone)]
pub struct ConverterBuilder {
    field_cache: Option<Arc<FieldCache>>,
    hooks: Hooks,
    max_depth: usize,
}

impl Default for ConverterBuilder {
    fn default() -> Self {
        Self {
            field_cache: None,
            hooks: Hooks::default(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ConverterBuilder {
    /// Uses `cache` instead of the process-wide cache.
    pub fn field_cache(mut self, cache: Arc<FieldCache>) -> Self {
        self.field_cache = Some(cache);
        self
    }

    /// Replaces the hook registry.
    pub fn hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Sets the nesting limit. Zero rejects every input.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Finishes configuration.
    pub fn build(self) -> Converter {
        Converter {
            field_cache: self.field_cache.unwrap_or_else(FieldCache::global),
            hooks: self.hooks,
            max_depth: self.max_depth,
        }
    }
}
