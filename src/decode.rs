//! Unstructured tree to typed value.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use facet_core::{
    Characteristic, Def, EnumType, Facet, Field, NumericType, PrimitiveType, Shape, ShapeLayout,
    StructKind, StructType, Type, UserType,
};
use facet_reflect::Partial;

use crate::{
    Converter, Result, UnstructuredErrorKind,
    coerce::{Family, coerce_allowed},
    strict::{StrictContext, StrictDecodingError},
    value::{Map, Value},
};

/// How positional elements are addressed inside their container.
#[derive(Clone, Copy)]
enum Slot {
    /// Tuple members, reflected as numbered fields.
    Field,
    /// Fixed-size array elements.
    Element,
}

pub(crate) struct Decoder<'c> {
    converter: &'c Converter,
    ctx: StrictContext,
    depth: usize,
}

impl<'c> Decoder<'c> {
    pub(crate) fn new(converter: &'c Converter, strict: bool) -> Self {
        Self {
            converter,
            ctx: StrictContext::new(strict),
            depth: 0,
        }
    }

    /// Consumes the decoder, yielding the unknown fields collected in strict mode.
    pub(crate) fn finish(self) -> Option<StrictDecodingError> {
        self.ctx.finish()
    }

    pub(crate) fn decode(&mut self, partial: &mut Partial<'static>, source: &Value) -> Result<()> {
        self.nested(|decoder| decoder.decode_inner(partial, source))
    }

    /// Decodes an object source without wrapping it in a [`Value`] first.
    pub(crate) fn decode_object(&mut self, partial: &mut Partial<'static>, map: &Map) -> Result<()> {
        self.nested(|decoder| decoder.decode_object_inner(partial, map))
    }

    fn nested(&mut self, f: impl FnOnce(&mut Self) -> Result<()>) -> Result<()> {
        if self.depth >= self.converter.max_depth() {
            return Err(UnstructuredErrorKind::DepthExceeded(self.converter.max_depth()).into());
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn decode_inner(&mut self, partial: &mut Partial<'static>, source: &Value) -> Result<()> {
        let shape = partial.shape();
        log::trace!(
            "Decoding {} into {shape} at {:?}",
            source.kind(),
            self.ctx.path()
        );

        // A null source resets every kind to its zero value
        if source.is_null() {
            log::trace!("Null source, resetting {shape} to zero");
            return set_zero(partial);
        }

        if let Some(hook) = self.converter.hooks().decoder(shape.id) {
            log::trace!("Using custom decoder for {shape}");
            return hook(source, partial);
        }

        match shape.def {
            Def::Option(_) => {
                partial.begin_some()?;
                self.decode(partial, source)?;
                partial.end()?;
                return Ok(());
            }
            Def::Pointer(_) => {
                partial.begin_smart_ptr()?;
                self.decode(partial, source)?;
                partial.end()?;
                return Ok(());
            }
            _ => {}
        }

        // Transparent wrappers decode as what they wrap
        if shape.inner.is_some() {
            partial.begin_inner()?;
            self.decode(partial, source)?;
            partial.end()?;
            return Ok(());
        }

        match &shape.ty {
            Type::User(UserType::Struct(struct_type)) => {
                return match (&struct_type.kind, source) {
                    (StructKind::Tuple | StructKind::TupleStruct, _) => {
                        let len = struct_type.fields.len();
                        self.decode_positional(partial, source, len, Slot::Field)
                    }
                    (_, Value::Object(map)) => self.decode_struct(partial, map, struct_type),
                    _ => Err(UnstructuredErrorKind::ShapeMismatch(format!(
                        "cannot restore struct from: {}",
                        source.kind()
                    ))
                    .into()),
                };
            }
            Type::User(UserType::Enum(enum_type)) => {
                return decode_enum(partial, source, enum_type);
            }
            _ => {}
        }

        match &shape.def {
            Def::Scalar => decode_scalar(partial, source),
            Def::List(list_def) if list_def.t().id == u8::SHAPE.id => {
                decode_bytes(partial, source)
            }
            Def::List(_) => self.decode_list(partial, source),
            Def::Array(array_def) => {
                self.decode_positional(partial, source, array_def.n, Slot::Element)
            }
            Def::Map(_) => match source {
                Value::Object(entries) => self.decode_map(partial, entries),
                _ => Err(UnstructuredErrorKind::ShapeMismatch(format!(
                    "cannot restore map from {}",
                    source.kind()
                ))
                .into()),
            },
            _ => Err(UnstructuredErrorKind::UnsupportedShape(format!("{shape}")).into()),
        }
    }

    /// Same dispatch as [`Decoder::decode_inner`], restricted to the shapes an
    /// object can fill.
    fn decode_object_inner(&mut self, partial: &mut Partial<'static>, map: &Map) -> Result<()> {
        let shape = partial.shape();

        if self.converter.hooks().decoder(shape.id).is_some() {
            // Hooks take an owned tree
            return self.decode_inner(partial, &Value::Object(map.clone()));
        }

        match shape.def {
            Def::Option(_) => {
                partial.begin_some()?;
                self.decode_object(partial, map)?;
                partial.end()?;
                return Ok(());
            }
            Def::Pointer(_) => {
                partial.begin_smart_ptr()?;
                self.decode_object(partial, map)?;
                partial.end()?;
                return Ok(());
            }
            _ => {}
        }

        if shape.inner.is_some() {
            partial.begin_inner()?;
            self.decode_object(partial, map)?;
            partial.end()?;
            return Ok(());
        }

        match (&shape.ty, &shape.def) {
            (Type::User(UserType::Struct(struct_type)), _)
                if matches!(struct_type.kind, StructKind::Struct | StructKind::Unit) =>
            {
                self.decode_struct(partial, map, struct_type)
            }
            (_, Def::Map(_)) => self.decode_map(partial, map),
            _ => Err(UnstructuredErrorKind::ShapeMismatch(format!(
                "cannot restore {shape} from object"
            ))
            .into()),
        }
    }

    fn decode_struct(
        &mut self,
        partial: &mut Partial<'static>,
        map: &Map,
        struct_type: &StructType,
    ) -> Result<()> {
        let shape = partial.shape();
        let cache = self.converter.field_cache();
        let inlined = self.ctx.is_inlined();
        let mark = self.ctx.mark();

        if !inlined {
            self.ctx.push_matched_key_tracker();
        }

        for (index, field) in struct_type.fields.iter().enumerate() {
            let info = cache.resolve(shape, index, field);

            if info.excluded {
                partial.begin_nth_field(index)?;
                zero_field(partial, field)?;
                partial.end()?;
                continue;
            }

            if info.inline {
                // Same source, same key scope
                log::trace!("Decoding inlined field {}", field.name);
                self.ctx.set_inlined(true);
                partial.begin_nth_field(index)?;
                self.decode_object(partial, map)?;
                partial.end()?;
                self.ctx.set_inlined(inlined);
                continue;
            }

            self.ctx.record_matched_key(&info.name);
            match map.get(&info.name) {
                Some(value) => {
                    self.ctx.set_inlined(false);
                    self.ctx.push_key(&info.name);
                    partial.begin_nth_field(index)?;
                    self.decode(partial, value)?;
                    partial.end()?;
                    self.ctx.truncate(mark);
                    self.ctx.set_inlined(inlined);
                }
                None => {
                    log::trace!("Field {} absent, resetting to zero", info.name);
                    partial.begin_nth_field(index)?;
                    zero_field(partial, field)?;
                    partial.end()?;
                }
            }
        }

        if !inlined {
            self.ctx.pop_and_verify_matched_keys(map);
        }

        Ok(())
    }

    fn decode_list(&mut self, partial: &mut Partial<'static>, source: &Value) -> Result<()> {
        let Value::Array(items) = source else {
            return Err(UnstructuredErrorKind::ShapeMismatch(format!(
                "cannot restore slice from {}",
                source.kind()
            ))
            .into());
        };

        // begin_list does not push a frame, so there is no matching end()
        partial.begin_list()?;

        let mark = self.ctx.mark();
        let inlined = self.ctx.set_inlined(false);
        for (index, item) in items.iter().enumerate() {
            self.ctx.push_index(index);
            partial.begin_list_item()?;
            self.decode(partial, item)?;
            partial.end()?;
            self.ctx.truncate(mark);
        }
        self.ctx.set_inlined(inlined);

        Ok(())
    }

    /// Fixed arrays and tuples: exactly `len` elements, decoded by position.
    fn decode_positional(
        &mut self,
        partial: &mut Partial<'static>,
        source: &Value,
        len: usize,
        slot: Slot,
    ) -> Result<()> {
        let Value::Array(items) = source else {
            return Err(UnstructuredErrorKind::ShapeMismatch(format!(
                "cannot restore {} from {}",
                partial.shape(),
                source.kind()
            ))
            .into());
        };
        if items.len() != len {
            return Err(UnstructuredErrorKind::ShapeMismatch(format!(
                "cannot restore {} from an array of {} elements, expected {len}",
                partial.shape(),
                items.len()
            ))
            .into());
        }

        let mark = self.ctx.mark();
        let inlined = self.ctx.set_inlined(false);
        for (index, item) in items.iter().enumerate() {
            self.ctx.push_index(index);
            match slot {
                Slot::Field => partial.begin_nth_field(index)?,
                Slot::Element => partial.begin_nth_element(index)?,
            };
            self.decode(partial, item)?;
            partial.end()?;
            self.ctx.truncate(mark);
        }
        self.ctx.set_inlined(inlined);

        Ok(())
    }

    fn decode_map(&mut self, partial: &mut Partial<'static>, entries: &Map) -> Result<()> {
        // begin_map does not push a frame, so there is no matching end()
        partial.begin_map()?;

        let mark = self.ctx.mark();
        let inlined = self.ctx.set_inlined(false);
        for (key, value) in entries {
            partial.begin_key()?;
            set_key(partial, key)?;
            partial.end()?;

            self.ctx.push_key(key);
            partial.begin_value()?;
            self.decode(partial, value)?;
            partial.end()?;
            self.ctx.truncate(mark);
        }
        self.ctx.set_inlined(inlined);

        Ok(())
    }
}

fn set_key(partial: &mut Partial<'static>, key: &str) -> Result<()> {
    let shape = partial.shape();
    if shape.inner.is_some() {
        partial.begin_inner()?;
        set_key(partial, key)?;
        partial.end()?;
        return Ok(());
    }
    if shape.id != String::SHAPE.id {
        return Err(UnstructuredErrorKind::ShapeMismatch(format!(
            "map keys must be strings, got {shape}"
        ))
        .into());
    }
    partial.set(key.to_owned())?;
    Ok(())
}

fn decode_enum(partial: &mut Partial<'static>, source: &Value, enum_type: &EnumType) -> Result<()> {
    let shape = partial.shape();
    let Value::String(name) = source else {
        return Err(UnstructuredErrorKind::ShapeMismatch(format!(
            "cannot restore {shape} from {}",
            source.kind()
        ))
        .into());
    };

    let Some(variant) = enum_type.variants.iter().find(|v| v.name == name.as_str()) else {
        return Err(UnstructuredErrorKind::UnknownVariant {
            type_name: shape.type_identifier,
            variant: name.clone(),
        }
        .into());
    };
    if !variant.data.fields.is_empty() {
        return Err(UnstructuredErrorKind::UnsupportedShape(format!(
            "{shape}::{} carries data; only unit variants have an unstructured form",
            variant.name
        ))
        .into());
    }

    log::trace!("Selecting variant {}", variant.name);
    partial.select_variant_named(variant.name)?;
    Ok(())
}

fn decode_bytes(partial: &mut Partial<'static>, source: &Value) -> Result<()> {
    let Value::String(encoded) = source else {
        return Err(UnstructuredErrorKind::ShapeMismatch(format!(
            "cannot restore slice from {}",
            source.kind()
        ))
        .into());
    };

    let bytes = if encoded.is_empty() {
        Vec::new()
    } else {
        BASE64_STANDARD.decode(encoded)?
    };

    partial.begin_list()?;
    for byte in bytes {
        partial.begin_list_item()?;
        partial.set(byte)?;
        partial.end()?;
    }
    Ok(())
}

fn decode_scalar(partial: &mut Partial<'static>, source: &Value) -> Result<()> {
    let shape = partial.shape();
    let mismatch = || {
        UnstructuredErrorKind::Coercion(format!("cannot convert {} to {shape}", source.kind()))
    };

    let Some(dst) = Family::of_shape(shape) else {
        return Err(UnstructuredErrorKind::UnsupportedShape(format!("scalar {shape}")).into());
    };
    let Some(src) = Family::of_value(source) else {
        return Err(mismatch().into());
    };
    if !coerce_allowed(src, dst, source) {
        return Err(mismatch().into());
    }

    match (source, dst) {
        (Value::String(s), _) => set_string(partial, s),
        (Value::Bool(b), _) => {
            partial.set(*b)?;
            Ok(())
        }
        (Value::Int(n), Family::Float) => set_float(partial, *n as f64),
        (Value::Int(n), _) => set_integer(partial, i128::from(*n)),
        (Value::Float(f), Family::Integer) => set_integer(partial, float_to_i128(*f, shape)?),
        (Value::Float(f), _) => set_float(partial, *f),
        _ => Err(mismatch().into()),
    }
}

/// Exact conversion of an integral float; values outside the `i128` range
/// would otherwise saturate.
fn float_to_i128(f: f64, shape: &Shape) -> Result<i128> {
    // -2^127 and 2^127 are exactly representable
    let bound = -(i128::MIN as f64);
    if !(-bound..bound).contains(&f) {
        return Err(UnstructuredErrorKind::Coercion(format!(
            "cannot convert {f} to {shape}: out of range"
        ))
        .into());
    }
    Ok(f as i128)
}

fn set_string(partial: &mut Partial<'static>, s: &str) -> Result<()> {
    let shape = partial.shape();
    if shape.id == char::SHAPE.id {
        let mut chars = s.chars();
        return match (chars.next(), chars.next()) {
            (Some(c), None) => {
                partial.set(c)?;
                Ok(())
            }
            _ => Err(UnstructuredErrorKind::Coercion(format!(
                "cannot convert string of length {} to char",
                s.chars().count()
            ))
            .into()),
        };
    }
    if shape.id != String::SHAPE.id {
        return Err(UnstructuredErrorKind::UnsupportedShape(format!(
            "cannot store an owned string into {shape}"
        ))
        .into());
    }
    partial.set(s.to_owned())?;
    Ok(())
}

fn set_integer(partial: &mut Partial<'static>, n: i128) -> Result<()> {
    let shape = partial.shape();
    let out_of_range =
        || UnstructuredErrorKind::Coercion(format!("cannot convert {n} to {shape}: out of range"));

    if shape.id == usize::SHAPE.id {
        partial.set(usize::try_from(n).map_err(|_| out_of_range())?)?;
        return Ok(());
    }
    if shape.id == isize::SHAPE.id {
        partial.set(isize::try_from(n).map_err(|_| out_of_range())?)?;
        return Ok(());
    }

    let size = match shape.layout {
        ShapeLayout::Sized(layout) => layout.size(),
        ShapeLayout::Unsized => {
            return Err(UnstructuredErrorKind::UnsupportedShape(format!(
                "cannot assign integer to unsized {shape}"
            ))
            .into());
        }
    };
    let Type::Primitive(PrimitiveType::Numeric(NumericType::Integer { signed })) = shape.ty else {
        return Err(UnstructuredErrorKind::UnsupportedShape(format!(
            "integer value requires an integer type, got {shape}"
        ))
        .into());
    };

    match (signed, size) {
        (false, 1) => partial.set(u8::try_from(n).map_err(|_| out_of_range())?)?,
        (false, 2) => partial.set(u16::try_from(n).map_err(|_| out_of_range())?)?,
        (false, 4) => partial.set(u32::try_from(n).map_err(|_| out_of_range())?)?,
        (false, 8) => partial.set(u64::try_from(n).map_err(|_| out_of_range())?)?,
        (false, 16) => partial.set(u128::try_from(n).map_err(|_| out_of_range())?)?,
        (true, 1) => partial.set(i8::try_from(n).map_err(|_| out_of_range())?)?,
        (true, 2) => partial.set(i16::try_from(n).map_err(|_| out_of_range())?)?,
        (true, 4) => partial.set(i32::try_from(n).map_err(|_| out_of_range())?)?,
        (true, 8) => partial.set(i64::try_from(n).map_err(|_| out_of_range())?)?,
        (true, 16) => partial.set(n)?,
        _ => {
            return Err(UnstructuredErrorKind::UnsupportedShape(format!(
                "unhandled integer type {shape} with size {size}"
            ))
            .into());
        }
    };
    Ok(())
}

fn set_float(partial: &mut Partial<'static>, n: f64) -> Result<()> {
    let shape = partial.shape();
    match shape.layout {
        ShapeLayout::Sized(layout) if layout.size() == 4 => partial.set(n as f32)?,
        ShapeLayout::Sized(layout) if layout.size() == 8 => partial.set(n)?,
        _ => {
            return Err(UnstructuredErrorKind::UnsupportedShape(format!(
                "unhandled float type {shape}"
            ))
            .into());
        }
    };
    Ok(())
}

/// Resets the current frame to its zero value.
///
/// Types with a `Default` impl use it. Everything else is built up by shape:
/// `None`, empty collections, the first unit variant, and structs and arrays
/// zeroed member by member.
fn set_zero(partial: &mut Partial<'static>) -> Result<()> {
    let shape = partial.shape();
    if shape.is(Characteristic::Default) {
        partial.set_default()?;
        return Ok(());
    }
    log::trace!("{shape} has no default, zeroing by shape");

    match &shape.def {
        Def::List(_) => {
            partial.begin_list()?;
            return Ok(());
        }
        Def::Map(_) => {
            partial.begin_map()?;
            return Ok(());
        }
        Def::Array(array_def) => {
            for index in 0..array_def.n {
                partial.begin_nth_element(index)?;
                set_zero(partial)?;
                partial.end()?;
            }
            return Ok(());
        }
        Def::Pointer(_) => {
            partial.begin_smart_ptr()?;
            set_zero(partial)?;
            partial.end()?;
            return Ok(());
        }
        _ => {}
    }

    if shape.inner.is_some() {
        partial.begin_inner()?;
        set_zero(partial)?;
        partial.end()?;
        return Ok(());
    }

    match &shape.ty {
        Type::User(UserType::Struct(struct_type)) => {
            for (index, field) in struct_type.fields.iter().enumerate() {
                partial.begin_nth_field(index)?;
                zero_field(partial, field)?;
                partial.end()?;
            }
            Ok(())
        }
        Type::User(UserType::Enum(enum_type)) => match enum_type.variants.first() {
            Some(variant) if variant.data.fields.is_empty() => {
                partial.select_nth_variant(0)?;
                Ok(())
            }
            _ => Err(UnstructuredErrorKind::UnsupportedShape(format!(
                "{shape} has no zero value: its first variant carries data"
            ))
            .into()),
        },
        _ => Err(UnstructuredErrorKind::UnsupportedShape(format!(
            "{shape} has no zero value"
        ))
        .into()),
    }
}

/// Zeroes a field frame, preferring a field-level `#[facet(default)]`.
fn zero_field(partial: &mut Partial<'static>, field: &Field) -> Result<()> {
    match field.vtable.default_fn {
        Some(default_fn) => {
            partial.set_field_default(default_fn)?;
            Ok(())
        }
        None => set_zero(partial),
    }
}

/// Whether a destination type can receive an unstructured object at the top level.
pub(crate) fn accepts_object(converter: &Converter, shape: &Shape) -> bool {
    if converter.hooks().decoder(shape.id).is_some() {
        return true;
    }
    match shape.def {
        Def::Map(_) => return true,
        Def::Option(_) | Def::Pointer(_) => return false,
        _ => {}
    }
    matches!(
        &shape.ty,
        Type::User(UserType::Struct(StructType {
            kind: StructKind::Struct | StructKind::Unit,
            ..
        }))
    )
}
