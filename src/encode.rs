//! Typed value to unstructured tree.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use facet_core::{Def, Facet, Shape, StructKind, Type, UserType};
use facet_reflect::{Peek, PeekStruct, ScalarType};

use crate::{
    Converter, Result, UnstructuredErrorKind,
    value::{Map, Value},
};

pub(crate) struct Encoder<'c> {
    converter: &'c Converter,
    depth: usize,
}

impl<'c> Encoder<'c> {
    pub(crate) fn new(converter: &'c Converter) -> Self {
        Self {
            converter,
            depth: 0,
        }
    }

    pub(crate) fn encode(&mut self, peek: Peek<'_, 'static>) -> Result<Value> {
        if self.depth >= self.converter.max_depth() {
            return Err(UnstructuredErrorKind::DepthExceeded(self.converter.max_depth()).into());
        }
        self.depth += 1;
        let result = self.encode_inner(peek);
        self.depth -= 1;
        result
    }

    fn encode_inner(&mut self, peek: Peek<'_, 'static>) -> Result<Value> {
        let shape = peek.shape();
        log::trace!("Encoding {shape} at depth {}", self.depth);

        if let Some(hook) = self.converter.hooks().encoder(shape.id) {
            log::trace!("Using custom encoder for {shape}");
            return hook(peek);
        }

        // Option<T> is the nullable pointer
        if let Ok(opt) = peek.into_option() {
            return match opt.value() {
                Some(inner) => self.encode(inner),
                None => Ok(Value::Null),
            };
        }

        if let Def::Pointer(_) = shape.def {
            let pointee = peek
                .into_pointer()
                .ok()
                .and_then(|ptr| ptr.borrow_inner());
            return match pointee {
                Some(inner) => self.encode(inner),
                None => Ok(Value::Null),
            };
        }

        // Transparent wrappers encode as what they wrap
        if shape.inner.is_some() {
            let inner = peek.innermost_peek();
            if inner.shape().id != shape.id {
                return self.encode(inner);
            }
        }

        match shape.ty {
            Type::User(UserType::Struct(struct_type)) => {
                let peek_struct = peek.into_struct()?;
                return match struct_type.kind {
                    StructKind::Tuple | StructKind::TupleStruct => {
                        self.encode_tuple(shape, peek_struct)
                    }
                    _ => {
                        let mut map = Map::new();
                        self.encode_struct_into(shape, peek_struct, &mut map)?;
                        Ok(Value::Object(map))
                    }
                };
            }
            Type::User(UserType::Enum(_)) => return self.encode_enum(peek),
            _ => {}
        }

        match shape.def {
            Def::Scalar => encode_scalar(peek),
            Def::List(list_def) if list_def.t().id == u8::SHAPE.id => encode_bytes(peek),
            Def::List(_) | Def::Array(_) => {
                let list = peek.into_list_like()?;
                let mut items = Vec::new();
                for item in list.iter() {
                    items.push(self.encode(item)?);
                }
                Ok(Value::Array(items))
            }
            Def::Map(_) => {
                let map_peek = peek.into_map()?;
                let mut map = Map::new();
                for (key, value) in map_peek.iter() {
                    let key = key.innermost_peek();
                    let Some(key) = key.as_str() else {
                        return Err(UnstructuredErrorKind::ShapeMismatch(format!(
                            "map keys must be strings, got {}",
                            key.shape()
                        ))
                        .into());
                    };
                    map.insert(key.to_owned(), self.encode(value)?);
                }
                Ok(Value::Object(map))
            }
            _ => Err(UnstructuredErrorKind::UnsupportedShape(format!("{shape}")).into()),
        }
    }

    /// Writes the fields of a struct into `dest`, promoting inlined fields.
    fn encode_struct_into(
        &mut self,
        shape: &'static Shape,
        peek_struct: PeekStruct<'_, 'static>,
        dest: &mut Map,
    ) -> Result<()> {
        let cache = self.converter.field_cache();

        for (index, field) in peek_struct.ty().fields.iter().enumerate() {
            let info = cache.resolve(shape, index, field);
            if info.excluded {
                log::trace!("Skipping excluded field {}", field.name);
                continue;
            }

            let Ok(field_peek) = peek_struct.field(index) else {
                return Err(UnstructuredErrorKind::UnsupportedShape(format!(
                    "cannot read field {} of {shape}",
                    field.name
                ))
                .into());
            };

            if info.omit_empty && is_zero(field_peek) {
                log::trace!("Omitting empty field {}", info.name);
                continue;
            }

            if info.inline {
                self.encode_inline(field_peek, dest)?;
                continue;
            }

            let value = self.encode(field_peek)?;
            // A hook may report a non-zero value as null
            if info.omit_empty && value.is_null() {
                log::trace!("Omitting field {} encoded as null", info.name);
                continue;
            }
            dest.insert(info.name.clone(), value);
        }

        Ok(())
    }

    fn encode_inline(&mut self, peek: Peek<'_, 'static>, dest: &mut Map) -> Result<()> {
        log::trace!("Inlining {} into parent", peek.shape());
        match self.encode(peek)? {
            Value::Object(fields) => {
                dest.extend(fields);
                Ok(())
            }
            Value::Null => Ok(()),
            other => Err(UnstructuredErrorKind::ShapeMismatch(format!(
                "cannot inline {} into an object",
                other.kind()
            ))
            .into()),
        }
    }

    fn encode_tuple(
        &mut self,
        shape: &'static Shape,
        peek_struct: PeekStruct<'_, 'static>,
    ) -> Result<Value> {
        let mut items = Vec::new();
        for index in 0..peek_struct.ty().fields.len() {
            let item = peek_struct.field(index).map_err(|_| {
                UnstructuredErrorKind::UnsupportedShape(format!(
                    "cannot read element {index} of {shape}"
                ))
            })?;
            items.push(self.encode(item)?);
        }
        Ok(Value::Array(items))
    }

    fn encode_enum(&mut self, peek: Peek<'_, 'static>) -> Result<Value> {
        let shape = peek.shape();
        let peek_enum = peek.into_enum()?;
        let variant = peek_enum.active_variant().map_err(|e| {
            UnstructuredErrorKind::UnsupportedShape(format!("{shape}: {e:?}"))
        })?;
        if !variant.data.fields.is_empty() {
            return Err(UnstructuredErrorKind::UnsupportedShape(format!(
                "{shape}::{} carries data; only unit variants have an unstructured form",
                variant.name
            ))
            .into());
        }
        Ok(Value::String(variant.name.to_owned()))
    }
}

fn encode_bytes(peek: Peek<'_, 'static>) -> Result<Value> {
    let list = peek.into_list_like()?;
    let mut bytes = Vec::with_capacity(list.len());
    for item in list.iter() {
        bytes.push(*item.get::<u8>()?);
    }
    Ok(Value::String(BASE64_STANDARD.encode(bytes)))
}

fn encode_scalar(peek: Peek<'_, 'static>) -> Result<Value> {
    if let Some(s) = peek.as_str() {
        return Ok(Value::String(s.to_owned()));
    }

    let value = match peek.scalar_type() {
        Some(ScalarType::Unit) => Value::Null,
        Some(ScalarType::Bool) => Value::Bool(*peek.get::<bool>()?),
        Some(ScalarType::Char) => Value::String(peek.get::<char>()?.to_string()),

        Some(ScalarType::I8) => Value::Int((*peek.get::<i8>()?).into()),
        Some(ScalarType::I16) => Value::Int((*peek.get::<i16>()?).into()),
        Some(ScalarType::I32) => Value::Int((*peek.get::<i32>()?).into()),
        Some(ScalarType::I64) => Value::Int(*peek.get::<i64>()?),
        Some(ScalarType::I128) => signed_to_value(*peek.get::<i128>()?)?,

        Some(ScalarType::U8) => Value::Int((*peek.get::<u8>()?).into()),
        Some(ScalarType::U16) => Value::Int((*peek.get::<u16>()?).into()),
        Some(ScalarType::U32) => Value::Int((*peek.get::<u32>()?).into()),
        Some(ScalarType::U64) => unsigned_to_value((*peek.get::<u64>()?).into())?,
        Some(ScalarType::U128) => unsigned_to_value(*peek.get::<u128>()?)?,

        Some(ScalarType::F32) => Value::Float((*peek.get::<f32>()?).into()),
        Some(ScalarType::F64) => Value::Float(*peek.get::<f64>()?),

        _ => {
            if let Ok(v) = peek.get::<usize>() {
                unsigned_to_value(*v as u128)?
            } else if let Ok(v) = peek.get::<isize>() {
                Value::Int(*v as i64)
            } else {
                return Err(UnstructuredErrorKind::UnsupportedShape(format!(
                    "scalar {}",
                    peek.shape()
                ))
                .into());
            }
        }
    };
    Ok(value)
}

fn unsigned_to_value(n: u128) -> Result<Value> {
    match i64::try_from(n) {
        Ok(n) => Ok(Value::Int(n)),
        Err(_) => Err(UnstructuredErrorKind::Overflow(n).into()),
    }
}

fn signed_to_value(n: i128) -> Result<Value> {
    match i64::try_from(n) {
        Ok(n) => Ok(Value::Int(n)),
        Err(_) => Err(UnstructuredErrorKind::Coercion(format!(
            "signed value {n} does not fit into int64 (overflow)"
        ))
        .into()),
    }
}

/// Whether a field holds the zero value for omit-if-empty purposes.
///
/// Structs and enums are never zero.
fn is_zero(peek: Peek<'_, 'static>) -> bool {
    let shape = peek.shape();

    if shape.id == Value::SHAPE.id {
        return peek.get::<Value>().is_ok_and(Value::is_null);
    }
    if let Ok(opt) = peek.into_option() {
        return opt.is_none();
    }
    if let Some(s) = peek.as_str() {
        return s.is_empty();
    }

    match shape.def {
        Def::List(_) | Def::Array(_) => {
            peek.into_list_like().is_ok_and(|list| list.len() == 0)
        }
        Def::Map(_) => peek.into_map().is_ok_and(|map| map.len() == 0),
        Def::Scalar => match encode_scalar(peek) {
            Ok(Value::Bool(b)) => !b,
            Ok(Value::Int(n)) => n == 0,
            Ok(Value::Float(n)) => n == 0.0,
            Ok(Value::Null) => true,
            _ => false,
        },
        _ if shape.inner.is_some() && !matches!(shape.def, Def::Pointer(_)) => {
            let inner = peek.innermost_peek();
            inner.shape().id != shape.id && is_zero(inner)
        }
        _ => false,
    }
}
