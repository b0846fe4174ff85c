use std::{
    error::Error,
    fmt::{self, Display},
};

use facet_reflect::ReflectError;

use crate::strict::StrictDecodingError;

/// Error type for unstructured conversions.
#[derive(Debug)]
pub struct UnstructuredError {
    kind: UnstructuredErrorKind,
}

impl UnstructuredError {
    /// Returns a reference to the error kind for detailed error inspection.
    pub fn kind(&self) -> &UnstructuredErrorKind {
        &self.kind
    }

    /// Builds a hook failure carrying a free-form message.
    pub fn custom(msg: impl Into<String>) -> Self {
        UnstructuredErrorKind::Custom(msg.into()).into()
    }

    /// Whether this is the composite error produced by strict decoding.
    pub fn is_strict_decoding(&self) -> bool {
        matches!(self.kind, UnstructuredErrorKind::StrictDecoding(_))
    }

    /// The individual unknown-field errors, if this is a strict decoding error.
    pub fn strict_errors(&self) -> Option<&StrictDecodingError> {
        match &self.kind {
            UnstructuredErrorKind::StrictDecoding(e) => Some(e),
            _ => None,
        }
    }
}

impl Display for UnstructuredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = &self.kind;
        write!(f, "{kind}")
    }
}

impl Error for UnstructuredError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.kind {
            UnstructuredErrorKind::Base64(e) => Some(e),
            UnstructuredErrorKind::StrictDecoding(e) => Some(e),
            _ => None,
        }
    }
}

impl<K: Into<UnstructuredErrorKind>> From<K> for UnstructuredError {
    fn from(value: K) -> Self {
        let kind = value.into();
        UnstructuredError { kind }
    }
}

/// Detailed classification of conversion errors.
#[derive(Debug)]
#[non_exhaustive]
pub enum UnstructuredErrorKind {
    /// The top-level argument cannot be converted at all.
    InvalidArgument(String),
    /// The source tree's kind cannot populate the destination's shape.
    ShapeMismatch(String),
    /// A primitive could not be converted across coercion families, or would lose information.
    Coercion(String),
    /// An unsigned value does not fit into a signed 64-bit integer.
    Overflow(u128),
    /// An enum variant name that the destination type does not declare.
    UnknownVariant {
        /// The enum type.
        type_name: &'static str,
        /// The variant name found in the source.
        variant: String,
    },
    /// A shape outside the unstructured data model.
    UnsupportedShape(String),
    /// A byte-sequence string was not valid base64.
    Base64(base64::DecodeError),
    /// Recursion went deeper than the configured bound.
    DepthExceeded(usize),
    /// Error raised by a custom conversion hook.
    Custom(String),
    /// Error from the reflection system.
    Reflect(ReflectError),
    /// One or more unknown fields were found while decoding in strict mode.
    StrictDecoding(StrictDecodingError),
}

impl Display for UnstructuredErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnstructuredErrorKind::InvalidArgument(msg) => write!(f, "{msg}"),
            UnstructuredErrorKind::ShapeMismatch(msg) => write!(f, "{msg}"),
            UnstructuredErrorKind::Coercion(msg) => write!(f, "{msg}"),
            UnstructuredErrorKind::Overflow(value) => {
                write!(f, "unsigned value {value} does not fit into int64 (overflow)")
            }
            UnstructuredErrorKind::UnknownVariant { type_name, variant } => {
                write!(f, "unrecognized variant \"{variant}\" for {type_name}")
            }
            UnstructuredErrorKind::UnsupportedShape(msg) => write!(f, "unsupported shape: {msg}"),
            UnstructuredErrorKind::Base64(e) => write!(f, "invalid base64 byte string: {e}"),
            UnstructuredErrorKind::DepthExceeded(max) => {
                write!(f, "maximum nesting depth of {max} exceeded")
            }
            UnstructuredErrorKind::Custom(msg) => write!(f, "{msg}"),
            UnstructuredErrorKind::Reflect(reflect_error) => write!(f, "{reflect_error}"),
            UnstructuredErrorKind::StrictDecoding(e) => write!(f, "{e}"),
        }
    }
}

impl From<ReflectError> for UnstructuredErrorKind {
    fn from(value: ReflectError) -> Self {
        Self::Reflect(value)
    }
}

impl From<base64::DecodeError> for UnstructuredErrorKind {
    fn from(value: base64::DecodeError) -> Self {
        Self::Base64(value)
    }
}

impl From<StrictDecodingError> for UnstructuredErrorKind {
    fn from(value: StrictDecodingError) -> Self {
        Self::StrictDecoding(value)
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, UnstructuredError>;
