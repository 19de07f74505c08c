//! Error types for schema loading and schema-driven decoding.

use std::fmt;
use std::num::ParseIntError;
use std::path::PathBuf;

// ─── Schema text ─────────────────────────────────────────────────────────────

/// Errors produced while parsing a single parameter token.
#[derive(Clone, Debug, PartialEq)]
pub enum ParamParseError {
    /// An empty string was encountered where a name/type was expected.
    Empty,
    /// A `{X:Type}` generic definition. Not a failure: the caller records the
    /// name and moves on.
    TypeDef { name: String },
    /// A `{…}` block that isn't a valid type definition, or a reference to a
    /// generic/flags field that was never declared.
    MissingDef,
    /// A flag expression (`name.N?Type`) was malformed.
    InvalidFlag,
    /// A generic `<…>` argument was not closed.
    InvalidGeneric,
    /// A token with no `:type`, e.g. the built-in `int ? = Int`.
    NotImplemented,
}

impl fmt::Display for ParamParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty token"),
            Self::TypeDef { name } => write!(f, "generic type definition: {name}"),
            Self::MissingDef => write!(f, "undeclared generic or flags field"),
            Self::InvalidFlag => write!(f, "invalid flag expression"),
            Self::InvalidGeneric => write!(f, "unclosed generic argument"),
            Self::NotImplemented => write!(f, "parameter without `:type`"),
        }
    }
}

impl std::error::Error for ParamParseError {}

/// Errors produced while parsing one complete TL definition.
#[derive(Debug, PartialEq)]
pub enum ParseError {
    Empty,
    /// No `= Type` was found.
    MissingType,
    /// The name (before `=`) was missing or had empty namespace components.
    MissingName,
    /// The `#id` hex literal was unparseable.
    InvalidId(ParseIntError),
    InvalidParam(ParamParseError),
    /// Syntax this parser does not model (built-in primitive declarations).
    NotImplemented,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty definition"),
            Self::MissingType => write!(f, "missing `= Type`"),
            Self::MissingName => write!(f, "missing or malformed name"),
            Self::InvalidId(e) => write!(f, "invalid constructor id: {e}"),
            Self::InvalidParam(e) => write!(f, "invalid parameter: {e}"),
            Self::NotImplemented => write!(f, "unsupported TL syntax"),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidId(e) => Some(e),
            Self::InvalidParam(e) => Some(e),
            _ => None,
        }
    }
}

// ─── Schema loading ──────────────────────────────────────────────────────────

/// Failure to build a layer's tables.
#[derive(Debug)]
pub enum SchemaError {
    /// Reading a schema file failed.
    Io { path: PathBuf, source: std::io::Error },
    /// The `// LAYER N` header is missing or disagrees with the directory name.
    LayerMismatch { path: PathBuf, expected: i32, found: Option<i32> },
    /// A `%Type` reference names a type with zero or several constructors.
    AmbiguousBareType { constructor: String, ty: String },
    /// A bare field names a constructor its table does not define.
    UnknownBareType { constructor: String, ty: String },
    /// The layers directory contains no `<N>/api.tl` at all.
    NoLayers { path: PathBuf },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "reading {}: {source}", path.display()),
            Self::LayerMismatch { path, expected, found: Some(found) } => write!(
                f, "{} declares layer {found}, expected {expected}", path.display()
            ),
            Self::LayerMismatch { path, expected, found: None } => write!(
                f, "{} has no `// LAYER` header (expected {expected})", path.display()
            ),
            Self::AmbiguousBareType { constructor, ty } => write!(
                f, "{constructor}: `%{ty}` does not name exactly one constructor"
            ),
            Self::UnknownBareType { constructor, ty } => write!(
                f, "{constructor}: bare type `{ty}` is not defined"
            ),
            Self::NoLayers { path } => write!(f, "no layers found under {}", path.display()),
        }
    }
}

impl std::error::Error for SchemaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// The requested layer has no loaded tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnsupportedLayer(pub i32);

impl fmt::Display for UnsupportedLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer {} is not supported", self.0)
    }
}

impl std::error::Error for UnsupportedLayer {}

// ─── Decoding ────────────────────────────────────────────────────────────────

/// Errors that can occur while decoding a value.
#[derive(Clone, Debug, PartialEq)]
pub enum DecodeError {
    /// Ran out of bytes before the value was fully read.
    BufferExhausted,
    /// A constructor id unknown to both tables of the active layer.
    ///
    /// `position` is the offset of the id itself and `remaining` holds every
    /// byte from there to the end of the buffer.
    TypeNotFound { id: u32, position: usize, remaining: Vec<u8> },
    /// Nesting went deeper than the configured cap.
    MaxDepthExceeded { limit: usize },
    /// A bare field names a constructor the layer does not define.
    UnknownBareType(String),
}

impl DecodeError {
    /// The offending constructor id, if this is a `TypeNotFound`.
    pub fn constructor_id(&self) -> Option<u32> {
        match self {
            Self::TypeNotFound { id, .. } => Some(*id),
            _ => None,
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferExhausted => write!(f, "unexpected end of buffer"),
            Self::TypeNotFound { id, position, remaining } => write!(
                f,
                "type {id:#010x} not found at offset {position} ({} bytes left)",
                remaining.len()
            ),
            Self::MaxDepthExceeded { limit } => write!(f, "nesting deeper than {limit}"),
            Self::UnknownBareType(name) => write!(f, "unknown bare type `{name}`"),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Specialized `Result` for decoding.
pub type Result<T> = std::result::Result<T, DecodeError>;

// ─── Encoding ────────────────────────────────────────────────────────────────

/// A [`crate::Value`] that does not fit the field plan it is encoded with.
#[derive(Clone, Debug, PartialEq)]
pub enum EncodeError {
    /// No constructor with this id (or bare name) in the layer.
    UnknownConstructor(String),
    /// A non-conditional field is absent.
    MissingField { constructor: String, field: String },
    /// A field holds a value of the wrong variant.
    TypeMismatch { field: String, expected: &'static str },
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownConstructor(c) => write!(f, "unknown constructor {c}"),
            Self::MissingField { constructor, field } => write!(f, "{constructor}.{field} is missing"),
            Self::TypeMismatch { field, expected } => write!(f, "{field}: expected {expected}"),
        }
    }
}

impl std::error::Error for EncodeError {}
