use core::fmt;

use serde_json::Value as Json;
use thiserror::Error;
use uuid::Uuid;
use vc_object::version::ToolchainVersion;

// -----------------------------------------------------------------------------
// FieldPath

/// One step of a [`FieldPath`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathSegment {
    /// A named field.
    Field(String),
    /// An array element, or the element of a fixed array.
    Index(usize),
    /// A map entry, by its JSON key.
    Key(String),
}

/// Trail from the document root to a value, e.g. `items[2].name`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldPath(pub Vec<PathSegment>);

impl FieldPath {
    /// Returns `true` for the document root.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the segments from the root.
    #[inline]
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }
        for (index, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Field(name) if index == 0 => f.write_str(name)?,
                PathSegment::Field(name) => write!(f, ".{name}")?,
                PathSegment::Index(i) => write!(f, "[{i}]")?,
                PathSegment::Key(key) => write!(f, "[{key:?}]")?,
            }
        }
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// FieldError

/// Why a single field could not be decoded.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FieldErrorKind {
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: String,
        found: &'static str,
    },
    #[error("`{name}` is not a constant of enum `{enum_name}`")]
    UnknownEnumName { enum_name: String, name: String },
    #[error("`{text}` is not a valid `{type_name}`")]
    MalformedText { type_name: String, text: String },
    #[error("reference `{reference}` cannot be resolved")]
    UnresolvableReference { reference: String },
    #[error("an object of type `{found}` cannot be stored as `{expected}`")]
    NotAssignable { expected: String, found: String },
    #[error("found {found} elements, the fixed array holds exactly {capacity}")]
    ArraySizeMismatch { found: usize, capacity: usize },
    #[error("{value} is out of range for {expected}")]
    OutOfRange { value: String, expected: &'static str },
    #[error("tag `{tag}` is not registered")]
    InvalidTag { tag: String },
    #[error("the field is missing from the document")]
    MissingField,
    /// A custom decode processor refused the value.
    #[error("{0}")]
    Rejected(String),
}

/// A field-scoped decode failure.
///
/// In lenient mode the field keeps its previous value and the error is
/// recorded in [`DecodeReport::recovered`]; in strict mode it aborts the
/// document.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{path}: {kind}")]
pub struct FieldError {
    pub path: FieldPath,
    pub kind: FieldErrorKind,
}

// -----------------------------------------------------------------------------
// IntegrityWarning

/// A non-fatal anomaly repaired while encoding or decoding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IntegrityWarning {
    #[error("{path}: found {found} elements for a fixed array of {capacity}, excess elements were dropped")]
    ExcessElementsTrimmed {
        path: FieldPath,
        found: usize,
        capacity: usize,
    },
    #[error("{path}: expected an array of {capacity} elements, the single value was stored in the first one")]
    ScalarIntoFixedArray { path: FieldPath, capacity: usize },
    #[error("{path}: type `{tag}` does not exist, `{declared}` was used instead")]
    UnknownClassTag {
        path: FieldPath,
        tag: String,
        declared: String,
    },
    #[error("{path}: type `{tag}` is not a concrete `{declared}`, `{declared}` was used instead")]
    IncompatibleClassTag {
        path: FieldPath,
        tag: String,
        declared: String,
    },
    #[error("{path}: type `{class}` is abstract, the object was left empty")]
    AbstractClassIgnored { path: FieldPath, class: String },
    #[error("{path}: `{object}` does not implement `{interface}`, the reference was left empty")]
    InterfaceNotImplemented {
        path: FieldPath,
        object: String,
        interface: String,
    },
    #[error("{path}: tag `{tag}` is not registered and was dropped")]
    InvalidTagDropped { path: FieldPath, tag: String },
    #[error("{path}: map key {index} has no text form, it was written as `{placeholder}`")]
    DegenerateMapKey {
        path: FieldPath,
        index: usize,
        placeholder: String,
    },
}

/// Everything repaired or recovered during one decode.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodeReport {
    pub warnings: Vec<IntegrityWarning>,
    /// Field errors that were recovered from in lenient mode.
    pub recovered: Vec<FieldError>,
}

impl DecodeReport {
    /// Returns `true` if nothing was repaired or recovered.
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty() && self.recovered.is_empty()
    }
}

// -----------------------------------------------------------------------------
// EncodeError

/// A value could not be encoded.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EncodeError {
    /// The live value does not fit the declared field type.
    #[error("{path}: expected {expected}, found a value of kind `{found}`")]
    ValueMismatch {
        path: FieldPath,
        expected: String,
        found: &'static str,
    },
    /// A custom encode processor refused the value.
    #[error("{path}: {message}")]
    Rejected { path: FieldPath, message: String },
    #[error("failed to format document: {0}")]
    Format(#[from] serde_json::Error),
}

// -----------------------------------------------------------------------------
// EnvelopeError

/// A document-fatal decode failure.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EnvelopeError {
    #[error("malformed JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("the document root is not a JSON object")]
    NotAnObject,
    #[error("the document has no `Data` object")]
    MissingData,
    #[error("the document has no `Class`")]
    MissingClass,
    #[error("class `{0}` is not registered")]
    UnknownClass(String),
    #[error("document class `{found}` does not match `{expected}`")]
    ClassMismatch { found: String, expected: String },
    #[error("class `{0}` is abstract")]
    AbstractClass(String),
    #[error("`{0}` is not a valid engine version")]
    InvalidEngineVersion(String),
    #[error("document was written by {found}, which is not compatible with {current} (compatible with {compatible})")]
    IncompatibleEngineVersion {
        found: ToolchainVersion,
        current: ToolchainVersion,
        compatible: ToolchainVersion,
    },
    #[error("custom version {name} ({guid}) revision {found} is outside the supported range {oldest}..={current}")]
    UnsupportedCustomVersion {
        guid: Uuid,
        name: String,
        found: i32,
        oldest: i32,
        current: i32,
    },
    #[error("invalid custom version entry `{key}`: {value}")]
    InvalidCustomVersion { key: String, value: Json },
    #[error("failed to decode `{class}`: {source}")]
    Field {
        class: String,
        #[source]
        source: FieldError,
    },
    #[error("post-import of `{class}` failed: {message}")]
    PostImport { class: String, message: String },
}

// -----------------------------------------------------------------------------
// Helpers

/// Returns a short name of the JSON value kind, used in messages.
pub(crate) fn json_kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

// -----------------------------------------------------------------------------
// Tests
