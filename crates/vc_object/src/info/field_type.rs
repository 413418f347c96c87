use core::fmt;
use std::sync::Arc;

use crate::info::{EnumInfo, TypeDescriptor};
use crate::tags::{Tag, TagContainer};
use crate::value::Value;

// -----------------------------------------------------------------------------
// FieldType

/// Declared kind of a field or container element.
///
/// Whether an [`Object`](FieldType::Object) is embedded by value or stored as
/// a reference is decided by [`FieldFlags::INSTANCED`] on the owning field,
/// containers pass that flag on to their elements.
///
/// [`FieldFlags::INSTANCED`]: crate::info::FieldFlags::INSTANCED
#[derive(Clone, Debug)]
pub enum FieldType {
    Bool,
    Int,
    UInt,
    Float,
    String,
    Enum(Arc<EnumInfo>),
    Struct(Arc<TypeDescriptor>),
    Array(Box<FieldType>),
    Set(Box<FieldType>),
    Map(Box<FieldType>, Box<FieldType>),
    /// An object of the given type or one of its descendants.
    Object(Arc<TypeDescriptor>),
    /// A reference to any object implementing the named interface.
    Interface(Arc<str>),
    /// The identity of an object of the given type, kept as a path.
    ///
    /// Decoding does not resolve or load the target, it is looked up on
    /// demand.
    SoftObject(Arc<TypeDescriptor>),
    Tag,
    TagContainer,
}

impl FieldType {
    /// Creates an array type.
    #[inline]
    pub fn array(element: FieldType) -> Self {
        Self::Array(Box::new(element))
    }

    /// Creates a set type.
    #[inline]
    pub fn set(element: FieldType) -> Self {
        Self::Set(Box::new(element))
    }

    /// Creates a map type.
    #[inline]
    pub fn map(key: FieldType, value: FieldType) -> Self {
        Self::Map(Box::new(key), Box::new(value))
    }

    /// Creates an interface type.
    #[inline]
    pub fn interface(name: &str) -> Self {
        Self::Interface(Arc::from(name))
    }

    /// Returns the implicit default value of this type.
    ///
    /// `instanced` selects between an empty embedded object and an empty
    /// reference for object types.
    pub fn default_value(&self, instanced: bool) -> Value {
        match self {
            Self::Bool => Value::Bool(false),
            Self::Int => Value::Int(0),
            Self::UInt => Value::UInt(0),
            Self::Float => Value::Float(0.0),
            Self::String => Value::String(String::new()),
            Self::Enum(info) => Value::Enum(info.default_value()),
            Self::Struct(ty) => Value::Struct(Box::new(ty.default_instance())),
            Self::Array(_) => Value::Array(Vec::new()),
            Self::Set(_) => Value::Set(Vec::new()),
            Self::Map(..) => Value::Map(Vec::new()),
            Self::Object(_) if instanced => Value::Embedded(None),
            Self::Object(_) | Self::Interface(_) => Value::Reference(None),
            Self::SoftObject(_) => Value::SoftPath(None),
            Self::Tag => Value::Tag(Tag::none()),
            Self::TagContainer => Value::Tags(TagContainer::new()),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => f.write_str("bool"),
            Self::Int => f.write_str("int"),
            Self::UInt => f.write_str("uint"),
            Self::Float => f.write_str("float"),
            Self::String => f.write_str("string"),
            Self::Enum(info) => f.write_str(info.path()),
            Self::Struct(ty) | Self::Object(ty) => f.write_str(ty.path()),
            Self::Array(element) => write!(f, "array<{element}>"),
            Self::Set(element) => write!(f, "set<{element}>"),
            Self::Map(key, value) => write!(f, "map<{key}, {value}>"),
            Self::Interface(name) => write!(f, "interface<{name}>"),
            Self::SoftObject(ty) => write!(f, "soft<{}>", ty.path()),
            Self::Tag => f.write_str("tag"),
            Self::TagContainer => f.write_str("tag container"),
        }
    }
}
