//! Live field values.
//!
//! [`Value`] is the in-memory counterpart of a [`FieldType`]; an [`Instance`]
//! holds one value per field of its [`TypeDescriptor`].

use std::sync::Arc;

use crate::ValueError;
use crate::info::{FieldDescriptor, FieldType, TypeDescriptor};
use crate::object::ObjectHandle;
use crate::path::ObjectPath;
use crate::tags::{Tag, TagContainer};

// -----------------------------------------------------------------------------
// Value

/// A live field value.
#[derive(Clone, Debug)]
pub enum Value {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    /// Underlying numeric value of an enum constant.
    Enum(i64),
    Struct(Box<Instance>),
    Array(Vec<Value>),
    /// Distinct elements in insertion order.
    Set(Vec<Value>),
    /// Distinct keys in insertion order.
    Map(Vec<(Value, Value)>),
    /// An object owned by the field and embedded by value.
    Embedded(Option<Box<Instance>>),
    /// A shared object referenced by identity.
    Reference(Option<ObjectHandle>),
    /// The identity of an object that may not be resident.
    SoftPath(Option<ObjectPath>),
    Tag(Tag),
    Tags(TagContainer),
}

impl Value {
    /// Returns a short name of the value kind, used in messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Enum(_) => "enum",
            Self::Struct(_) => "struct",
            Self::Array(_) => "array",
            Self::Set(_) => "set",
            Self::Map(_) => "map",
            Self::Embedded(_) => "embedded object",
            Self::Reference(_) => "object reference",
            Self::SoftPath(_) => "soft object path",
            Self::Tag(_) => "tag",
            Self::Tags(_) => "tag container",
        }
    }

    /// Returns `true` if the value can be stored in a slot of type `ty`.
    ///
    /// Container elements are checked recursively. References are checked
    /// against the type of the referenced object.
    pub fn fits(&self, ty: &FieldType, instanced: bool) -> bool {
        match (ty, self) {
            (FieldType::Bool, Self::Bool(_))
            | (FieldType::Int, Self::Int(_))
            | (FieldType::UInt, Self::UInt(_))
            | (FieldType::Float, Self::Float(_))
            | (FieldType::String, Self::String(_))
            | (FieldType::Enum(_), Self::Enum(_))
            | (FieldType::Tag, Self::Tag(_))
            | (FieldType::TagContainer, Self::Tags(_))
            | (FieldType::SoftObject(_), Self::SoftPath(_)) => true,
            (FieldType::Struct(expected), Self::Struct(instance)) => Arc::ptr_eq(expected, instance.ty()),
            (FieldType::Array(element), Self::Array(items))
            | (FieldType::Set(element), Self::Set(items)) => {
                items.iter().all(|v| v.fits(element, instanced))
            }
            (FieldType::Map(key, value), Self::Map(entries)) => entries
                .iter()
                .all(|(k, v)| k.fits(key, false) && v.fits(value, instanced)),
            (FieldType::Object(expected), Self::Embedded(object)) if instanced => object
                .as_ref()
                .is_none_or(|o| o.ty().is_child_of(expected)),
            (FieldType::Object(expected), Self::Reference(object)) if !instanced => object
                .as_ref()
                .is_none_or(|o| o.ty().is_child_of(expected)),
            (FieldType::Interface(name), Self::Reference(object)) => {
                object.as_ref().is_none_or(|o| o.ty().implements(name))
            }
            _ => false,
        }
    }

    /// Structural equality.
    ///
    /// Sets and maps compare regardless of order, references compare by
    /// identity and embedded objects by type and fields.
    pub fn identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) | (Self::Enum(a), Self::Enum(b)) => a == b,
            (Self::UInt(a), Self::UInt(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Struct(a), Self::Struct(b)) => a.identical(b),
            (Self::Array(a), Self::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.identical(y))
            }
            (Self::Set(a), Self::Set(b)) => {
                a.len() == b.len() && a.iter().all(|x| b.iter().any(|y| x.identical(y)))
            }
            (Self::Map(a), Self::Map(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(ka, va)| {
                        b.iter().any(|(kb, vb)| ka.identical(kb) && va.identical(vb))
                    })
            }
            (Self::Embedded(a), Self::Embedded(b)) => match (a, b) {
                (None, None) => true,
                (Some(a), Some(b)) => a.identical(b),
                _ => false,
            },
            (Self::Reference(a), Self::Reference(b)) => match (a, b) {
                (None, None) => true,
                (Some(a), Some(b)) => Arc::ptr_eq(a, b) || a.path() == b.path(),
                _ => false,
            },
            (Self::Tag(a), Self::Tag(b)) => a == b,
            (Self::Tags(a), Self::Tags(b)) => a == b,
            (Self::SoftPath(a), Self::SoftPath(b)) => a == b,
            _ => false,
        }
    }
}

// -----------------------------------------------------------------------------
// Conversions

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                #[inline]
                fn from(value: $ty) -> Self {
                    Self::$variant(value.into())
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i32 => Int,
    i64 => Int,
    u32 => UInt,
    u64 => UInt,
    f32 => Float,
    f64 => Float,
    String => String,
    &str => String,
    Tag => Tag,
    TagContainer => Tags,
}

/// Struct instances become [`Value::Struct`], object instances become
/// embedded objects.
impl From<Instance> for Value {
    #[inline]
    fn from(instance: Instance) -> Self {
        if instance.ty().is_object() {
            Self::Embedded(Some(Box::new(instance)))
        } else {
            Self::Struct(Box::new(instance))
        }
    }
}

impl From<ObjectHandle> for Value {
    #[inline]
    fn from(object: ObjectHandle) -> Self {
        Self::Reference(Some(object))
    }
}

impl From<ObjectPath> for Value {
    #[inline]
    fn from(path: ObjectPath) -> Self {
        Self::SoftPath(Some(path))
    }
}

// -----------------------------------------------------------------------------
// Instance

/// Field values of one struct or object, in field order.
///
/// The type of an instance never changes; every value always fits its field.
///
/// # Examples
///
/// ```
/// use vc_object::info::{FieldDescriptor, FieldType, TypeBuilder};
/// use vc_object::value::Value;
///
/// let point = TypeBuilder::structure("Point")
///     .field(FieldDescriptor::new("x", FieldType::Int))
///     .field(FieldDescriptor::new("y", FieldType::Int))
///     .build()
///     .unwrap();
///
/// let mut p = point.default_instance();
/// p.set("x", 5).unwrap();
///
/// assert!(matches!(p.get("x"), Some(Value::Int(5))));
/// assert!(p.set("x", "five").is_err());
/// assert!(!p.identical(&point.default_instance()));
///
/// p.reset();
/// assert!(p.identical(&point.default_instance()));
/// ```
#[derive(Clone, Debug)]
pub struct Instance {
    ty: Arc<TypeDescriptor>,
    values: Vec<Value>,
}

impl Instance {
    pub(crate) fn from_parts(ty: Arc<TypeDescriptor>, values: Vec<Value>) -> Self {
        debug_assert_eq!(ty.field_len(), values.len());
        Self { ty, values }
    }

    /// Returns the type of the instance.
    #[inline]
    pub fn ty(&self) -> &Arc<TypeDescriptor> {
        &self.ty
    }

    /// Returns the values in field order.
    #[inline]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Returns the value of the field with the given `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(self.ty.index_of(name)?)
    }

    /// Returns the value of the field at `index`.
    #[inline]
    pub fn field_at(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Returns a mutable reference to the value at `index`.
    ///
    /// Callers must keep the value compatible with the field type.
    #[inline]
    pub fn field_at_mut(&mut self, index: usize) -> Option<&mut Value> {
        self.values.get_mut(index)
    }

    /// Assigns a field, checking the value against the field type.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), ValueError> {
        let Some(index) = self.ty.index_of(name) else {
            return Err(ValueError::UnknownField {
                ty: self.ty.path().to_owned(),
                field: name.to_owned(),
            });
        };
        let value = value.into();
        let field = &self.ty.fields()[index];
        if !field.accepts(&value) {
            return Err(ValueError::Mismatch {
                field: name.to_owned(),
                expected: field.type_name(),
                found: value.kind_name(),
            });
        }
        self.values[index] = value;
        Ok(())
    }

    /// Builder form of [`Instance::set`].
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Result<Self, ValueError> {
        self.set(name, value)?;
        Ok(self)
    }

    /// Returns an iterator over fields and their values.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&FieldDescriptor, &Value)> {
        self.ty.fields().iter().zip(&self.values)
    }

    /// Resets every field to the type defaults.
    pub fn reset(&mut self) {
        self.values.clear();
        self.values.extend_from_slice(self.ty.defaults());
    }

    /// Structural equality, see [`Value::identical`].
    pub fn identical(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.ty, &other.ty)
            && self
                .values
                .iter()
                .zip(&other.values)
                .all(|(a, b)| a.identical(b))
    }
}

// -----------------------------------------------------------------------------
// Tests
