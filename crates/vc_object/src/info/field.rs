use std::sync::Arc;

use bitflags::bitflags;

use crate::info::FieldType;
use crate::value::Value;

// -----------------------------------------------------------------------------
// FieldFlags

bitflags! {
    /// Per-field marshalling flags.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct FieldFlags: u8 {
        /// Always written, even when equal to the baseline.
        const ALWAYS_SERIALIZE = 1 << 0;
        /// Never written nor read.
        const TRANSIENT        = 1 << 1;
        /// The field owns the object it points to, which is embedded by value.
        const INSTANCED        = 1 << 2;
        /// Read for legacy fixups, never written.
        const DEPRECATED       = 1 << 3;
    }
}

impl FieldFlags {
    /// Flags of fields that are left out of written documents.
    pub const SKIP_ON_WRITE: Self = Self::TRANSIENT.union(Self::DEPRECATED);
}

// -----------------------------------------------------------------------------
// FieldDescriptor

/// Information for a named field.
///
/// A field with `array_dim > 1` is a fixed-size native array: its value is a
/// [`Value::Array`] holding exactly `array_dim` elements of type [`ty`].
///
/// # Examples
///
/// ```
/// use vc_object::info::{FieldDescriptor, FieldFlags, FieldType};
/// use vc_object::value::Value;
///
/// let field = FieldDescriptor::new("slots", FieldType::Int)
///     .with_array_dim(2)
///     .with_flags(FieldFlags::ALWAYS_SERIALIZE);
///
/// assert_eq!(field.name(), "slots");
/// assert!(matches!(field.default_value(), Value::Array(items) if items.len() == 2));
/// ```
///
/// [`ty`]: FieldDescriptor::ty
#[derive(Clone, Debug)]
pub struct FieldDescriptor {
    name: Arc<str>,
    ty: FieldType,
    array_dim: usize,
    flags: FieldFlags,
    default: Option<Value>,
}

impl FieldDescriptor {
    /// Creates a new field with the implicit default of its type.
    pub fn new(name: &str, ty: FieldType) -> Self {
        Self {
            name: Arc::from(name),
            ty,
            array_dim: 1,
            flags: FieldFlags::empty(),
            default: None,
        }
    }

    /// Adds marshalling flags.
    #[inline]
    pub fn with_flags(mut self, flags: FieldFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Turns the field into a fixed-size array of `dim` elements.
    #[inline]
    pub fn with_array_dim(mut self, dim: usize) -> Self {
        self.array_dim = dim.max(1);
        self
    }

    /// Sets an explicit default value.
    #[inline]
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Returns the field name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared element type.
    #[inline]
    pub fn ty(&self) -> &FieldType {
        &self.ty
    }

    /// Returns the fixed array dimension, `1` for plain fields.
    #[inline]
    pub fn array_dim(&self) -> usize {
        self.array_dim
    }

    /// Returns the marshalling flags.
    #[inline]
    pub fn flags(&self) -> FieldFlags {
        self.flags
    }

    /// Returns `true` if object values of this field are embedded by value.
    #[inline]
    pub fn is_instanced(&self) -> bool {
        self.flags.contains(FieldFlags::INSTANCED)
    }

    /// Returns the default value of the field.
    pub fn default_value(&self) -> Value {
        if let Some(value) = &self.default {
            return value.clone();
        }
        let element = self.ty.default_value(self.is_instanced());
        if self.array_dim > 1 {
            Value::Array(vec![element; self.array_dim])
        } else {
            element
        }
    }

    /// Returns `true` if `value` can be stored in this field.
    pub fn accepts(&self, value: &Value) -> bool {
        if self.array_dim > 1 {
            return match value {
                Value::Array(items) => {
                    items.len() == self.array_dim
                        && items.iter().all(|v| v.fits(&self.ty, self.is_instanced()))
                }
                _ => false,
            };
        }
        value.fits(&self.ty, self.is_instanced())
    }

    /// Describes the declared type, including the fixed dimension.
    pub fn type_name(&self) -> String {
        if self.array_dim > 1 {
            format!("[{}; {}]", self.ty, self.array_dim)
        } else {
            self.ty.to_string()
        }
    }
}

// -----------------------------------------------------------------------------
// Tests
