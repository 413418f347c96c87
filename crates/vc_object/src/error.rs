use thiserror::Error;

/// Errors raised while building or registering a [`TypeDescriptor`].
///
/// [`TypeDescriptor`]: crate::info::TypeDescriptor
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TypeError {
    /// Two fields of the same type share a name, inherited fields included.
    #[error("type `{ty}` declares field `{field}` more than once")]
    DuplicateField { ty: String, field: String },
    /// The field name is reserved by the document format.
    #[error("field name `{field}` on type `{ty}` is reserved")]
    ReservedFieldName { ty: String, field: String },
    /// A default value does not fit the declared field type.
    #[error("default value of field `{field}` on type `{ty}` does not match its declared type")]
    DefaultMismatch { ty: String, field: String },
    /// A default override names a field the type does not have.
    #[error("type `{ty}` has no field `{field}` to override")]
    UnknownField { ty: String, field: String },
    /// Structs can only derive from structs and objects only from objects.
    #[error("type `{ty}` cannot derive from `{parent}`, their kinds differ")]
    ParentKindMismatch { ty: String, parent: String },
    /// Abstract types have no instances.
    #[error("type `{0}` is abstract and cannot be instantiated")]
    AbstractType(String),
}

/// Errors raised when assigning values to an [`Instance`].
///
/// [`Instance`]: crate::value::Instance
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValueError {
    /// The instance type has no field with that name.
    #[error("type `{ty}` has no field `{field}`")]
    UnknownField { ty: String, field: String },
    /// The value kind does not fit the field type.
    #[error("field `{field}` expects `{expected}` but received a value of kind `{found}`")]
    Mismatch {
        field: String,
        expected: String,
        found: &'static str,
    },
}
