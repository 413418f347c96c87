//! Runtime type descriptors.
//!
//! A [`TypeDescriptor`] lists the [`FieldDescriptor`]s of one struct or object
//! type in declaration order (inherited fields first), together with the
//! default values used as the baseline for delta encoding.
//!
//! Descriptors are built once through [`TypeBuilder`], shared through `Arc`
//! and never mutated afterwards.

// -----------------------------------------------------------------------------
// Modules

mod enum_info;
mod field;
mod field_type;
mod type_descriptor;

// -----------------------------------------------------------------------------
// Exports

pub use enum_info::EnumInfo;
pub use field::{FieldDescriptor, FieldFlags};
pub use field_type::FieldType;
pub use type_descriptor::{FinalizeFn, PostImportFn, TextCodec};
pub use type_descriptor::{TypeBuilder, TypeDescriptor, TypeKind};

/// Reserved key naming the runtime type of an embedded object.
///
/// No type may declare a field with this name.
pub const CLASS_NAME_KEY: &str = "_ClassName";
