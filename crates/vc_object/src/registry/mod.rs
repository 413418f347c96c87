//! The process-wide type registry.

mod type_registry;

pub use type_registry::TypeRegistry;
