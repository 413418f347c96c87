use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use uuid::Uuid;

use crate::TypeError;
use crate::info::enum_info::short_name;
use crate::info::{CLASS_NAME_KEY, FieldDescriptor};
use crate::value::{Instance, Value};
use crate::version::{CustomVersionSet, ToolchainVersion};

// -----------------------------------------------------------------------------
// Hooks

/// Invoked exactly once after all fields of a decoded struct or object are populated.
pub type FinalizeFn = fn(&mut Instance, &CustomVersionSet);

/// Invoked after a whole document has been imported into an object.
///
/// Receives the document's toolchain version, if it had one, and its custom
/// versions. Returning an error fails the import.
pub type PostImportFn =
    fn(&mut Instance, Option<&ToolchainVersion>, &CustomVersionSet) -> Result<(), String>;

/// Textual form of a struct type.
///
/// Structs with a text codec are written as a single JSON string and can be
/// used as map keys.
#[derive(Clone, Copy, Debug)]
pub struct TextCodec {
    /// Formats the instance.
    pub export: fn(&Instance) -> String,
    /// Parses `text` into the instance, returning `false` on malformed text.
    pub import: fn(&str, &mut Instance) -> bool,
}

#[derive(Clone, Copy, Debug, Default)]
struct TypeHooks {
    finalize: Option<FinalizeFn>,
    text: Option<TextCodec>,
    post_import: Option<PostImportFn>,
}

// -----------------------------------------------------------------------------
// TypeDescriptor

/// Whether a type is a plain struct or an object type.
///
/// Only object types can be referenced, embedded polymorphically or stored
/// as standalone documents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Struct,
    Object,
}

/// Ordered field list and defaults of one struct or object type.
///
/// Fields are flattened at build time: inherited fields come first, in the
/// parent's order, followed by the type's own fields.
///
/// # Examples
///
/// ```
/// use vc_object::info::{FieldDescriptor, FieldType, TypeBuilder};
///
/// let point = TypeBuilder::structure("Point")
///     .field(FieldDescriptor::new("x", FieldType::Int))
///     .field(FieldDescriptor::new("y", FieldType::Int))
///     .build()
///     .unwrap();
///
/// assert_eq!(point.field_len(), 2);
/// assert_eq!(point.index_of("y"), Some(1));
/// assert!(point.default_instance().get("x").is_some());
/// ```
pub struct TypeDescriptor {
    path: Arc<str>,
    kind: TypeKind,
    parent: Option<Arc<TypeDescriptor>>,
    fields: Box<[FieldDescriptor]>,
    defaults: Box<[Value]>,
    is_abstract: bool,
    interfaces: Box<[Arc<str>]>,
    custom_versions: Box<[Uuid]>,
    hooks: TypeHooks,
    // Set once a newer registration with the same path replaces this one.
    stale: AtomicBool,
}

impl TypeDescriptor {
    /// Returns the full type path.
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the short type name, the text after the last `.` or `/`.
    #[inline]
    pub fn name(&self) -> &str {
        short_name(&self.path)
    }

    /// Returns the type kind.
    #[inline]
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// Returns `true` for object types.
    #[inline]
    pub fn is_object(&self) -> bool {
        self.kind == TypeKind::Object
    }

    /// Returns the parent type.
    #[inline]
    pub fn parent(&self) -> Option<&Arc<TypeDescriptor>> {
        self.parent.as_ref()
    }

    /// Returns all fields in declaration order, inherited fields first.
    #[inline]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Returns the number of fields.
    #[inline]
    pub fn field_len(&self) -> usize {
        self.fields.len()
    }

    /// Returns the field with the given `name`.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name() == name)
    }

    /// Returns the index of the field with the given `name`.
    ///
    /// This is O(N) complexity.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name() == name)
    }

    /// Returns the default value of every field, in field order.
    #[inline]
    pub fn defaults(&self) -> &[Value] {
        &self.defaults
    }

    /// Returns `true` if the type cannot be instantiated.
    #[inline]
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// Returns the implemented interfaces, inherited ones included.
    #[inline]
    pub fn interfaces(&self) -> &[Arc<str>] {
        &self.interfaces
    }

    /// Returns `true` if the type implements the named interface.
    pub fn implements(&self, interface: &str) -> bool {
        self.interfaces.iter().any(|i| &**i == interface)
    }

    /// Returns the custom version GUIDs the type layout depends on.
    #[inline]
    pub fn custom_versions(&self) -> &[Uuid] {
        &self.custom_versions
    }

    /// Returns `true` if `self` is `ancestor` or derives from it.
    pub fn is_child_of(&self, ancestor: &TypeDescriptor) -> bool {
        let mut current = Some(self);
        while let Some(ty) = current {
            if core::ptr::eq(ty, ancestor) {
                return true;
            }
            current = ty.parent.as_deref();
        }
        false
    }

    /// Creates an instance holding the type defaults.
    ///
    /// Abstract types still have defaults; they serve as delta baselines.
    pub fn default_instance(self: &Arc<Self>) -> Instance {
        Instance::from_parts(Arc::clone(self), self.defaults.to_vec())
    }

    /// Returns the finalize hook.
    #[inline]
    pub fn finalize_hook(&self) -> Option<FinalizeFn> {
        self.hooks.finalize
    }

    /// Returns the text codec.
    #[inline]
    pub fn text_codec(&self) -> Option<TextCodec> {
        self.hooks.text
    }

    /// Returns the post-import hook.
    #[inline]
    pub fn post_import_hook(&self) -> Option<PostImportFn> {
        self.hooks.post_import
    }

    /// Returns `true` once a newer registration with the same path exists.
    #[inline]
    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::Acquire)
    }

    pub(crate) fn mark_stale(&self) {
        self.stale.store(true, Ordering::Release);
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .field("parent", &self.parent.as_ref().map(|p| p.path()))
            .field("fields", &self.fields)
            .field("is_abstract", &self.is_abstract)
            .finish_non_exhaustive()
    }
}

// -----------------------------------------------------------------------------
// TypeBuilder

/// Builder for [`TypeDescriptor`].
///
/// # Examples
///
/// ```
/// use vc_object::info::{FieldDescriptor, FieldType, TypeBuilder};
///
/// let base = TypeBuilder::object("/Script/Game.Item")
///     .abstract_type()
///     .field(FieldDescriptor::new("price", FieldType::Int).with_default(10))
///     .build()
///     .unwrap();
///
/// let sword = TypeBuilder::object("/Script/Game.Sword")
///     .parent(&base)
///     .field(FieldDescriptor::new("damage", FieldType::Float))
///     .default_override("price", 25)
///     .build()
///     .unwrap();
///
/// assert!(sword.is_child_of(&base));
/// assert_eq!(sword.field_len(), 2);
/// ```
pub struct TypeBuilder {
    path: Arc<str>,
    kind: TypeKind,
    parent: Option<Arc<TypeDescriptor>>,
    fields: Vec<FieldDescriptor>,
    overrides: Vec<(String, Value)>,
    is_abstract: bool,
    interfaces: Vec<Arc<str>>,
    custom_versions: Vec<Uuid>,
    hooks: TypeHooks,
}

impl TypeBuilder {
    fn new(path: &str, kind: TypeKind) -> Self {
        Self {
            path: Arc::from(path),
            kind,
            parent: None,
            fields: Vec::new(),
            overrides: Vec::new(),
            is_abstract: false,
            interfaces: Vec::new(),
            custom_versions: Vec::new(),
            hooks: TypeHooks::default(),
        }
    }

    /// Starts a struct type.
    #[inline]
    pub fn structure(path: &str) -> Self {
        Self::new(path, TypeKind::Struct)
    }

    /// Starts an object type.
    #[inline]
    pub fn object(path: &str) -> Self {
        Self::new(path, TypeKind::Object)
    }

    /// Derives from `parent`, inheriting its fields, defaults, interfaces,
    /// custom versions and hooks.
    pub fn parent(mut self, parent: &Arc<TypeDescriptor>) -> Self {
        self.parent = Some(Arc::clone(parent));
        self
    }

    /// Appends a field.
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Replaces the default value of an inherited or own field.
    pub fn default_override(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.overrides.push((name.to_owned(), value.into()));
        self
    }

    /// Marks the type abstract.
    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Declares an implemented interface.
    pub fn interface(mut self, name: &str) -> Self {
        self.interfaces.push(Arc::from(name));
        self
    }

    /// Declares a custom version the type layout depends on.
    pub fn custom_version(mut self, guid: Uuid) -> Self {
        self.custom_versions.push(guid);
        self
    }

    /// Sets the finalize hook.
    pub fn finalize(mut self, hook: FinalizeFn) -> Self {
        self.hooks.finalize = Some(hook);
        self
    }

    /// Sets the text codec.
    pub fn text_codec(mut self, codec: TextCodec) -> Self {
        self.hooks.text = Some(codec);
        self
    }

    /// Sets the post-import hook.
    pub fn post_import(mut self, hook: PostImportFn) -> Self {
        self.hooks.post_import = Some(hook);
        self
    }

    /// Validates and flattens the type.
    pub fn build(self) -> Result<Arc<TypeDescriptor>, TypeError> {
        let ty = self.path.to_string();

        let mut fields = Vec::new();
        let mut defaults = Vec::new();
        let mut interfaces = Vec::new();
        let mut custom_versions = Vec::new();
        let mut hooks = TypeHooks::default();

        if let Some(parent) = &self.parent {
            if parent.kind != self.kind {
                return Err(TypeError::ParentKindMismatch {
                    ty,
                    parent: parent.path().to_owned(),
                });
            }
            fields.extend(parent.fields.iter().cloned());
            defaults.extend(parent.defaults.iter().cloned());
            interfaces.extend(parent.interfaces.iter().cloned());
            custom_versions.extend(parent.custom_versions.iter().copied());
            hooks = parent.hooks;
        }

        for field in self.fields {
            if field.name() == CLASS_NAME_KEY {
                return Err(TypeError::ReservedFieldName {
                    ty,
                    field: field.name().to_owned(),
                });
            }
            if fields.iter().any(|f: &FieldDescriptor| f.name() == field.name()) {
                return Err(TypeError::DuplicateField {
                    ty,
                    field: field.name().to_owned(),
                });
            }
            let default = field.default_value();
            if !field.accepts(&default) {
                return Err(TypeError::DefaultMismatch {
                    ty,
                    field: field.name().to_owned(),
                });
            }
            defaults.push(default);
            fields.push(field);
        }

        for (name, value) in self.overrides {
            let Some(index) = fields.iter().position(|f| f.name() == name) else {
                return Err(TypeError::UnknownField { ty, field: name });
            };
            if !fields[index].accepts(&value) {
                return Err(TypeError::DefaultMismatch { ty, field: name });
            }
            defaults[index] = value;
        }

        for interface in self.interfaces {
            if !interfaces.contains(&interface) {
                interfaces.push(interface);
            }
        }
        for guid in self.custom_versions {
            if !custom_versions.contains(&guid) {
                custom_versions.push(guid);
            }
        }

        hooks.finalize = self.hooks.finalize.or(hooks.finalize);
        hooks.text = self.hooks.text.or(hooks.text);
        hooks.post_import = self.hooks.post_import.or(hooks.post_import);

        Ok(Arc::new(TypeDescriptor {
            path: self.path,
            kind: self.kind,
            parent: self.parent,
            fields: fields.into_boxed_slice(),
            defaults: defaults.into_boxed_slice(),
            is_abstract: self.is_abstract,
            interfaces: interfaces.into_boxed_slice(),
            custom_versions: custom_versions.into_boxed_slice(),
            hooks,
            stale: AtomicBool::new(false),
        }))
    }
}

// -----------------------------------------------------------------------------
// Tests
