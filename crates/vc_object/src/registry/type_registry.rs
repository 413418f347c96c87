use std::sync::Arc;

use uuid::Uuid;

use crate::TypeError;
use crate::hash::{HashMap, HashSet};
use crate::info::TypeDescriptor;
use crate::tags::TagDictionary;
use crate::value::Instance;
use crate::version::CustomVersionInfo;

/// Upper bound of chained redirects, guards against redirect cycles.
const MAX_REDIRECT_DEPTH: usize = 16;

// -----------------------------------------------------------------------------
// TypeRegistry

/// Central store of [`TypeDescriptor`]s, custom versions and valid tags.
///
/// Types are looked up by full path or, when unambiguous, by short name.
/// Renamed types stay reachable through redirects. The registry is filled
/// during startup and then shared immutably.
///
/// # Example
///
/// ```
/// use vc_object::info::{FieldDescriptor, FieldType, TypeBuilder};
/// use vc_object::registry::TypeRegistry;
///
/// let mut registry = TypeRegistry::new();
/// let widget = registry.register(
///     TypeBuilder::object("/Script/Game.Widget")
///         .field(FieldDescriptor::new("size", FieldType::Int))
///         .build()
///         .unwrap(),
/// );
/// registry.add_type_redirect("/Script/Game.OldWidget", "/Script/Game.Widget");
///
/// let by_name = registry.resolve_type("Widget").unwrap();
/// let by_redirect = registry.resolve_type("/Script/Game.OldWidget").unwrap();
///
/// assert!(std::sync::Arc::ptr_eq(&by_name, &widget));
/// assert!(std::sync::Arc::ptr_eq(&by_redirect, &widget));
/// ```
#[derive(Default)]
pub struct TypeRegistry {
    types: HashMap<Arc<str>, Arc<TypeDescriptor>>,
    short_names: HashMap<Arc<str>, Arc<str>>,
    ambiguous_names: HashSet<Arc<str>>,
    redirects: HashMap<Arc<str>, Arc<str>>,
    custom_versions: HashMap<Uuid, CustomVersionInfo>,
    tags: TagDictionary,
}

impl TypeRegistry {
    /// Creates an empty registry.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a type and returns it.
    ///
    /// Registering a path again replaces the previous descriptor, which is
    /// marked stale; instances of the old descriptor keep working.
    pub fn register(&mut self, ty: Arc<TypeDescriptor>) -> Arc<TypeDescriptor> {
        let path: Arc<str> = Arc::from(ty.path());

        if let Some(previous) = self.types.insert(Arc::clone(&path), Arc::clone(&ty)) {
            previous.mark_stale();
            log::debug!("type `{path}` was registered again, the previous descriptor is now stale");
            return ty;
        }

        let name: Arc<str> = Arc::from(ty.name());
        if *name != *path && !self.ambiguous_names.contains(&name) {
            if self.short_names.contains_key(&name) {
                self.short_names.remove(&name);
                self.ambiguous_names.insert(name);
            } else {
                self.short_names.insert(name, path);
            }
        }
        ty
    }

    /// Makes `old` resolve to `new`.
    pub fn add_type_redirect(&mut self, old: &str, new: &str) {
        self.redirects.insert(Arc::from(old), Arc::from(new));
    }

    /// Returns the type registered with this exact path.
    pub fn get(&self, path: &str) -> Option<&Arc<TypeDescriptor>> {
        self.types.get(path)
    }

    /// Resolves a type by full path or unambiguous short name, following
    /// redirects.
    pub fn resolve_type(&self, name: &str) -> Option<Arc<TypeDescriptor>> {
        let mut name = name.trim();
        for _ in 0..MAX_REDIRECT_DEPTH {
            match self.redirects.get(name) {
                Some(target) => name = &**target,
                None => break,
            }
        }
        self.types
            .get(name)
            .or_else(|| self.types.get(self.short_names.get(name)?))
            .cloned()
    }

    /// Returns `true` if the short name is shared by several types.
    pub fn is_ambiguous(&self, name: &str) -> bool {
        self.ambiguous_names.contains(name)
    }

    /// Returns `true` if `candidate` can be stored where `expected` is declared.
    #[inline]
    pub fn is_assignable(candidate: &TypeDescriptor, expected: &TypeDescriptor) -> bool {
        candidate.is_child_of(expected)
    }

    /// Returns a copy of the type defaults.
    #[inline]
    pub fn default_instance(ty: &Arc<TypeDescriptor>) -> Instance {
        ty.default_instance()
    }

    /// Creates a new instance of a concrete type.
    pub fn construct(ty: &Arc<TypeDescriptor>) -> Result<Instance, TypeError> {
        if ty.is_abstract() {
            return Err(TypeError::AbstractType(ty.path().to_owned()));
        }
        Ok(ty.default_instance())
    }

    /// Returns an iterator over all registered types.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<TypeDescriptor>> {
        self.types.values()
    }

    /// Returns the number of registered types.
    #[inline]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    // -------------------------------------------------------------------------
    // Custom versions

    /// Registers a custom version, replacing any entry with the same GUID.
    pub fn register_custom_version(&mut self, info: CustomVersionInfo) {
        self.custom_versions.insert(info.guid, info);
    }

    /// Returns the registered custom version.
    pub fn custom_version(&self, guid: &Uuid) -> Option<&CustomVersionInfo> {
        self.custom_versions.get(guid)
    }

    // -------------------------------------------------------------------------
    // Tags

    /// Returns the valid tags.
    #[inline]
    pub fn tags(&self) -> &TagDictionary {
        &self.tags
    }

    /// Registers a valid tag and its parents.
    pub fn add_tag(&mut self, name: &str) {
        self.tags.add(name);
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::TypeRegistry;
    use crate::TypeError;
    use crate::info::TypeBuilder;

    #[test]
    fn ambiguous_short_names() {
        let mut registry = TypeRegistry::new();
        registry.register(TypeBuilder::object("/A.Item").build().unwrap());
        registry.register(TypeBuilder::object("/B.Item").build().unwrap());
        registry.register(TypeBuilder::object("/B.Weapon").build().unwrap());

        assert!(registry.is_ambiguous("Item"));
        assert!(registry.resolve_type("Item").is_none());
        assert!(registry.resolve_type("/A.Item").is_some());
        assert!(registry.resolve_type("Weapon").is_some());
    }

    #[test]
    fn re_registration_marks_stale() {
        let mut registry = TypeRegistry::new();
        let old = registry.register(TypeBuilder::object("Thing").build().unwrap());
        let new = registry.register(TypeBuilder::object("Thing").build().unwrap());

        assert!(old.is_stale());
        assert!(!new.is_stale());
        assert!(Arc::ptr_eq(&registry.resolve_type("Thing").unwrap(), &new));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn redirect_cycles_terminate() {
        let mut registry = TypeRegistry::new();
        registry.add_type_redirect("A", "B");
        registry.add_type_redirect("B", "A");
        assert!(registry.resolve_type("A").is_none());
    }

    #[test]
    fn abstract_types_are_not_constructed() {
        let ty = TypeBuilder::object("Base").abstract_type().build().unwrap();
        assert!(matches!(TypeRegistry::construct(&ty), Err(TypeError::AbstractType(_))));
        assert_eq!(TypeRegistry::default_instance(&ty).values().len(), 0);
    }
}
