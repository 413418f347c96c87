//! Resident objects backed by documents.

use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex, RwLock, RwLockReadGuard};
use vc_json::{Document, VersionContext};
use vc_object::hash::HashMap;
use vc_object::info::TypeDescriptor;
use vc_object::object::{Object, ObjectHandle};
use vc_object::path::ObjectPath;
use vc_object::registry::TypeRegistry;
use vc_object::value::Instance;

use crate::cache::MetadataCache;
use crate::error::AssetError;
use crate::index::AssetIndex;
use crate::settings::LibrarySettings;
use crate::store::{DocumentStore, StoreError};

mod batch;
mod resolve;

pub use batch::ImportSummary;

/// Redirect chains longer than this are cut.
const MAX_REDIRECTS: usize = 16;

// -----------------------------------------------------------------------------
// Library

/// Keeps one shared object per document identity.
///
/// Objects are materialized from the [`DocumentStore`] on first use and stay
/// resident until deleted or unloaded, so resolving the same identity twice
/// yields the same [`ObjectHandle`]. Materialization is serialized per
/// identity; distinct identities load independently.
///
/// Every document holds an object of the base type or one of its
/// descendants.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use vc_asset::store::MemoryStore;
/// use vc_asset::{Library, LibrarySettings};
/// use vc_object::info::{FieldDescriptor, FieldType, TypeBuilder};
/// use vc_object::path::ObjectPath;
/// use vc_object::registry::TypeRegistry;
///
/// let mut registry = TypeRegistry::new();
/// let item = registry.register(
///     TypeBuilder::object("/Script/Game.Item")
///         .field(FieldDescriptor::new("weight", FieldType::Int))
///         .build()
///         .unwrap(),
/// );
///
/// let sword = ObjectPath::parse("/Data/Items/Sword").unwrap();
/// let store = MemoryStore::new().with_document(sword.clone(), r#"{ "Data": { "weight": 3 } }"#);
/// let library = Library::new(Arc::new(registry), store, item, LibrarySettings::default());
///
/// let first = library.load_or_materialize(&sword).unwrap();
/// let second = library.resolve(&sword).unwrap();
/// assert!(Arc::ptr_eq(&first, &second));
/// ```
pub struct Library {
    registry: Arc<TypeRegistry>,
    store: Box<dyn DocumentStore>,
    settings: LibrarySettings,
    context: VersionContext,
    base: Arc<TypeDescriptor>,
    objects: RwLock<HashMap<ObjectPath, ObjectHandle>>,
    locks: Mutex<HashMap<ObjectPath, Arc<ReentrantMutex<()>>>>,
    redirects: RwLock<HashMap<ObjectPath, ObjectPath>>,
    index: RwLock<AssetIndex>,
    metadata: RwLock<MetadataCache>,
}

impl Library {
    pub fn new(
        registry: Arc<TypeRegistry>,
        store: impl DocumentStore + 'static,
        base: Arc<TypeDescriptor>,
        settings: LibrarySettings,
    ) -> Self {
        Self {
            registry,
            store: Box::new(store),
            settings,
            context: VersionContext::default(),
            base,
            objects: RwLock::new(HashMap::default()),
            locks: Mutex::new(HashMap::default()),
            redirects: RwLock::new(HashMap::default()),
            index: RwLock::new(AssetIndex::default()),
            metadata: RwLock::new(MetadataCache::new()),
        }
    }

    /// Sets the toolchain versions documents are checked against.
    pub fn with_context(mut self, context: VersionContext) -> Self {
        self.context = context;
        self
    }

    #[inline]
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    #[inline]
    pub fn settings(&self) -> &LibrarySettings {
        &self.settings
    }

    #[inline]
    pub fn context(&self) -> &VersionContext {
        &self.context
    }

    #[inline]
    pub fn store(&self) -> &dyn DocumentStore {
        &*self.store
    }

    /// Returns the type every document must hold.
    #[inline]
    pub fn base_type(&self) -> &Arc<TypeDescriptor> {
        &self.base
    }

    /// Returns the index built by the last rescan.
    pub fn index(&self) -> RwLockReadGuard<'_, AssetIndex> {
        self.index.read()
    }

    /// Returns the resident object of `path` without loading it.
    ///
    /// Object redirects are followed.
    pub fn resolve(&self, path: &ObjectPath) -> Option<ObjectHandle> {
        self.resident(&self.redirected(path))
    }

    pub fn is_resident(&self, path: &ObjectPath) -> bool {
        self.resolve(path).is_some()
    }

    /// Number of resident objects.
    pub fn resident_count(&self) -> usize {
        self.objects.read().len()
    }

    /// Follows the object redirects recorded by [`Library::rename`].
    pub fn redirected(&self, path: &ObjectPath) -> ObjectPath {
        let redirects = self.redirects.read();
        let mut current = path;
        for _ in 0..MAX_REDIRECTS {
            match redirects.get(current) {
                Some(next) => current = next,
                None => break,
            }
        }
        current.clone()
    }

    // -------------------------------------------------------------------------
    // Writing

    /// Writes the document of a resident object in the configured
    /// [`WriteMode`](crate::WriteMode).
    pub fn save(&self, path: &ObjectPath) -> Result<(), AssetError> {
        let object = self.resolve(path).ok_or_else(|| AssetError::NotResident(path.clone()))?;
        let path = object.path();

        let text = {
            let data = object.read();
            self.document().encode(&data, self.settings.write_mode.encode_options())
        };
        let text = text.map_err(|source| AssetError::Encode {
            path: path.clone(),
            source,
        })?;

        self.store.write_text(&path, &text)?;
        log::debug!("saved `{path}`");
        Ok(())
    }

    /// Adds a new object and writes its document.
    pub fn insert(&self, path: ObjectPath, instance: Instance) -> Result<ObjectHandle, AssetError> {
        if !instance.ty().is_child_of(&self.base) {
            return Err(AssetError::NotAnAsset {
                path,
                found: instance.ty().path().to_owned(),
                expected: self.base.path().to_owned(),
            });
        }

        let lock = self.identity_lock(&path);
        let _guard = lock.lock();
        if self.objects.read().contains_key(&path) || self.store.exists(&path) {
            return Err(AssetError::AlreadyExists(path));
        }

        self.redirects.write().remove(&path);
        let object = Object::new(path.clone(), instance);
        self.objects.write().insert(path.clone(), Arc::clone(&object));
        if let Err(error) = self.save(&path) {
            self.objects.write().remove(&path);
            return Err(error);
        }
        self.metadata.write().record(object.ty().path(), path);
        Ok(object)
    }

    /// Moves an object to a new identity.
    ///
    /// The document moves along and the old identity redirects to the new
    /// one, so existing references keep resolving. The object keeps its
    /// identity in memory.
    pub fn rename(&self, from: &ObjectPath, to: ObjectPath) -> Result<ObjectHandle, AssetError> {
        let from = self.redirected(from);
        if from == to {
            return self.load_or_materialize(&from);
        }
        let object = self.load_or_materialize(&from)?;

        let result = {
            let (first, second) = if from < to { (&from, &to) } else { (&to, &from) };
            let (first, second) = (self.identity_lock(first), self.identity_lock(second));
            let _guards = (first.lock(), second.lock());
            self.move_object(&from, to, &object)
        };
        self.release_identity_lock(&from);
        result.map(|()| object)
    }

    fn move_object(&self, from: &ObjectPath, to: ObjectPath, object: &ObjectHandle) -> Result<(), AssetError> {
        if self.objects.read().contains_key(&to) || self.store.exists(&to) {
            return Err(AssetError::AlreadyExists(to));
        }

        let text = self.store.read_text(from)?;
        self.store.write_text(&to, &text)?;
        self.store.remove(from)?;

        {
            let mut objects = self.objects.write();
            objects.remove(from);
            objects.insert(to.clone(), Arc::clone(object));
        }
        object.set_path(to.clone());
        {
            let mut redirects = self.redirects.write();
            redirects.remove(&to);
            redirects.insert(from.clone(), to.clone());
        }
        self.metadata.write().record(object.ty().path(), to.clone());

        log::info!("renamed `{from}` to `{to}`");
        Ok(())
    }

    /// Removes the document of `path` and unloads its object.
    ///
    /// Handles held elsewhere stay valid but no longer resolve.
    pub fn delete(&self, path: &ObjectPath) -> Result<(), AssetError> {
        let path = self.redirected(path);
        let result = {
            let lock = self.identity_lock(&path);
            let _guard = lock.lock();

            let unloaded = self.objects.write().remove(&path).is_some();
            match self.store.remove(&path) {
                Ok(()) => Ok(()),
                Err(StoreError::NotFound(_)) if unloaded => Ok(()),
                Err(error) => Err(AssetError::from(error)),
            }
        };
        self.release_identity_lock(&path);
        result?;

        self.metadata.write().remove(&path);
        log::debug!("deleted `{path}`");
        Ok(())
    }

    /// Drops the resident object of `path`, keeping its document.
    pub fn unload(&self, path: &ObjectPath) -> Option<ObjectHandle> {
        let path = self.redirected(path);
        let unloaded = {
            let lock = self.identity_lock(&path);
            let _guard = lock.lock();
            self.objects.write().remove(&path)
        };
        self.release_identity_lock(&path);
        unloaded
    }

    // -------------------------------------------------------------------------
    // Internals

    /// Looks up a resident object by its exact identity.
    fn resident(&self, path: &ObjectPath) -> Option<ObjectHandle> {
        self.objects.read().get(path).cloned()
    }

    /// Returns the lock serializing loads of `path`.
    fn identity_lock(&self, path: &ObjectPath) -> Arc<ReentrantMutex<()>> {
        Arc::clone(self.locks.lock().entry(path.clone()).or_default())
    }

    /// Forgets the lock of `path` unless another caller still holds it.
    fn release_identity_lock(&self, path: &ObjectPath) {
        let mut locks = self.locks.lock();
        if locks.get(path).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(path);
        }
    }

    fn document(&self) -> Document<'_> {
        Document::new(&self.registry, &self.context).with_resolver(self)
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use vc_object::value::Value;

    use crate::error::AssetError;
    use crate::fixtures::{Fixture, int_field, path, reference_field, weapon_document};
    use crate::settings::{LibrarySettings, WriteMode};
    use crate::store::{DocumentStore, MemoryStore};

    #[test]
    fn insert_and_save() {
        let fx = Fixture::new();
        let library = fx.library(MemoryStore::new(), LibrarySettings::default());
        let sword = path("/Data/Items/Sword");

        let instance = fx.weapon.default_instance().with("damage", 25).unwrap();
        let object = library.insert(sword.clone(), instance).unwrap();
        assert!(Arc::ptr_eq(&object, &library.resolve(&sword).unwrap()));

        let text = library.store().read_text(&sword).unwrap();
        assert!(text.contains("\"Class\": \"/Script/Game.Weapon\""));
        assert!(text.contains("\"damage\": 25"));
        assert!(!text.contains("label"));

        object.write().set("damage", 30).unwrap();
        library.save(&sword).unwrap();
        assert!(library.store().read_text(&sword).unwrap().contains("\"damage\": 30"));

        let again = fx.weapon.default_instance();
        assert!(matches!(library.insert(sword.clone(), again), Err(AssetError::AlreadyExists(_))));

        let note = fx.note.default_instance();
        assert!(matches!(
            library.insert(path("/Data/Notes/Todo"), note),
            Err(AssetError::NotAnAsset { .. })
        ));
        assert!(matches!(library.save(&path("/Data/Missing")), Err(AssetError::NotResident(_))));
    }

    #[test]
    fn baseline_mode_writes_every_field() {
        let fx = Fixture::new();
        let settings = LibrarySettings::default().with_write_mode(WriteMode::Baseline);
        let library = fx.library(MemoryStore::new(), settings);
        let axe = path("/Data/Items/Axe");

        library.insert(axe.clone(), fx.weapon.default_instance()).unwrap();
        let text = library.store().read_text(&axe).unwrap();
        assert!(text.contains("\"label\": \"\""));
        assert!(text.contains("\"damage\": 10"));
        assert!(text.contains("\"upgrade\": \"None\""));
    }

    #[test]
    fn rename_keeps_identity_and_redirects() {
        let fx = Fixture::new();
        let store = MemoryStore::new()
            .with_document(path("/Data/Items/Sword"), weapon_document(12, None))
            .with_document(path("/Data/Items/Knight"), weapon_document(3, Some("/Data/Items/Sword")));
        let library = fx.library(store, LibrarySettings::default());

        let sword = library.load_or_materialize(&path("/Data/Items/Sword")).unwrap();
        let renamed = library
            .rename(&path("/Data/Items/Sword"), path("/Data/Items/Blade"))
            .unwrap();
        assert!(Arc::ptr_eq(&sword, &renamed));
        assert_eq!(sword.path(), path("/Data/Items/Blade"));

        assert!(!library.store().exists(&path("/Data/Items/Sword")));
        assert!(library.store().exists(&path("/Data/Items/Blade")));
        assert!(Arc::ptr_eq(&library.resolve(&path("/Data/Items/Sword")).unwrap(), &sword));

        // Documents written before the rename still find the object.
        let knight = library.load_or_materialize(&path("/Data/Items/Knight")).unwrap();
        assert!(Arc::ptr_eq(&reference_field(&knight, "upgrade").unwrap(), &sword));

        // Saving writes the new identity.
        library.save(&path("/Data/Items/Knight")).unwrap();
        let text = library.store().read_text(&path("/Data/Items/Knight")).unwrap();
        assert!(text.contains("/Data/Items/Blade.Blade"));

        // Renaming back replaces the redirect instead of looping.
        library
            .rename(&path("/Data/Items/Blade"), path("/Data/Items/Sword"))
            .unwrap();
        assert_eq!(library.redirected(&path("/Data/Items/Blade")), path("/Data/Items/Sword"));
        assert_eq!(library.redirected(&path("/Data/Items/Sword")), path("/Data/Items/Sword"));
        assert_eq!(int_field(&sword, "damage"), 12);

        let taken = library.rename(&path("/Data/Items/Knight"), path("/Data/Items/Sword"));
        assert!(matches!(taken, Err(AssetError::AlreadyExists(_))));
    }

    #[test]
    fn delete_and_unload() {
        let fx = Fixture::new();
        let store = MemoryStore::new().with_document(path("/Data/Items/Sword"), weapon_document(12, None));
        let library = fx.library(store, LibrarySettings::default());
        let sword = path("/Data/Items/Sword");

        let first = library.load_or_materialize(&sword).unwrap();
        assert!(library.unload(&sword).is_some());
        assert!(!library.is_resident(&sword));

        let second = library.load_or_materialize(&sword).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(matches!(second.read().get("damage"), Some(Value::Int(12))));

        library.delete(&sword).unwrap();
        assert!(!library.is_resident(&sword));
        assert!(!library.store().exists(&sword));
        assert!(matches!(library.delete(&sword), Err(AssetError::Store(_))));
        assert_eq!(library.resident_count(), 0);
    }

    #[test]
    fn identity_locks_are_released() {
        let fx = Fixture::new();
        let store = MemoryStore::new()
            .with_document(path("/Data/Items/Sword"), weapon_document(12, None))
            .with_document(path("/Data/Items/Axe"), weapon_document(20, None))
            .with_document(path("/Data/Items/Bow"), weapon_document(5, None));
        let library = fx.library(store, LibrarySettings::default());
        let sword = path("/Data/Items/Sword");

        library.load_or_materialize(&sword).unwrap();
        library.load_or_materialize(&path("/Data/Items/Axe")).unwrap();
        library.load_or_materialize(&path("/Data/Items/Bow")).unwrap();
        assert_eq!(library.locks.lock().len(), 3);

        library.unload(&sword);
        library.delete(&path("/Data/Items/Axe")).unwrap();
        library.rename(&path("/Data/Items/Bow"), path("/Data/Items/Longbow")).unwrap();

        let locks = library.locks.lock();
        assert_eq!(locks.len(), 1);
        assert!(locks.contains_key(&path("/Data/Items/Longbow")));
    }
}
