//! Shared objects with a stable identity.

use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::info::TypeDescriptor;
use crate::path::ObjectPath;
use crate::value::Instance;

/// Shared handle to an [`Object`].
///
/// Two handles refer to the same object iff [`Arc::ptr_eq`] holds.
pub type ObjectHandle = Arc<Object>;

// -----------------------------------------------------------------------------
// Object

/// An object instance addressable by an [`ObjectPath`].
///
/// The type is fixed at creation and can be read without locking, so
/// references to an object can be checked while its data is being written.
pub struct Object {
    path: RwLock<ObjectPath>,
    ty: Arc<TypeDescriptor>,
    data: RwLock<Instance>,
    importing: AtomicBool,
}

impl Object {
    /// Creates a new object holding `data`.
    pub fn new(path: ObjectPath, data: Instance) -> ObjectHandle {
        Arc::new(Self {
            path: RwLock::new(path),
            ty: Arc::clone(data.ty()),
            data: RwLock::new(data),
            importing: AtomicBool::new(false),
        })
    }

    /// Returns the current identity.
    pub fn path(&self) -> ObjectPath {
        self.path.read().clone()
    }

    /// Moves the object to a new identity.
    pub fn set_path(&self, path: ObjectPath) {
        *self.path.write() = path;
    }

    /// Returns the object type.
    #[inline]
    pub fn ty(&self) -> &Arc<TypeDescriptor> {
        &self.ty
    }

    /// Locks the field data for reading.
    #[inline]
    pub fn read(&self) -> RwLockReadGuard<'_, Instance> {
        self.data.read()
    }

    /// Locks the field data for writing.
    ///
    /// The instance type must not be changed through the guard.
    #[inline]
    pub fn write(&self) -> RwLockWriteGuard<'_, Instance> {
        self.data.write()
    }

    /// Returns `true` while a document is being imported into the object.
    #[inline]
    pub fn is_importing(&self) -> bool {
        self.importing.load(Ordering::Acquire)
    }

    /// Marks the object as importing.
    ///
    /// Returns `None` if an import is already in progress, which happens when
    /// an import indirectly triggers itself again.
    pub fn begin_import(&self) -> Option<ImportGuard<'_>> {
        self.importing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ImportGuard { object: self })
    }

    /// Formats the document reference `TypePath'/Package.Name'`.
    pub fn reference_string(&self) -> String {
        self.path().to_reference(self.ty.path())
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("path", &self.path())
            .field("ty", &self.ty.path())
            .finish_non_exhaustive()
    }
}

// -----------------------------------------------------------------------------
// ImportGuard

/// Clears the importing flag of an [`Object`] on drop.
#[must_use = "the import ends when the guard is dropped"]
pub struct ImportGuard<'a> {
    object: &'a Object,
}

impl Drop for ImportGuard<'_> {
    fn drop(&mut self) {
        self.object.importing.store(false, Ordering::Release);
    }
}

// -----------------------------------------------------------------------------
// Tests
