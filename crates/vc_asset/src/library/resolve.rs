use std::sync::Arc;

use serde_json::Value as Json;
use vc_json::{CLASS_KEY, Document, ObjectResolver};
use vc_object::object::{Object, ObjectHandle};
use vc_object::path::ObjectPath;

use super::Library;
use crate::error::AssetError;

impl Library {
    /// Returns the object of `path`, materializing it from its document on
    /// first use.
    ///
    /// Concurrent calls for the same identity wait for the first one and
    /// return its object. A call made while the object is importing on the
    /// same thread returns the importing object.
    pub fn load_or_materialize(&self, path: &ObjectPath) -> Result<ObjectHandle, AssetError> {
        let path = self.redirected(path);
        if let Some(object) = self.resident(&path)
            && !object.is_importing()
        {
            return Ok(object);
        }

        let lock = self.identity_lock(&path);
        let _guard = lock.lock();
        if let Some(object) = self.resident(&path) {
            return Ok(object);
        }
        self.materialize(&path)
    }

    /// Imports the document of `path` again into the resident object.
    ///
    /// The object keeps its identity, so handles held elsewhere see the new
    /// data. Objects that are not resident are materialized. The document
    /// must still name the class of the resident object.
    pub fn force_reload(&self, path: &ObjectPath) -> Result<ObjectHandle, AssetError> {
        let path = self.redirected(path);
        let lock = self.identity_lock(&path);
        let _guard = lock.lock();

        let Some(object) = self.resident(&path) else {
            return self.materialize(&path);
        };
        if object.is_importing() {
            log::trace!("`{path}` is already importing");
            return Ok(object);
        }
        let importing = object.begin_import();

        let envelope = |source| AssetError::Envelope {
            path: path.clone(),
            source,
        };
        let text = self.store.read_text(&path)?;
        let root = Document::parse(&text).map_err(envelope)?;

        if let Some(Json::String(class)) = root.get(CLASS_KEY)
            && let Some(found) = self.registry.resolve_type(class)
            && !Arc::ptr_eq(&found, object.ty())
            && !(object.ty().is_stale() && found.path() == object.ty().path())
        {
            return Err(AssetError::TypeChanged {
                path: path.clone(),
                found: found.path().to_owned(),
                resident: object.ty().path().to_owned(),
            });
        }

        log::debug!("reloading `{path}`");
        let outcome = self
            .document()
            .import(&root, &mut object.write(), self.settings.decode_options())
            .map_err(envelope)?;
        if !outcome.report.is_clean() {
            log::warn!(
                "`{path}` reloaded with {} warning(s) and {} recovered field(s)",
                outcome.report.warnings.len(),
                outcome.report.recovered.len()
            );
        }

        drop(importing);
        Ok(object)
    }

    /// Creates, registers and imports the object of `path`.
    ///
    /// The object becomes resident before its fields are decoded, so
    /// references back to it resolve to the object being built.
    fn materialize(&self, path: &ObjectPath) -> Result<ObjectHandle, AssetError> {
        log::debug!("materializing `{path}`");
        let envelope = |source| AssetError::Envelope {
            path: path.clone(),
            source,
        };

        let text = self.store.read_text(path)?;
        let root = Document::parse(&text).map_err(envelope)?;
        let document = self.document();
        let instance = document.instantiate(&root, &self.base).map_err(envelope)?;

        let object = Object::new(path.clone(), instance);
        let importing = object.begin_import();
        self.objects.write().insert(path.clone(), Arc::clone(&object));

        let result = document.import(&root, &mut object.write(), self.settings.decode_options());
        drop(importing);

        match result {
            Ok(outcome) => {
                if !outcome.report.is_clean() {
                    log::warn!(
                        "`{path}` imported with {} warning(s) and {} recovered field(s)",
                        outcome.report.warnings.len(),
                        outcome.report.recovered.len()
                    );
                }
                self.metadata.write().record(object.ty().path(), path.clone());
                Ok(object)
            }
            Err(source) => {
                self.objects.write().remove(path);
                Err(envelope(source))
            }
        }
    }
}

impl ObjectResolver for Library {
    /// Resolves references met while decoding, loading their documents when
    /// needed.
    ///
    /// Resident objects are returned without taking the identity lock, so
    /// documents referencing each other load without deadlocking.
    fn resolve_reference(&self, path: &ObjectPath) -> Option<ObjectHandle> {
        if let Some(object) = self.resolve(path) {
            return Some(object);
        }
        match self.load_or_materialize(path) {
            Ok(object) => Some(object),
            Err(error) => {
                log::warn!("reference to `{path}` cannot be loaded: {error}");
                None
            }
        }
    }
}

// -----------------------------------------------------------------------------
// Tests
