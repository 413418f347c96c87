use std::collections::BTreeMap;

use parking_lot::RwLock;
use vc_object::path::ObjectPath;

use super::{DocumentStore, StoreError, is_below};

/// Keeps documents in memory.
///
/// Used by tests and tools that assemble documents before writing them out.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<BTreeMap<ObjectPath, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a document, builder style.
    pub fn with_document(self, path: ObjectPath, text: impl Into<String>) -> Self {
        self.documents.write().insert(path, text.into());
        self
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }
}

impl DocumentStore for MemoryStore {
    fn read_text(&self, path: &ObjectPath) -> Result<String, StoreError> {
        self.documents
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(path.clone()))
    }

    fn write_text(&self, path: &ObjectPath, text: &str) -> Result<(), StoreError> {
        self.documents.write().insert(path.clone(), text.to_owned());
        Ok(())
    }

    fn exists(&self, path: &ObjectPath) -> bool {
        self.documents.read().contains_key(path)
    }

    fn remove(&self, path: &ObjectPath) -> Result<(), StoreError> {
        match self.documents.write().remove(path) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(path.clone())),
        }
    }

    fn enumerate(&self, root: &str) -> Box<dyn Iterator<Item = Result<ObjectPath, StoreError>> + '_> {
        let paths: Vec<_> = self
            .documents
            .read()
            .keys()
            .filter(|path| is_below(path.package(), root))
            .cloned()
            .collect();
        Box::new(paths.into_iter().map(Ok))
    }
}

// -----------------------------------------------------------------------------
// Tests
