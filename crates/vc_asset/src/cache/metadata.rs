use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use vc_object::path::ObjectPath;

use crate::error::AssetError;

/// File name of the metadata cache inside the cache directory.
pub const METADATA_FILE: &str = "JsonMetaDataCache.json";

/// Document identities grouped by the path of their class.
///
/// Lets class queries answer without importing every document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetadataCache {
    paths_by_class: BTreeMap<String, BTreeSet<ObjectPath>>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `path` as a document of `class`, replacing any earlier
    /// record of it.
    pub fn record(&mut self, class: &str, path: ObjectPath) {
        self.remove(&path);
        self.paths_by_class.entry(class.to_owned()).or_default().insert(path);
    }

    /// Forgets `path`, returns `true` if it was recorded.
    pub fn remove(&mut self, path: &ObjectPath) -> bool {
        let mut removed = false;
        self.paths_by_class.retain(|_, paths| {
            removed |= paths.remove(path);
            !paths.is_empty()
        });
        removed
    }

    /// Returns the documents recorded for exactly `class`.
    pub fn paths_of(&self, class: &str) -> impl Iterator<Item = &ObjectPath> {
        self.paths_by_class.get(class).into_iter().flatten()
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.paths_by_class.keys().map(String::as_str)
    }

    /// Number of recorded documents.
    pub fn len(&self) -> usize {
        self.paths_by_class.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.paths_by_class.is_empty()
    }

    pub fn clear(&mut self) {
        self.paths_by_class.clear();
    }

    /// Reads the cache of `dir`, `None` if it has not been written.
    pub fn load(dir: &Path) -> Result<Option<Self>, AssetError> {
        super::read_json(&dir.join(METADATA_FILE))
    }

    pub fn save(&self, dir: &Path) -> Result<(), AssetError> {
        super::write_json(&dir.join(METADATA_FILE), self)
    }
}

// -----------------------------------------------------------------------------
// Tests
