use vc_object::info::TypeDescriptor;
use vc_object::path::ObjectPath;

use super::Library;
use crate::cache::{self, CacheVersion, MetadataCache};
use crate::error::AssetError;
use crate::index::AssetIndex;

/// Counts of a batch import.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub loaded: usize,
    pub failed: usize,
    /// Documents whose objects were already resident.
    pub skipped: usize,
}

impl Library {
    /// Lists the documents below the mount and rebuilds the index.
    ///
    /// Returns the number of documents found.
    pub fn rescan_all(&self) -> Result<usize, AssetError> {
        let paths = self
            .store
            .enumerate(&self.settings.mount)
            .collect::<Result<Vec<_>, _>>()?;
        let index = AssetIndex::from_paths(paths);
        let count = index.len();

        log::info!(
            "found {count} documents below `{}`, {} index bits",
            self.settings.mount,
            index.index_bits()
        );
        *self.index.write() = index;
        Ok(count)
    }

    /// Imports every document below the mount in index order.
    ///
    /// With `only_missing` resident objects are skipped, otherwise they are
    /// reloaded in place. A failing document is logged and counted; the
    /// batch goes on. Afterwards the metadata cache is rebuilt and, with a
    /// cache directory, written together with the ledger.
    pub fn import_all(&self, only_missing: bool) -> Result<ImportSummary, AssetError> {
        self.rescan_all()?;
        let paths: Vec<ObjectPath> = self.index.read().iter().cloned().collect();

        let mut summary = ImportSummary::default();
        for path in &paths {
            if only_missing && self.resident(path).is_some() {
                summary.skipped += 1;
                continue;
            }
            let result = if only_missing {
                self.load_or_materialize(path)
            } else {
                self.force_reload(path)
            };
            match result {
                Ok(_) => summary.loaded += 1,
                Err(error) => {
                    log::error!("{error}");
                    summary.failed += 1;
                }
            }
        }

        let mut metadata = MetadataCache::new();
        for path in paths {
            if let Some(object) = self.resident(&path) {
                metadata.record(object.ty().path(), path);
            }
        }
        *self.metadata.write() = metadata;

        log::info!(
            "imported {} documents, {} failed, {} skipped",
            summary.loaded,
            summary.failed,
            summary.skipped
        );
        self.write_caches()?;
        Ok(summary)
    }

    /// Brings the library up to date with its documents.
    ///
    /// When the ledger in the cache directory was written by an
    /// incompatible toolchain or format revision, the caches are purged
    /// (if configured) and every document is imported. Otherwise the
    /// metadata cache is loaded and documents are left to load on demand,
    /// unless eager import is configured.
    pub fn startup(&self) -> Result<ImportSummary, AssetError> {
        let Some(dir) = self.settings.cache_dir.clone() else {
            return self.import_all(false);
        };

        let current = CacheVersion::current(&self.context);
        let compatible = CacheVersion::is_compatible(&current, &CacheVersion::load(&dir));
        if !compatible {
            log::info!(
                "caches in `{}` were not written by {}, rebuilding",
                dir.display(),
                current.toolchain()
            );
            if self.settings.purge_on_incompatible {
                cache::purge(&dir)?;
                self.metadata.write().clear();
            }
        }
        if !compatible || self.settings.eager_import {
            return self.import_all(false);
        }

        match MetadataCache::load(&dir) {
            Ok(Some(metadata)) => *self.metadata.write() = metadata,
            Ok(None) => return self.import_all(false),
            Err(error) => {
                log::warn!("{error}, importing every document");
                return self.import_all(false);
            }
        }
        self.rescan_all()?;
        Ok(ImportSummary::default())
    }

    /// Returns the documents holding objects of `ty`, optionally including
    /// its descendants, in lexical order.
    ///
    /// Answered from the metadata cache; documents that were never imported
    /// or cached are not listed.
    pub fn assets_by_type(&self, ty: &TypeDescriptor, include_descendants: bool) -> Vec<ObjectPath> {
        let metadata = self.metadata.read();
        let mut paths: Vec<ObjectPath> = if include_descendants {
            self.registry
                .iter()
                .filter(|candidate| candidate.is_child_of(ty))
                .flat_map(|candidate| metadata.paths_of(candidate.path()))
                .cloned()
                .collect()
        } else {
            metadata.paths_of(ty.path()).cloned().collect()
        };
        paths.sort_unstable();
        paths.dedup();
        paths
    }

    /// Writes the metadata cache and the ledger, if a cache directory is set.
    fn write_caches(&self) -> Result<(), AssetError> {
        let Some(dir) = &self.settings.cache_dir else {
            return Ok(());
        };
        self.metadata.read().save(dir)?;
        CacheVersion::current(&self.context).save(dir)
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use std::fs;

    use vc_json::VersionContext;
    use vc_object::version::ToolchainVersion;

    use super::ImportSummary;
    use crate::cache::{CACHE_VERSION_FILE, CacheVersion, METADATA_FILE, MetadataCache};
    use crate::fixtures::{Fixture, armor_document, int_field, path, weapon_document};
    use crate::settings::LibrarySettings;
    use crate::store::{DocumentStore, FileStore, MemoryStore};

    fn populated() -> MemoryStore {
        MemoryStore::new()
            .with_document(path("/Data/Weapons/Sword"), weapon_document(12, Some("/Data/Weapons/Axe")))
            .with_document(path("/Data/Weapons/Axe"), weapon_document(20, None))
            .with_document(path("/Data/Armor/Plate"), armor_document(8))
            .with_document(path("/Data/Broken"), "{ \"Data\": 1 }")
            .with_document(path("/Other/Ignored"), weapon_document(1, None))
    }

    #[test]
    fn batch_import_counts_and_continues() {
        let fx = Fixture::new();
        let library = fx.library(populated(), LibrarySettings::default());

        let summary = library.import_all(true).unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.loaded + summary.skipped, 3);
        assert_eq!(library.resident_count(), 3);
        assert!(!library.is_resident(&path("/Other/Ignored")));

        let again = library.import_all(true).unwrap();
        assert_eq!(
            again,
            ImportSummary {
                loaded: 0,
                failed: 1,
                skipped: 3
            }
        );

        let sword = library.resolve(&path("/Data/Weapons/Sword")).unwrap();
        library
            .store()
            .write_text(&path("/Data/Weapons/Sword"), &weapon_document(13, None))
            .unwrap();
        let full = library.import_all(false).unwrap();
        assert_eq!(full.loaded, 3);
        assert_eq!(int_field(&sword, "damage"), 13);
    }

    #[test]
    fn rescan_builds_a_lexical_index() {
        let fx = Fixture::new();
        let library = fx.library(populated(), LibrarySettings::default());
        assert_eq!(library.rescan_all().unwrap(), 4);

        let index = library.index();
        let names: Vec<_> = index.iter().map(ToString::to_string).collect();
        assert_eq!(
            names,
            [
                "/Data/Armor/Plate.Plate",
                "/Data/Broken.Broken",
                "/Data/Weapons/Axe.Axe",
                "/Data/Weapons/Sword.Sword"
            ]
        );
        assert_eq!(index.index_bits(), 2);
        assert_eq!(index.index_of(&path("/Data/Weapons/Axe")), Some(2));
    }

    #[test]
    fn assets_by_type_follows_the_hierarchy() {
        let fx = Fixture::new();
        let store = populated().with_document(
            path("/Data/Weapons/Wand"),
            r#"{ "Class": "/Script/Game.Enchanted", "Data": { "power": 2.5 } }"#,
        );
        let library = fx.library(store, LibrarySettings::default());
        library.import_all(false).unwrap();

        assert_eq!(
            library.assets_by_type(&fx.weapon, false),
            [path("/Data/Weapons/Axe"), path("/Data/Weapons/Sword")]
        );
        assert_eq!(
            library.assets_by_type(&fx.weapon, true),
            [path("/Data/Weapons/Axe"), path("/Data/Weapons/Sword"), path("/Data/Weapons/Wand")]
        );
        assert_eq!(library.assets_by_type(&fx.asset, true).len(), 4);
        assert_eq!(library.assets_by_type(&fx.armor, false), [path("/Data/Armor/Plate")]);
        assert!(library.assets_by_type(&fx.enchanted, false).len() == 1);
    }

    #[test]
    fn startup_uses_valid_caches() {
        let fx = Fixture::new();
        let content = tempfile::tempdir().unwrap();
        let caches = tempfile::tempdir().unwrap();
        let store = FileStore::new(content.path(), "/Data");
        store.write_text(&path("/Data/Weapons/Sword"), &weapon_document(12, None)).unwrap();
        store.write_text(&path("/Data/Armor/Plate"), &armor_document(8)).unwrap();
        let settings = LibrarySettings::default().with_cache_dir(caches.path());

        // First start: no ledger, everything is imported and the caches are written.
        let library = fx.library(store.clone(), settings.clone());
        let summary = library.startup().unwrap();
        assert_eq!(summary.loaded, 2);
        assert!(caches.path().join(CACHE_VERSION_FILE).is_file());
        let metadata = MetadataCache::load(caches.path()).unwrap().unwrap();
        assert_eq!(metadata.len(), 2);

        // Second start: caches are valid, nothing is imported.
        let library = fx.library(store.clone(), settings.clone());
        assert_eq!(library.startup().unwrap(), ImportSummary::default());
        assert_eq!(library.resident_count(), 0);
        assert_eq!(library.assets_by_type(&fx.weapon, false), [path("/Data/Weapons/Sword")]);
        assert_eq!(library.index().len(), 2);

        // Eager import loads everything regardless.
        let library = fx.library(store.clone(), settings.clone().with_eager_import(true));
        assert_eq!(library.startup().unwrap().loaded, 2);

        // A newer toolchain invalidates the caches.
        let newer = VersionContext::new(ToolchainVersion::new(1, 5, 0, 2400, "main"));
        fs::write(caches.path().join(METADATA_FILE), "{ \"PathsByClass\": {} }").unwrap();
        let library = fx.library(store, settings).with_context(newer.clone());
        assert_eq!(library.startup().unwrap().loaded, 2);
        assert_eq!(CacheVersion::load(caches.path()), CacheVersion::current(&newer));
        assert_eq!(MetadataCache::load(caches.path()).unwrap().unwrap().len(), 2);
    }

    #[test]
    fn startup_without_cache_dir_imports() {
        let fx = Fixture::new();
        let library = fx.library(populated(), LibrarySettings::default());
        let summary = library.startup().unwrap();
        assert_eq!(summary.loaded, 3);
        assert_eq!(summary.failed, 1);
    }
}
