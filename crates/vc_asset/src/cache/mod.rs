//! Caches derived from the documents, kept beside them in a cache
//! directory.
//!
//! - `CacheVersion.json`: the ledger recording which toolchain and data
//!   format revision produced the caches.
//! - `JsonMetaDataCache.json`: document identities grouped by class.

use std::fs;
use std::io;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::AssetError;

mod ledger;
mod metadata;

pub use ledger::{CACHE_VERSION_FILE, CacheVersion, FormatVersion};
pub use metadata::{METADATA_FILE, MetadataCache};

/// Deletes every cache file in `dir`.
pub fn purge(dir: &Path) -> Result<(), AssetError> {
    for name in [CACHE_VERSION_FILE, METADATA_FILE] {
        let path = dir.join(name);
        match fs::remove_file(&path) {
            Ok(()) => log::debug!("purged `{}`", path.display()),
            Err(source) if source.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(AssetError::Cache {
                    path,
                    source: source.into(),
                });
            }
        }
    }
    Ok(())
}

/// Reads a cache file, `None` if it does not exist.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, AssetError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(source) if source.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(AssetError::Cache {
                path: path.to_path_buf(),
                source: source.into(),
            });
        }
    };
    serde_json::from_str(&text).map(Some).map_err(|source| AssetError::Cache {
        path: path.to_path_buf(),
        source: source.into(),
    })
}

pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), AssetError> {
    let fault = |source: crate::error::CacheFault| AssetError::Cache {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| fault(e.into()))?;
    }
    let text = serde_json::to_string_pretty(value).map_err(|e| fault(e.into()))?;
    fs::write(path, text).map_err(|e| fault(e.into()))
}
