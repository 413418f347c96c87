use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use vc_json::{DecodeOptions, EncodeOptions};

// -----------------------------------------------------------------------------
// WriteMode

/// Which fields [`Library::save`](crate::Library::save) writes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WriteMode {
    /// Only fields that differ from the type defaults, for hand-edited data.
    #[default]
    Authoring,
    /// Every field, for documents that must not change meaning when
    /// defaults change.
    Baseline,
}

impl WriteMode {
    #[inline]
    pub const fn encode_options(self) -> EncodeOptions {
        match self {
            Self::Authoring => EncodeOptions::DELTA,
            Self::Baseline => EncodeOptions::FULL,
        }
    }
}

// -----------------------------------------------------------------------------
// LibrarySettings

/// Configuration of a [`Library`](crate::Library).
///
/// # Examples
///
/// ```
/// use vc_asset::{LibrarySettings, WriteMode};
///
/// let settings: LibrarySettings = serde_json::from_str(r#"{ "strict": true }"#).unwrap();
/// assert_eq!(settings.mount, "/Data");
/// assert!(settings.decode_options().strict);
///
/// let settings = LibrarySettings::default().with_write_mode(WriteMode::Baseline);
/// assert!(!settings.write_mode.encode_options().delta);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// Package root of the documents, e.g. `/Data`.
    pub mount: String,
    /// Treat field errors as document failures.
    pub strict: bool,
    pub write_mode: WriteMode,
    /// Directory of the cache ledger and the metadata cache; caches are not
    /// persisted without one.
    pub cache_dir: Option<PathBuf>,
    /// Delete derived caches when the ledger does not match the running
    /// toolchain.
    pub purge_on_incompatible: bool,
    /// Import every document on startup even when the caches are valid.
    pub eager_import: bool,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            mount: "/Data".to_owned(),
            strict: false,
            write_mode: WriteMode::Authoring,
            cache_dir: None,
            purge_on_incompatible: true,
            eager_import: false,
        }
    }
}

impl LibrarySettings {
    pub fn with_mount(mut self, mount: &str) -> Self {
        self.mount = mount.trim_end_matches('/').to_owned();
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_write_mode(mut self, write_mode: WriteMode) -> Self {
        self.write_mode = write_mode;
        self
    }

    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(cache_dir.into());
        self
    }

    pub fn with_purge_on_incompatible(mut self, purge: bool) -> Self {
        self.purge_on_incompatible = purge;
        self
    }

    pub fn with_eager_import(mut self, eager: bool) -> Self {
        self.eager_import = eager;
        self
    }

    #[inline]
    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions::LENIENT.with_strict(self.strict)
    }
}
