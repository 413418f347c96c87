//! Backing storage for documents.
//!
//! A [`DocumentStore`] maps object identities to document text. The
//! [`FileStore`] keeps one `.json` file per identity below a directory, the
//! [`MemoryStore`] keeps everything in a map.

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use vc_object::path::ObjectPath;

mod fs;
mod memory;

pub use fs::FileStore;
pub use memory::MemoryStore;

// -----------------------------------------------------------------------------
// StoreError

/// Error returned by a [`DocumentStore`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// No document exists for the identity.
    #[error("no document exists for `{0}`")]
    NotFound(ObjectPath),
    /// The identity or file lies outside of the mounted root.
    #[error("`{0}` lies outside of the store root")]
    OutsideRoot(String),
    /// The underlying file system failed.
    #[error("i/o failure on `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    /// Wraps an i/o error, mapping [`io::ErrorKind::NotFound`] to
    /// [`StoreError::NotFound`] for `object`.
    pub(crate) fn io(object: &ObjectPath, path: PathBuf, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound(object.clone())
        } else {
            Self::Io { path, source }
        }
    }
}

/// Returns `true` if `package` is `root` or lies below it.
pub(crate) fn is_below(package: &str, root: &str) -> bool {
    let root = root.trim_end_matches('/');
    package
        .strip_prefix(root)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

// -----------------------------------------------------------------------------
// DocumentStore

/// Reads and writes document text by object identity.
///
/// Stores are shared between threads by the library; implementations
/// synchronize internally.
pub trait DocumentStore: Send + Sync {
    /// Returns the document text of `path`.
    fn read_text(&self, path: &ObjectPath) -> Result<String, StoreError>;

    /// Creates or replaces the document of `path`.
    fn write_text(&self, path: &ObjectPath, text: &str) -> Result<(), StoreError>;

    /// Returns `true` if a document exists for `path`.
    fn exists(&self, path: &ObjectPath) -> bool;

    /// Removes the document of `path`.
    fn remove(&self, path: &ObjectPath) -> Result<(), StoreError>;

    /// Lists the identities of all documents below the package root `root`.
    ///
    /// The order is unspecified.
    fn enumerate(&self, root: &str) -> Box<dyn Iterator<Item = Result<ObjectPath, StoreError>> + '_>;
}

// -----------------------------------------------------------------------------
// Tests
