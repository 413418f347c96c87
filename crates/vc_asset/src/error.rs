use std::io;
use std::path::PathBuf;

use thiserror::Error;
use vc_json::{EncodeError, EnvelopeError};
use vc_object::path::ObjectPath;

use crate::store::StoreError;

/// Error returned by [`Library`](crate::Library) operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AssetError {
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The document of an object could not be read.
    #[error("failed to import `{path}`: {source}")]
    Envelope {
        path: ObjectPath,
        #[source]
        source: EnvelopeError,
    },
    /// An object could not be written.
    #[error("failed to export `{path}`: {source}")]
    Encode {
        path: ObjectPath,
        #[source]
        source: EncodeError,
    },
    /// A reload names a class other than the one of the resident object.
    #[error("`{path}` is now a `{found}` document but the resident object is a `{resident}`")]
    TypeChanged {
        path: ObjectPath,
        found: String,
        resident: String,
    },
    /// The object is of a type the library does not hold.
    #[error("`{path}` is a `{found}`, which is not a `{expected}`")]
    NotAnAsset {
        path: ObjectPath,
        found: String,
        expected: String,
    },
    #[error("`{0}` is not loaded")]
    NotResident(ObjectPath),
    #[error("`{0}` already exists")]
    AlreadyExists(ObjectPath),
    /// A cache file could not be read or written.
    #[error("cache file `{}` is unusable: {source}", path.display())]
    Cache {
        path: PathBuf,
        #[source]
        source: CacheFault,
    },
}

/// Underlying failure of a cache file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CacheFault {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Format(#[from] serde_json::Error),
}
