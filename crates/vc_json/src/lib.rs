#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

// -----------------------------------------------------------------------------
// Modules

mod document;
mod error;
mod options;
mod resolver;

pub mod codec;
pub mod versions;

#[cfg(test)]
mod fixtures;

// -----------------------------------------------------------------------------
// Top-level exports

pub use document::{CLASS_KEY, CUSTOM_VERSIONS_KEY, DATA_KEY, ENGINE_VERSION_KEY, LICENSEE_KEY};
pub use document::{Decoded, Document, DocumentHeader, ImportOutcome, VersionContext};
pub use error::{DecodeReport, EncodeError, EnvelopeError, IntegrityWarning};
pub use error::{FieldError, FieldErrorKind, FieldPath, PathSegment};
pub use options::{DecodeOptions, EncodeOptions};
pub use resolver::{NoResolver, ObjectResolver};
