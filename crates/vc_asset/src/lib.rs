#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

// -----------------------------------------------------------------------------
// Modules

mod error;
mod library;
mod settings;

pub mod cache;
pub mod index;
pub mod store;

#[cfg(test)]
mod fixtures;

// -----------------------------------------------------------------------------
// Top-level exports

pub use error::{AssetError, CacheFault};
pub use library::{ImportSummary, Library};
pub use settings::{LibrarySettings, WriteMode};
