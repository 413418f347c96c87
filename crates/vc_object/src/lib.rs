#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

// -----------------------------------------------------------------------------
// Modules

mod error;

pub mod hash;
pub mod info;
pub mod object;
pub mod path;
pub mod registry;
pub mod tags;
pub mod value;
pub mod version;

// -----------------------------------------------------------------------------
// Top-level exports

pub use error::{TypeError, ValueError};
