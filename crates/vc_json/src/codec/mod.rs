//! Field-level conversion between live values and JSON.
//!
//! [`Encoder`] and [`Decoder`] walk the fields of an [`Instance`] and keep a
//! trail of the field being processed, so every error and warning names the
//! exact location, e.g. `items[2].name`.
//!
//! [`Instance`]: vc_object::value::Instance

// -----------------------------------------------------------------------------
// Modules

mod decode;
mod encode;
mod processor;

pub mod delta;

// -----------------------------------------------------------------------------
// Exports

pub use decode::Decoder;
pub use encode::Encoder;
pub use processor::{DecodeProcessor, EncodeProcessor};
