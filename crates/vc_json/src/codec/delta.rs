//! Decides which fields an encoder may omit.

use vc_object::info::{FieldDescriptor, FieldFlags};
use vc_object::value::Value;

/// Returns `true` if `value` equals its baseline and may be omitted.
///
/// A missing baseline never skips.
#[inline]
pub fn matches_baseline(value: &Value, baseline: Option<&Value>) -> bool {
    baseline.is_some_and(|base| value.identical(base))
}

/// Returns `true` if the field is left out of a document.
///
/// Transient and deprecated fields are never written. Other fields are
/// skipped when `delta` is on, the field is not flagged
/// [`FieldFlags::ALWAYS_SERIALIZE`] and the value matches the baseline.
pub fn should_skip(field: &FieldDescriptor, value: &Value, baseline: Option<&Value>, delta: bool) -> bool {
    let flags = field.flags();
    if flags.intersects(FieldFlags::SKIP_ON_WRITE) {
        return true;
    }
    delta && !flags.contains(FieldFlags::ALWAYS_SERIALIZE) && matches_baseline(value, baseline)
}

// -----------------------------------------------------------------------------
// Tests
