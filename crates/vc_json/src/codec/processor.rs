use serde_json::Value as Json;
use vc_object::info::FieldType;
use vc_object::value::Value;

/// Overrides how values are written.
///
/// ## Return Value Semantics
///
/// - **`Some(Ok(json))`** → the processor wrote the value
/// - **`Some(Err(message))`** → the processor owns the type but refused the value
/// - **`None`** → not handled, the [`Encoder`] uses its default rules
///
/// The processor is consulted for every value before the default rules,
/// container elements included.
///
/// The trait is implemented for `()`, which handles nothing.
///
/// [`Encoder`]: crate::codec::Encoder
pub trait EncodeProcessor {
    fn try_encode(&self, ty: &FieldType, value: &Value) -> Option<Result<Json, String>>;
}

impl EncodeProcessor for () {
    #[inline(always)]
    fn try_encode(&self, _ty: &FieldType, _value: &Value) -> Option<Result<Json, String>> {
        None
    }
}

/// Overrides how values are read.
///
/// Same return semantics as [`EncodeProcessor`]; a refused value becomes a
/// [`FieldErrorKind::Rejected`] error at the current field.
///
/// [`FieldErrorKind::Rejected`]: crate::FieldErrorKind::Rejected
pub trait DecodeProcessor {
    fn try_decode(&self, ty: &FieldType, json: &Json, slot: &mut Value) -> Option<Result<(), String>>;
}

impl DecodeProcessor for () {
    #[inline(always)]
    fn try_decode(&self, _ty: &FieldType, _json: &Json, _slot: &mut Value) -> Option<Result<(), String>> {
        None
    }
}
