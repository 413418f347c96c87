use std::sync::Arc;

use serde_json::{Map, Value as Json};
use vc_object::info::{CLASS_NAME_KEY, FieldDescriptor, FieldFlags, FieldType};
use vc_object::path::NONE_TEXT;
use vc_object::value::{Instance, Value};

use super::delta;
use super::processor::EncodeProcessor;
use crate::error::{EncodeError, FieldPath, IntegrityWarning, PathSegment};
use crate::options::EncodeOptions;

/// Placeholder prefix for map keys without a text form.
const UNPARSED_KEY: &str = "Unparsed Key";

// -----------------------------------------------------------------------------
// Encoder

/// Converts live values into JSON.
///
/// Every field is compared against a baseline value; with
/// [`EncodeOptions::delta`] fields equal to their baseline are omitted.
/// Container elements are always written in full, so changing one element
/// re-emits the whole container.
///
/// # Examples
///
/// ```
/// use vc_json::codec::Encoder;
/// use vc_json::EncodeOptions;
/// use vc_object::info::{FieldDescriptor, FieldType, TypeBuilder};
///
/// let point = TypeBuilder::structure("Point")
///     .field(FieldDescriptor::new("x", FieldType::Int))
///     .field(FieldDescriptor::new("y", FieldType::Int))
///     .build()
///     .unwrap();
///
/// let defaults = point.default_instance();
/// let value = point.default_instance().with("x", 5).unwrap();
///
/// let mut encoder = Encoder::new(EncodeOptions::DELTA);
/// let data = encoder.encode_fields(&value, Some(&defaults)).unwrap();
/// assert_eq!(serde_json::Value::Object(data), serde_json::json!({ "x": 5 }));
/// ```
pub struct Encoder<'a, P: EncodeProcessor = ()> {
    options: EncodeOptions,
    processor: Option<&'a P>,
    trail: Vec<PathSegment>,
    warnings: Vec<IntegrityWarning>,
}

impl<'a> Encoder<'a, ()> {
    /// Creates an encoder without a processor.
    pub fn new(options: EncodeOptions) -> Self {
        Self {
            options,
            processor: None,
            trail: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

impl<'a, P: EncodeProcessor> Encoder<'a, P> {
    /// Replaces the processor consulted before the default rules.
    pub fn processor<Q: EncodeProcessor>(self, processor: &'a Q) -> Encoder<'a, Q> {
        Encoder {
            options: self.options,
            processor: Some(processor),
            trail: self.trail,
            warnings: self.warnings,
        }
    }

    #[inline]
    pub fn options(&self) -> EncodeOptions {
        self.options
    }

    /// Returns the warnings raised so far.
    #[inline]
    pub fn warnings(&self) -> &[IntegrityWarning] {
        &self.warnings
    }

    #[inline]
    pub fn into_warnings(self) -> Vec<IntegrityWarning> {
        self.warnings
    }

    /// Encodes the fields of `instance` into a JSON object.
    ///
    /// Without a baseline nothing is skipped.
    pub fn encode_fields(
        &mut self,
        instance: &Instance,
        baseline: Option<&Instance>,
    ) -> Result<Map<String, Json>, EncodeError> {
        let same_layout = baseline.is_some_and(|base| Arc::ptr_eq(base.ty(), instance.ty()));

        let mut map = Map::new();
        for (index, (field, value)) in instance.iter().enumerate() {
            let base = match baseline {
                Some(base) if same_layout => base.field_at(index),
                Some(base) => base.get(field.name()),
                None => None,
            };
            let segment = PathSegment::Field(field.name().to_owned());
            if let Some(json) = self.scoped(segment, |this| this.encode_field(field, value, base))? {
                map.insert(field.name().to_owned(), json);
            }
        }
        Ok(map)
    }

    /// Encodes one field, returning `None` if it is skipped.
    pub fn encode_field(
        &mut self,
        field: &FieldDescriptor,
        value: &Value,
        baseline: Option<&Value>,
    ) -> Result<Option<Json>, EncodeError> {
        if delta::should_skip(field, value, baseline, self.options.delta) {
            return Ok(None);
        }

        let instanced = field.is_instanced();
        if field.array_dim() > 1 {
            let Value::Array(items) = value else {
                return Err(self.mismatch(field.type_name(), value));
            };
            return self.encode_elements(field.ty(), instanced, items).map(Some);
        }

        let skip = self.options.delta && !field.flags().contains(FieldFlags::ALWAYS_SERIALIZE);
        self.encode_value(field.ty(), instanced, value, baseline, skip)
    }

    fn encode_value(
        &mut self,
        ty: &FieldType,
        instanced: bool,
        value: &Value,
        baseline: Option<&Value>,
        skip: bool,
    ) -> Result<Option<Json>, EncodeError> {
        if let Some(processor) = self.processor
            && let Some(result) = processor.try_encode(ty, value)
        {
            return result.map(Some).map_err(|message| EncodeError::Rejected {
                path: self.path(),
                message,
            });
        }

        let json = match (ty, value) {
            (FieldType::Bool, Value::Bool(b)) => Json::Bool(*b),
            (FieldType::Int, Value::Int(i)) => Json::from(*i),
            (FieldType::UInt, Value::UInt(u)) => Json::from(*u),
            (FieldType::Float, Value::Float(f)) if f.is_finite() => Json::from(*f),
            // JSON numbers cannot hold NaN or infinities, their text form parses back.
            (FieldType::Float, Value::Float(f)) => {
                log::warn!("{}: non-finite float written as `{f}`", self.path());
                Json::String(f.to_string())
            }
            (FieldType::String, Value::String(s)) => Json::String(s.clone()),
            (FieldType::Enum(info), Value::Enum(v)) => match info.name_of(*v) {
                Some(name) => Json::String(name.to_owned()),
                None => Json::from(*v),
            },
            (FieldType::Struct(_), Value::Struct(instance)) => {
                return self.encode_struct(instance, baseline, skip);
            }
            (FieldType::Array(element), Value::Array(items))
            | (FieldType::Set(element), Value::Set(items)) => {
                self.encode_elements(element, instanced, items)?
            }
            (FieldType::Map(key, item), Value::Map(entries)) => {
                Json::Object(self.encode_map(key, item, instanced, entries)?)
            }
            (FieldType::Object(_), Value::Embedded(object)) if instanced => match object {
                Some(instance) => Json::Object(self.encode_embedded(instance)?),
                None => Json::String(NONE_TEXT.to_owned()),
            },
            (FieldType::Object(_) | FieldType::Interface(_), Value::Reference(object)) => match object {
                Some(object) => Json::String(object.reference_string()),
                None => Json::String(NONE_TEXT.to_owned()),
            },
            (FieldType::SoftObject(_), Value::SoftPath(path)) => match path {
                Some(path) => Json::String(path.to_string()),
                None => Json::String(NONE_TEXT.to_owned()),
            },
            (FieldType::Tag, Value::Tag(tag)) => Json::String(tag.as_str().to_owned()),
            (FieldType::TagContainer, Value::Tags(tags)) => tags
                .iter()
                .map(|tag| Json::String(tag.as_str().to_owned()))
                .collect(),
            _ => return Err(self.mismatch(ty.to_string(), value)),
        };
        Ok(Some(json))
    }

    fn encode_struct(
        &mut self,
        instance: &Instance,
        baseline: Option<&Value>,
        skip: bool,
    ) -> Result<Option<Json>, EncodeError> {
        if let Some(codec) = instance.ty().text_codec() {
            return Ok(Some(Json::String((codec.export)(instance))));
        }

        let base = match baseline {
            Some(Value::Struct(base)) => Some(&**base),
            _ => None,
        };
        let fields = self.encode_fields(instance, base)?;
        if fields.is_empty() && skip && base.is_some() {
            return Ok(None);
        }
        Ok(Some(Json::Object(fields)))
    }

    /// Writes the `_ClassName` tag followed by the fields that differ from
    /// the defaults of the runtime type.
    fn encode_embedded(&mut self, instance: &Instance) -> Result<Map<String, Json>, EncodeError> {
        let defaults = instance.ty().default_instance();
        let baseline = self.options.delta.then_some(&defaults);
        let fields = self.encode_fields(instance, baseline)?;

        let mut map = Map::with_capacity(fields.len() + 1);
        map.insert(CLASS_NAME_KEY.to_owned(), Json::String(instance.ty().path().to_owned()));
        map.extend(fields);
        Ok(map)
    }

    fn encode_elements(
        &mut self,
        element: &FieldType,
        instanced: bool,
        items: &[Value],
    ) -> Result<Json, EncodeError> {
        let scratch = element.default_value(instanced);
        let mut out = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let json = self.scoped(PathSegment::Index(index), |this| {
                this.encode_value(element, instanced, item, Some(&scratch), false)
            })?;
            out.push(json.unwrap_or(Json::Null));
        }
        Ok(Json::Array(out))
    }

    fn encode_map(
        &mut self,
        key_ty: &FieldType,
        value_ty: &FieldType,
        instanced: bool,
        entries: &[(Value, Value)],
    ) -> Result<Map<String, Json>, EncodeError> {
        let scratch = value_ty.default_value(instanced);
        let mut map = Map::with_capacity(entries.len());
        for (index, (key, value)) in entries.iter().enumerate() {
            let mut text = key_text(key_ty, key);
            if text.is_empty() && !matches!(key, Value::String(_)) {
                text = format!("{UNPARSED_KEY} {index}");
                self.warn(IntegrityWarning::DegenerateMapKey {
                    path: self.path(),
                    index,
                    placeholder: text.clone(),
                });
            }
            let json = self.scoped(PathSegment::Key(text.clone()), |this| {
                this.encode_value(value_ty, instanced, value, Some(&scratch), false)
            })?;
            map.insert(text, json.unwrap_or(Json::Null));
        }
        Ok(map)
    }

    // -------------------------------------------------------------------------
    // Helpers

    fn scoped<T>(&mut self, segment: PathSegment, f: impl FnOnce(&mut Self) -> T) -> T {
        self.trail.push(segment);
        let result = f(self);
        self.trail.pop();
        result
    }

    fn path(&self) -> FieldPath {
        FieldPath(self.trail.clone())
    }

    fn warn(&mut self, warning: IntegrityWarning) {
        log::warn!("{warning}");
        self.warnings.push(warning);
    }

    fn mismatch(&self, expected: String, value: &Value) -> EncodeError {
        EncodeError::ValueMismatch {
            path: self.path(),
            expected,
            found: value.kind_name(),
        }
    }
}

/// Text form of a map key, empty if the key has none.
fn key_text(ty: &FieldType, key: &Value) -> String {
    match (ty, key) {
        (_, Value::String(s)) => s.clone(),
        (_, Value::Bool(b)) => b.to_string(),
        (_, Value::Int(i)) => i.to_string(),
        (_, Value::UInt(u)) => u.to_string(),
        (_, Value::Float(f)) => f.to_string(),
        (FieldType::Enum(info), Value::Enum(v)) => match info.name_of(*v) {
            Some(name) => name.to_owned(),
            None => v.to_string(),
        },
        (_, Value::Struct(instance)) => match instance.ty().text_codec() {
            Some(codec) => (codec.export)(instance),
            None => String::new(),
        },
        (_, Value::Tag(tag)) => tag.as_str().to_owned(),
        (_, Value::Reference(Some(object))) => object.reference_string(),
        (_, Value::SoftPath(Some(path))) => path.to_string(),
        _ => String::new(),
    }
}

// -----------------------------------------------------------------------------
// Tests
