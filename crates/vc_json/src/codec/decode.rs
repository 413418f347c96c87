use core::mem;
use std::sync::Arc;

use serde_json::{Map, Value as Json};
use vc_object::info::{CLASS_NAME_KEY, EnumInfo, FieldDescriptor, FieldFlags, FieldType, TypeDescriptor};
use vc_object::object::ObjectHandle;
use vc_object::path::{NONE_TEXT, ObjectPath};
use vc_object::registry::TypeRegistry;
use vc_object::tags::{Tag, TagContainer};
use vc_object::value::{Instance, Value};
use vc_object::version::CustomVersionSet;

use super::processor::DecodeProcessor;
use crate::error::{DecodeReport, FieldError, FieldErrorKind, FieldPath, IntegrityWarning, PathSegment, json_kind};
use crate::options::DecodeOptions;
use crate::resolver::ObjectResolver;

// -----------------------------------------------------------------------------
// Decoder

/// Writes JSON into live values.
///
/// Fields absent from the JSON keep their current value, so decoding into
/// a default instance restores everything a delta encoder left out.
///
/// In lenient mode a field that fails to decode is restored to its previous
/// value and the error is recorded in the [`DecodeReport`]. In strict mode
/// the first failure is returned.
///
/// # Examples
///
/// ```
/// use vc_json::codec::Decoder;
/// use vc_json::{DecodeOptions, NoResolver};
/// use vc_object::info::{FieldDescriptor, FieldType, TypeBuilder};
/// use vc_object::registry::TypeRegistry;
/// use vc_object::value::Value;
/// use vc_object::version::CustomVersionSet;
///
/// let point = TypeBuilder::structure("Point")
///     .field(FieldDescriptor::new("x", FieldType::Int))
///     .field(FieldDescriptor::new("y", FieldType::Int))
///     .build()
///     .unwrap();
///
/// let registry = TypeRegistry::new();
/// let versions = CustomVersionSet::new();
/// let json = serde_json::json!({ "x": 5, "y": "seven" });
///
/// let mut p = point.default_instance();
/// let mut decoder = Decoder::new(&registry, &NoResolver, &versions, DecodeOptions::LENIENT);
/// decoder.decode_fields(json.as_object().unwrap(), &mut p).unwrap();
///
/// assert!(matches!(p.get("x"), Some(Value::Int(5))));
/// assert!(matches!(p.get("y"), Some(Value::Int(0))));
/// assert_eq!(decoder.report().recovered.len(), 1);
/// ```
pub struct Decoder<'a, P: DecodeProcessor = ()> {
    registry: &'a TypeRegistry,
    resolver: &'a dyn ObjectResolver,
    versions: &'a CustomVersionSet,
    options: DecodeOptions,
    processor: Option<&'a P>,
    trail: Vec<PathSegment>,
    report: DecodeReport,
}

impl<'a> Decoder<'a, ()> {
    /// Creates a decoder without a processor.
    pub fn new(
        registry: &'a TypeRegistry,
        resolver: &'a dyn ObjectResolver,
        versions: &'a CustomVersionSet,
        options: DecodeOptions,
    ) -> Self {
        Self {
            registry,
            resolver,
            versions,
            options,
            processor: None,
            trail: Vec::new(),
            report: DecodeReport::default(),
        }
    }
}

impl<'a, P: DecodeProcessor> Decoder<'a, P> {
    /// Replaces the processor consulted before the default rules.
    pub fn processor<Q: DecodeProcessor>(self, processor: &'a Q) -> Decoder<'a, Q> {
        Decoder {
            registry: self.registry,
            resolver: self.resolver,
            versions: self.versions,
            options: self.options,
            processor: Some(processor),
            trail: self.trail,
            report: self.report,
        }
    }

    #[inline]
    pub fn report(&self) -> &DecodeReport {
        &self.report
    }

    #[inline]
    pub fn into_report(self) -> DecodeReport {
        self.report
    }

    /// Decodes a JSON object into the fields of `instance`, then runs the
    /// finalize hook of its type.
    ///
    /// Keys are matched to field names exactly first, then ignoring ASCII
    /// case. Unknown keys and `null` values are ignored.
    pub fn decode_fields(&mut self, map: &Map<String, Json>, instance: &mut Instance) -> Result<(), FieldError> {
        let ty = Arc::clone(instance.ty());

        for (index, field) in ty.fields().iter().enumerate() {
            if field.flags().contains(FieldFlags::TRANSIENT) {
                continue;
            }
            let segment = PathSegment::Field(field.name().to_owned());

            let Some(json) = lookup(map, field.name()) else {
                if self.options.require_all_fields {
                    let error = self.scoped(segment, |this| this.fail(FieldErrorKind::MissingField));
                    self.recover(error)?;
                }
                continue;
            };
            if json.is_null() {
                continue;
            }
            let Some(slot) = instance.field_at_mut(index) else {
                continue;
            };

            let previous = (!self.options.strict).then(|| slot.clone());
            if let Err(error) = self.scoped(segment, |this| this.decode_field(field, json, slot)) {
                if let Some(previous) = previous {
                    *slot = previous;
                }
                self.recover(error)?;
            }
        }

        if let Some(finalize) = ty.finalize_hook() {
            finalize(instance, self.versions);
        }
        Ok(())
    }

    /// Decodes one field into `slot`.
    ///
    /// On failure `slot` may hold a partially decoded value.
    pub fn decode_field(&mut self, field: &FieldDescriptor, json: &Json, slot: &mut Value) -> Result<(), FieldError> {
        let capacity = field.array_dim();
        if capacity <= 1 {
            return self.decode_value(field.ty(), field.is_instanced(), json, slot);
        }

        let found = slot.kind_name();
        let Value::Array(items) = slot else {
            return Err(self.fail(FieldErrorKind::TypeMismatch {
                expected: field.type_name(),
                found,
            }));
        };

        match json {
            Json::Array(elements) => {
                if elements.len() != capacity && self.options.strict {
                    return Err(self.fail(FieldErrorKind::ArraySizeMismatch {
                        found: elements.len(),
                        capacity,
                    }));
                }
                if elements.len() > capacity {
                    self.warn(IntegrityWarning::ExcessElementsTrimmed {
                        path: self.path(),
                        found: elements.len(),
                        capacity,
                    });
                }
                for (index, (element, item)) in elements.iter().zip(items.iter_mut()).enumerate() {
                    if element.is_null() {
                        continue;
                    }
                    self.scoped(PathSegment::Index(index), |this| {
                        this.decode_value(field.ty(), field.is_instanced(), element, item)
                    })?;
                }
                Ok(())
            }
            scalar => {
                if self.options.strict {
                    return Err(self.mismatch(field.type_name(), scalar));
                }
                self.warn(IntegrityWarning::ScalarIntoFixedArray {
                    path: self.path(),
                    capacity,
                });
                match items.first_mut() {
                    Some(first) => self.scoped(PathSegment::Index(0), |this| {
                        this.decode_value(field.ty(), field.is_instanced(), scalar, first)
                    }),
                    None => Ok(()),
                }
            }
        }
    }

    fn decode_value(&mut self, ty: &FieldType, instanced: bool, json: &Json, slot: &mut Value) -> Result<(), FieldError> {
        if let Some(processor) = self.processor
            && let Some(result) = processor.try_decode(ty, json, slot)
        {
            return result.map_err(|message| self.fail(FieldErrorKind::Rejected(message)));
        }

        match ty {
            FieldType::Bool => *slot = Value::Bool(self.read_bool(json)?),
            FieldType::Int => *slot = Value::Int(self.read_int(json)?),
            FieldType::UInt => *slot = Value::UInt(self.read_uint(json)?),
            FieldType::Float => *slot = Value::Float(self.read_float(json)?),
            FieldType::String => *slot = Value::String(self.read_string(json)?),
            FieldType::Enum(info) => *slot = Value::Enum(self.read_enum(info, json)?),
            FieldType::Struct(declared) => return self.decode_struct(declared, json, slot),
            FieldType::Array(element) => {
                *slot = Value::Array(self.decode_elements(ty, element, instanced, json)?);
            }
            FieldType::Set(element) => {
                *slot = Value::Set(self.decode_elements(ty, element, instanced, json)?);
            }
            FieldType::Map(key, value) => *slot = Value::Map(self.decode_map(ty, key, value, instanced, json)?),
            FieldType::Object(declared) if instanced => {
                *slot = Value::Embedded(self.decode_embedded(declared, json)?.map(Box::new));
            }
            FieldType::Object(declared) => *slot = Value::Reference(self.decode_reference(declared, json)?),
            FieldType::Interface(name) => *slot = Value::Reference(self.decode_interface(name, json)?),
            FieldType::SoftObject(_) => *slot = Value::SoftPath(self.read_soft_path(json)?),
            FieldType::Tag => *slot = Value::Tag(self.read_tag(json)?),
            FieldType::TagContainer => *slot = Value::Tags(self.decode_tags(json)?),
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Scalars

    fn read_bool(&self, json: &Json) -> Result<bool, FieldError> {
        match json {
            Json::Bool(b) => Ok(*b),
            Json::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
            Json::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
            _ => Err(self.mismatch("bool", json)),
        }
    }

    fn read_int(&self, json: &Json) -> Result<i64, FieldError> {
        match json {
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    return Ok(i);
                }
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => Ok(f as i64),
                    _ => Err(self.out_of_range(n.to_string(), "int")),
                }
            }
            Json::String(s) => s.trim().parse().map_err(|_| self.mismatch("int", json)),
            _ => Err(self.mismatch("int", json)),
        }
    }

    fn read_uint(&self, json: &Json) -> Result<u64, FieldError> {
        match json {
            Json::Number(n) => {
                if let Some(u) = n.as_u64() {
                    return Ok(u);
                }
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f >= 0.0 && f < u64::MAX as f64 => Ok(f as u64),
                    _ => Err(self.out_of_range(n.to_string(), "uint")),
                }
            }
            Json::String(s) => s.trim().parse().map_err(|_| self.mismatch("uint", json)),
            _ => Err(self.mismatch("uint", json)),
        }
    }

    fn read_float(&self, json: &Json) -> Result<f64, FieldError> {
        match json {
            Json::Number(n) => n.as_f64().ok_or_else(|| self.mismatch("float", json)),
            Json::String(s) => s.trim().parse().map_err(|_| self.mismatch("float", json)),
            _ => Err(self.mismatch("float", json)),
        }
    }

    fn read_string(&self, json: &Json) -> Result<String, FieldError> {
        match json {
            Json::String(s) => Ok(s.clone()),
            Json::Number(n) => Ok(n.to_string()),
            Json::Bool(b) => Ok(b.to_string()),
            _ => Err(self.mismatch("string", json)),
        }
    }

    fn read_enum(&self, info: &EnumInfo, json: &Json) -> Result<i64, FieldError> {
        match json {
            Json::String(name) => info.value_of(name.trim()).ok_or_else(|| {
                self.fail(FieldErrorKind::UnknownEnumName {
                    enum_name: info.path().to_owned(),
                    name: name.clone(),
                })
            }),
            Json::Number(n) if !self.options.strict => n.as_i64().ok_or_else(|| self.mismatch(info.path(), json)),
            _ => Err(self.mismatch(info.path(), json)),
        }
    }

    fn read_tag(&self, json: &Json) -> Result<Tag, FieldError> {
        let Json::String(name) = json else {
            return Err(self.mismatch("tag", json));
        };
        let name = name.trim();
        if name.is_empty() || name == NONE_TEXT {
            return Ok(Tag::none());
        }
        self.registry.tags().request(name).ok_or_else(|| {
            self.fail(FieldErrorKind::InvalidTag {
                tag: name.to_owned(),
            })
        })
    }

    // -------------------------------------------------------------------------
    // Structs and containers

    fn decode_struct(&mut self, declared: &Arc<TypeDescriptor>, json: &Json, slot: &mut Value) -> Result<(), FieldError> {
        let mut instance = match mem::replace(slot, Value::Bool(false)) {
            Value::Struct(instance) if Arc::ptr_eq(instance.ty(), declared) => instance,
            _ => Box::new(declared.default_instance()),
        };

        let result = match json {
            Json::Object(map) => self.decode_fields(map, &mut instance),
            Json::String(text) => match declared.text_codec() {
                Some(codec) if (codec.import)(text, &mut instance) => Ok(()),
                _ => Err(self.fail(FieldErrorKind::MalformedText {
                    type_name: declared.path().to_owned(),
                    text: text.clone(),
                })),
            },
            other => Err(self.mismatch(declared.path(), other)),
        };

        *slot = Value::Struct(instance);
        result
    }

    fn decode_elements(
        &mut self,
        container: &FieldType,
        element: &FieldType,
        instanced: bool,
        json: &Json,
    ) -> Result<Vec<Value>, FieldError> {
        let Json::Array(elements) = json else {
            return Err(self.mismatch(container, json));
        };
        let unique = matches!(container, FieldType::Set(_));

        let mut items: Vec<Value> = Vec::with_capacity(elements.len());
        for (index, element_json) in elements.iter().enumerate() {
            let mut item = element.default_value(instanced);
            if !element_json.is_null() {
                self.scoped(PathSegment::Index(index), |this| {
                    this.decode_value(element, instanced, element_json, &mut item)
                })?;
            }
            if unique && items.iter().any(|existing| existing.identical(&item)) {
                continue;
            }
            items.push(item);
        }
        Ok(items)
    }

    fn decode_map(
        &mut self,
        container: &FieldType,
        key_ty: &FieldType,
        value_ty: &FieldType,
        instanced: bool,
        json: &Json,
    ) -> Result<Vec<(Value, Value)>, FieldError> {
        let Json::Object(map) = json else {
            return Err(self.mismatch(container, json));
        };

        let mut entries: Vec<(Value, Value)> = Vec::with_capacity(map.len());
        for (text, value_json) in map {
            if value_json.is_null() {
                continue;
            }
            let (key, value) = self.scoped(PathSegment::Key(text.clone()), |this| -> Result<_, FieldError> {
                let mut key = key_ty.default_value(false);
                this.decode_value(key_ty, false, &Json::String(text.clone()), &mut key)?;
                let mut value = value_ty.default_value(instanced);
                this.decode_value(value_ty, instanced, value_json, &mut value)?;
                Ok((key, value))
            })?;

            match entries.iter_mut().find(|(existing, _)| existing.identical(&key)) {
                Some(entry) => entry.1 = value,
                None => entries.push((key, value)),
            }
        }
        Ok(entries)
    }

    fn decode_tags(&mut self, json: &Json) -> Result<TagContainer, FieldError> {
        let Json::Array(names) = json else {
            return Err(self.mismatch("tag container", json));
        };

        let mut tags = TagContainer::new();
        for (index, name) in names.iter().enumerate() {
            let text = match name {
                Json::String(s) => s.trim().to_owned(),
                other => other.to_string(),
            };
            if text.is_empty() {
                continue;
            }
            match self.registry.tags().request(&text) {
                Some(tag) => {
                    tags.add(tag);
                }
                None => self.scoped(PathSegment::Index(index), |this| {
                    this.warn(IntegrityWarning::InvalidTagDropped {
                        path: this.path(),
                        tag: text,
                    });
                }),
            }
        }
        Ok(tags)
    }

    // -------------------------------------------------------------------------
    // Objects

    /// Decodes an embedded object block.
    ///
    /// Returns `None` for `"None"`, `""` and for abstract types.
    fn decode_embedded(&mut self, declared: &Arc<TypeDescriptor>, json: &Json) -> Result<Option<Instance>, FieldError> {
        let map = match json {
            Json::String(s) if s.is_empty() || s == NONE_TEXT => return Ok(None),
            Json::Object(map) => map,
            other => return Err(self.mismatch(declared.path(), other)),
        };

        let mut ty = Arc::clone(declared);
        if let Some(tag) = map.get(CLASS_NAME_KEY) {
            let name = match tag {
                Json::String(s) => s.clone(),
                other => other.to_string(),
            };
            match self.registry.resolve_type(&name) {
                Some(resolved) if resolved.is_child_of(declared) => ty = resolved,
                Some(resolved) => self.warn(IntegrityWarning::IncompatibleClassTag {
                    path: self.path(),
                    tag: resolved.path().to_owned(),
                    declared: declared.path().to_owned(),
                }),
                None => self.warn(IntegrityWarning::UnknownClassTag {
                    path: self.path(),
                    tag: name,
                    declared: declared.path().to_owned(),
                }),
            }
        }

        if ty.is_abstract() {
            self.warn(IntegrityWarning::AbstractClassIgnored {
                path: self.path(),
                class: ty.path().to_owned(),
            });
            return Ok(None);
        }

        let mut instance = ty.default_instance();
        self.decode_fields(map, &mut instance)?;
        Ok(Some(instance))
    }

    fn decode_reference(&mut self, declared: &TypeDescriptor, json: &Json) -> Result<Option<ObjectHandle>, FieldError> {
        let Some(object) = self.resolve(json)? else {
            return Ok(None);
        };
        if !object.ty().is_child_of(declared) {
            return Err(self.fail(FieldErrorKind::NotAssignable {
                expected: declared.path().to_owned(),
                found: object.ty().path().to_owned(),
            }));
        }
        Ok(Some(object))
    }

    fn decode_interface(&mut self, interface: &str, json: &Json) -> Result<Option<ObjectHandle>, FieldError> {
        let Some(object) = self.resolve(json)? else {
            return Ok(None);
        };
        if !object.ty().implements(interface) {
            self.warn(IntegrityWarning::InterfaceNotImplemented {
                path: self.path(),
                object: object.reference_string(),
                interface: interface.to_owned(),
            });
            return Ok(None);
        }
        Ok(Some(object))
    }

    /// Reads the identity of a soft reference without resolving it.
    fn read_soft_path(&self, json: &Json) -> Result<Option<ObjectPath>, FieldError> {
        let Json::String(text) = json else {
            return Err(self.mismatch("an object path", json));
        };
        let text = text.trim();
        if text.is_empty() || text == NONE_TEXT {
            return Ok(None);
        }
        ObjectPath::parse(text).map(Some).map_err(|_| {
            self.fail(FieldErrorKind::MalformedText {
                type_name: "object path".to_owned(),
                text: text.to_owned(),
            })
        })
    }

    fn resolve(&self, json: &Json) -> Result<Option<ObjectHandle>, FieldError> {
        let Json::String(text) = json else {
            return Err(self.mismatch("an object reference", json));
        };
        let text = text.trim();
        if text.is_empty() || text == NONE_TEXT {
            return Ok(None);
        }

        let unresolvable = || {
            self.fail(FieldErrorKind::UnresolvableReference {
                reference: text.to_owned(),
            })
        };
        let path = ObjectPath::parse(text).map_err(|_| unresolvable())?;
        match self.resolver.resolve_reference(&path) {
            Some(object) => Ok(Some(object)),
            None => Err(unresolvable()),
        }
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

    fn fail(&self, kind: FieldErrorKind) -> FieldError {
        FieldError { path: self.path(), kind }
    }

    fn mismatch(&self, expected: impl ToString, json: &Json) -> FieldError {
        self.fail(FieldErrorKind::TypeMismatch {
            expected: expected.to_string(),
            found: json_kind(json),
        })
    }

    fn out_of_range(&self, value: String, expected: &'static str) -> FieldError {
        self.fail(FieldErrorKind::OutOfRange { value, expected })
    }

    fn warn(&mut self, warning: IntegrityWarning) {
        log::warn!("{warning}");
        self.report.warnings.push(warning);
    }

    fn recover(&mut self, error: FieldError) -> Result<(), FieldError> {
        if self.options.strict {
            return Err(error);
        }
        log::warn!("{error}, the field keeps its previous value");
        self.report.recovered.push(error);
        Ok(())
    }
}

fn lookup<'m>(map: &'m Map<String, Json>, name: &str) -> Option<&'m Json> {
    map.get(name).or_else(|| {
        map.iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    })
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use serde_json::{Value as Json, json};
    use vc_object::info::FieldType;
    use vc_object::path::ObjectPath;
    use vc_object::tags::Tag;
    use vc_object::value::{Instance, Value};
    use vc_object::version::CustomVersionSet;

    use super::Decoder;
    use crate::codec::DecodeProcessor;
    use crate::error::{DecodeReport, FieldError, FieldErrorKind, IntegrityWarning};
    use crate::fixtures::Fixture;
    use crate::options::DecodeOptions;
    use crate::resolver::ObjectResolver;

    fn decode(fx: &Fixture, target: &mut Instance, json: Json, options: DecodeOptions) -> Result<DecodeReport, FieldError> {
        let versions = CustomVersionSet::new();
        let mut decoder = Decoder::new(&fx.registry, fx, &versions, options);
        decoder.decode_fields(json.as_object().unwrap(), target)?;
        Ok(decoder.into_report())
    }

    #[test]
    fn enum_by_name() {
        let fx = Fixture::new();
        let mut widget = fx.widget.default_instance();
        let report = decode(&fx, &mut widget, json!({ "tag": "BLUE" }), DecodeOptions::STRICT).unwrap();
        assert!(report.is_clean());
        assert!(matches!(widget.get("tag"), Some(Value::Enum(30))));

        decode(&fx, &mut widget, json!({ "tag": "Color::GREEN" }), DecodeOptions::STRICT).unwrap();
        assert!(matches!(widget.get("tag"), Some(Value::Enum(20))));
    }

    #[test]
    fn numeric_enum_only_when_lenient() {
        let fx = Fixture::new();
        let mut widget = fx.widget.default_instance();
        decode(&fx, &mut widget, json!({ "tag": 20 }), DecodeOptions::LENIENT).unwrap();
        assert!(matches!(widget.get("tag"), Some(Value::Enum(20))));

        let error = decode(&fx, &mut widget, json!({ "tag": 30 }), DecodeOptions::STRICT).unwrap_err();
        assert!(matches!(error.kind, FieldErrorKind::TypeMismatch { .. }));
    }

    #[test]
    fn unknown_enum_name_keeps_previous_value() {
        let fx = Fixture::new();
        let mut widget = fx.widget.default_instance().with("tag", Value::Enum(20)).unwrap();
        let report = decode(&fx, &mut widget, json!({ "tag": "PURPLE", "count": 4 }), DecodeOptions::LENIENT).unwrap();

        assert!(matches!(widget.get("tag"), Some(Value::Enum(20))));
        assert!(matches!(widget.get("count"), Some(Value::UInt(4))));
        assert_eq!(report.recovered.len(), 1);
        assert_eq!(report.recovered[0].to_string(), "tag: `PURPLE` is not a constant of enum `/Script/Game.Color`");
    }

    #[test]
    fn fixed_array_lenient_and_strict() {
        let fx = Fixture::new();
        let mut widget = fx.widget.default_instance();
        let report = decode(&fx, &mut widget, json!({ "items": [1, 2, 3] }), DecodeOptions::LENIENT).unwrap();
        assert!(widget.get("items").unwrap().identical(&Value::Array(vec![Value::Int(1), Value::Int(2)])));
        assert!(matches!(
            report.warnings.as_slice(),
            [IntegrityWarning::ExcessElementsTrimmed { found: 3, capacity: 2, .. }]
        ));

        let mut strict = fx.widget.default_instance();
        let error = decode(&fx, &mut strict, json!({ "items": [1, 2, 3] }), DecodeOptions::STRICT).unwrap_err();
        assert_eq!(error.kind, FieldErrorKind::ArraySizeMismatch { found: 3, capacity: 2 });

        let mut scalar = fx.widget.default_instance();
        let report = decode(&fx, &mut scalar, json!({ "items": 7 }), DecodeOptions::LENIENT).unwrap();
        assert!(scalar.get("items").unwrap().identical(&Value::Array(vec![Value::Int(7), Value::Int(0)])));
        assert!(matches!(report.warnings.as_slice(), [IntegrityWarning::ScalarIntoFixedArray { .. }]));
    }

    #[test]
    fn failing_container_is_left_untouched() {
        let fx = Fixture::new();
        let labels = Value::Array(vec!["keep".into()]);
        let mut widget = fx.widget.default_instance().with("labels", labels.clone()).unwrap();

        let report = decode(&fx, &mut widget, json!({ "labels": { "a": 1 } }), DecodeOptions::LENIENT).unwrap();
        assert!(widget.get("labels").unwrap().identical(&labels));
        assert_eq!(report.recovered.len(), 1);

        let report = decode(&fx, &mut widget, json!({ "scores": ["x"] }), DecodeOptions::LENIENT).unwrap();
        assert!(matches!(report.recovered[0].kind, FieldErrorKind::TypeMismatch { .. }));
    }

    #[test]
    fn failure_trail_names_the_field() {
        let fx = Fixture::new();
        let mut holder = fx.holder.default_instance();
        let json = json!({ "shapes": [{ "_ClassName": "Circle" }, { "_ClassName": "Circle", "radius": "wide" }] });
        let error = decode(&fx, &mut holder, json, DecodeOptions::STRICT).unwrap_err();
        assert_eq!(error.to_string(), "shapes[1].radius: expected float, found string");
    }

    #[test]
    fn abstract_class_tag_leaves_field_empty() {
        let fx = Fixture::new();
        let mut holder = fx.holder.default_instance();
        let json = json!({ "shape": { "_ClassName": "AbstractBase", "radius": 3.0 } });
        let report = decode(&fx, &mut holder, json, DecodeOptions::STRICT).unwrap();

        assert!(matches!(holder.get("shape"), Some(Value::Embedded(None))));
        assert!(matches!(
            report.warnings.as_slice(),
            [IntegrityWarning::AbstractClassIgnored { class, .. }] if class == "/Script/Game.AbstractBase"
        ));
    }

    #[test]
    fn class_tag_falls_back_to_declared_type() {
        let fx = Fixture::new();
        let mut holder = fx.holder.default_instance();
        let json = json!({ "shape": { "_ClassName": "Missing", "radius": 3.0 } });
        let report = decode(&fx, &mut holder, json, DecodeOptions::LENIENT).unwrap();

        // The declared type is abstract as well.
        assert!(matches!(holder.get("shape"), Some(Value::Embedded(None))));
        assert!(matches!(
            report.warnings.as_slice(),
            [IntegrityWarning::UnknownClassTag { .. }, IntegrityWarning::AbstractClassIgnored { .. }]
        ));

        let mut holder = fx.holder.default_instance();
        let json = json!({ "shape": { "_ClassName": "/Script/Game.OldCircle", "radius": 3.0 } });
        decode(&fx, &mut holder, json, DecodeOptions::STRICT).unwrap();
        let Some(Value::Embedded(Some(shape))) = holder.get("shape") else {
            panic!("expected a circle");
        };
        assert_eq!(shape.ty().path(), "/Script/Game.Circle");
        assert!(matches!(shape.get("radius"), Some(Value::Float(r)) if *r == 3.0));
    }

    #[test]
    fn embedded_none() {
        let fx = Fixture::new();
        let mut holder = fx.holder.default_instance().with("shape", fx.circle.default_instance()).unwrap();
        decode(&fx, &mut holder, json!({ "shape": "None" }), DecodeOptions::STRICT).unwrap();
        assert!(matches!(holder.get("shape"), Some(Value::Embedded(None))));
    }

    #[test]
    fn references_resolve_by_identity() {
        let fx = Fixture::new();
        let unit = fx.object("/Data/Shapes/Unit", &fx.circle);
        let mut holder = fx.holder.default_instance();
        let json = json!({ "target": "/Script/Game.Circle'/Data/Shapes/Unit.Unit'", "named": "/Data/Shapes/Unit" });
        decode(&fx, &mut holder, json, DecodeOptions::STRICT).unwrap();

        let Some(Value::Reference(Some(target))) = holder.get("target") else {
            panic!("expected a reference");
        };
        assert!(std::sync::Arc::ptr_eq(target, &unit));
        assert!(matches!(holder.get("named"), Some(Value::Reference(Some(_)))));

        let error = decode(&fx, &mut holder, json!({ "target": "/Data/Missing" }), DecodeOptions::STRICT).unwrap_err();
        assert!(matches!(error.kind, FieldErrorKind::UnresolvableReference { .. }));

        let _knob = fx.object("/Data/Widgets/Knob", &fx.widget);
        let error = decode(&fx, &mut holder, json!({ "target": "/Data/Widgets/Knob" }), DecodeOptions::STRICT).unwrap_err();
        assert!(matches!(error.kind, FieldErrorKind::NotAssignable { .. }));
    }

    #[test]
    fn interface_mismatch_is_a_warning() {
        let fx = Fixture::new();
        let _square = fx.object("/Data/Shapes/Box", &fx.square);
        let mut holder = fx.holder.default_instance();
        let report = decode(&fx, &mut holder, json!({ "named": "/Data/Shapes/Box" }), DecodeOptions::STRICT).unwrap();
        assert!(matches!(holder.get("named"), Some(Value::Reference(None))));
        assert!(matches!(report.warnings.as_slice(), [IntegrityWarning::InterfaceNotImplemented { .. }]));
    }

    #[test]
    fn tags_are_validated() {
        let fx = Fixture::new();
        let mut widget = fx.widget.default_instance();
        let json = json!({ "flags": ["Status.Active", "Status.Bogus", "Status.Active"], "category": "Status.Hidden" });
        let report = decode(&fx, &mut widget, json, DecodeOptions::STRICT).unwrap();

        let Some(Value::Tags(flags)) = widget.get("flags") else {
            panic!("expected tags");
        };
        assert_eq!(flags.len(), 1);
        assert!(flags.has_tag(&Tag::new("Status")));
        assert!(matches!(report.warnings.as_slice(), [IntegrityWarning::InvalidTagDropped { tag, .. }] if tag == "Status.Bogus"));

        let error = decode(&fx, &mut widget, json!({ "category": "Nope" }), DecodeOptions::STRICT).unwrap_err();
        assert!(matches!(error.kind, FieldErrorKind::InvalidTag { .. }));
    }

    #[test]
    fn maps_and_sets() {
        let fx = Fixture::new();
        let mut widget = fx.widget.default_instance();
        let json = json!({ "scores": { "a": 1, "b": "2" }, "ids": [3, 1, 3], "weights": { "7": 0.5 } });
        decode(&fx, &mut widget, json, DecodeOptions::STRICT).unwrap();

        let expected = Value::Map(vec![("a".into(), Value::Int(1)), ("b".into(), Value::Int(2))]);
        assert!(widget.get("scores").unwrap().identical(&expected));
        assert!(widget.get("ids").unwrap().identical(&Value::Set(vec![Value::Int(1), Value::Int(3)])));
        let weights = Value::Map(vec![(Value::Int(7), Value::Float(0.5))]);
        assert!(widget.get("weights").unwrap().identical(&weights));
    }

    #[test]
    fn keys_match_ignoring_case_and_missing_fields() {
        let fx = Fixture::new();
        let mut point = fx.point.default_instance();
        decode(&fx, &mut point, json!({ "X": 4 }), DecodeOptions::STRICT).unwrap();
        assert!(matches!(point.get("x"), Some(Value::Int(4))));

        let required = DecodeOptions::STRICT.with_required_fields(true);
        let error = decode(&fx, &mut point, json!({ "x": 1 }), required).unwrap_err();
        assert_eq!(error.kind, FieldErrorKind::MissingField);
        assert_eq!(error.to_string(), "y: the field is missing from the document");
    }

    #[test]
    fn finalize_runs_once() {
        let fx = Fixture::new();
        let mut counter = fx.counter.default_instance();
        decode(&fx, &mut counter, json!({ "value": 3 }), DecodeOptions::STRICT).unwrap();
        assert!(matches!(counter.get("finalized"), Some(Value::Int(1))));
    }

    #[test]
    fn text_codec_structs() {
        let fx = Fixture::new();
        let mut widget = fx.widget.default_instance();
        decode(&fx, &mut widget, json!({ "tint": "(R=1,G=2,B=3)" }), DecodeOptions::STRICT).unwrap();
        let Some(Value::Struct(tint)) = widget.get("tint") else {
            panic!("expected a struct");
        };
        assert!(matches!(tint.get("g"), Some(Value::Int(2))));

        let error = decode(&fx, &mut widget, json!({ "tint": "purple" }), DecodeOptions::STRICT).unwrap_err();
        assert!(matches!(error.kind, FieldErrorKind::MalformedText { .. }));
    }

    #[test]
    fn soft_paths_are_kept_unresolved() {
        let fx = Fixture::new();
        let mut holder = fx.holder.default_instance();
        let json = json!({ "later": "/Script/Game.Circle'/Data/Shapes/Far.Far'" });
        let report = decode(&fx, &mut holder, json, DecodeOptions::STRICT).unwrap();
        assert!(report.is_clean());
        let far = ObjectPath::parse("/Data/Shapes/Far").unwrap();
        assert!(matches!(holder.get("later"), Some(Value::SoftPath(Some(path))) if *path == far));
        assert!(fx.resolve_reference(&far).is_none());

        decode(&fx, &mut holder, json!({ "later": "None" }), DecodeOptions::STRICT).unwrap();
        assert!(matches!(holder.get("later"), Some(Value::SoftPath(None))));

        let error = decode(&fx, &mut holder, json!({ "later": "Far" }), DecodeOptions::STRICT).unwrap_err();
        assert!(matches!(error.kind, FieldErrorKind::MalformedText { .. }));
        let error = decode(&fx, &mut holder, json!({ "later": 3 }), DecodeOptions::STRICT).unwrap_err();
        assert!(matches!(error.kind, FieldErrorKind::TypeMismatch { .. }));
    }

    struct HexInts;

    impl DecodeProcessor for HexInts {
        fn try_decode(&self, ty: &FieldType, json: &Json, slot: &mut Value) -> Option<Result<(), String>> {
            let (FieldType::Int, Json::String(text)) = (ty, json) else {
                return None;
            };
            let parsed = text
                .strip_prefix("0x")
                .and_then(|digits| i64::from_str_radix(digits, 16).ok());
            Some(match parsed {
                Some(value) => {
                    *slot = Value::Int(value);
                    Ok(())
                }
                None => Err(format!("`{text}` is not hexadecimal")),
            })
        }
    }

    #[test]
    fn processor_overrides_default_rules() {
        let fx = Fixture::new();
        let versions = CustomVersionSet::new();
        let mut point = fx.point.default_instance();

        let mut decoder = Decoder::new(&fx.registry, &fx, &versions, DecodeOptions::STRICT).processor(&HexInts);
        decoder
            .decode_fields(json!({ "x": "0xff", "y": 3 }).as_object().unwrap(), &mut point)
            .unwrap();
        assert!(matches!(point.get("x"), Some(Value::Int(255))));
        assert!(matches!(point.get("y"), Some(Value::Int(3))));

        let error = decoder
            .decode_fields(json!({ "x": "ff" }).as_object().unwrap(), &mut point)
            .unwrap_err();
        assert_eq!(error.kind, FieldErrorKind::Rejected("`ff` is not hexadecimal".to_owned()));
        assert!(matches!(point.get("x"), Some(Value::Int(255))));
    }
}
