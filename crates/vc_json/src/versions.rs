//! Custom versions a document depends on.

use std::collections::BTreeSet;

use serde_json::{Map, Value as Json};
use uuid::Uuid;
use vc_object::info::{FieldType, TypeDescriptor};
use vc_object::registry::TypeRegistry;
use vc_object::value::{Instance, Value};
use vc_object::version::CustomVersionSet;

use crate::error::EnvelopeError;

/// Returns the custom versions the layout of `ty` depends on.
///
/// Walks the fields of `ty`, nested struct types and the declared types of
/// embedded objects. Referenced objects are documents of their own and are
/// not followed.
pub fn relevant_custom_versions(ty: &TypeDescriptor) -> BTreeSet<Uuid> {
    let mut visited = BTreeSet::new();
    let mut guids = BTreeSet::new();
    walk_type(ty, &mut visited, &mut guids);
    guids
}

/// Returns the custom versions written with `instance`.
///
/// Extends [`relevant_custom_versions`] with the runtime types of embedded
/// objects. Each GUID is written at its current registered revision;
/// unregistered GUIDs are left out.
pub fn collect_custom_versions(registry: &TypeRegistry, instance: &Instance) -> CustomVersionSet {
    let mut visited = BTreeSet::new();
    let mut guids = BTreeSet::new();
    walk_type(instance.ty(), &mut visited, &mut guids);
    walk_values(instance.values(), &mut visited, &mut guids);

    let mut versions = CustomVersionSet::new();
    for guid in guids {
        match registry.custom_version(&guid) {
            Some(info) => {
                versions.insert(guid, info.current);
            }
            None => log::warn!("custom version {guid} is not registered and is not written"),
        }
    }
    versions
}

fn walk_type(ty: &TypeDescriptor, visited: &mut BTreeSet<String>, guids: &mut BTreeSet<Uuid>) {
    if !visited.insert(ty.path().to_owned()) {
        return;
    }
    guids.extend(ty.custom_versions().iter().copied());
    for field in ty.fields() {
        walk_field_type(field.ty(), field.is_instanced(), visited, guids);
    }
}

fn walk_field_type(ty: &FieldType, instanced: bool, visited: &mut BTreeSet<String>, guids: &mut BTreeSet<Uuid>) {
    match ty {
        FieldType::Struct(inner) => walk_type(inner, visited, guids),
        FieldType::Object(inner) if instanced => walk_type(inner, visited, guids),
        FieldType::Array(element) | FieldType::Set(element) => walk_field_type(element, instanced, visited, guids),
        FieldType::Map(key, value) => {
            walk_field_type(key, false, visited, guids);
            walk_field_type(value, instanced, visited, guids);
        }
        _ => {}
    }
}

fn walk_values(values: &[Value], visited: &mut BTreeSet<String>, guids: &mut BTreeSet<Uuid>) {
    for value in values {
        walk_value(value, visited, guids);
    }
}

fn walk_value(value: &Value, visited: &mut BTreeSet<String>, guids: &mut BTreeSet<Uuid>) {
    match value {
        Value::Embedded(Some(instance)) => {
            walk_type(instance.ty(), visited, guids);
            walk_values(instance.values(), visited, guids);
        }
        Value::Struct(instance) => walk_values(instance.values(), visited, guids),
        Value::Array(items) | Value::Set(items) => walk_values(items, visited, guids),
        Value::Map(entries) => {
            for (key, item) in entries {
                walk_value(key, visited, guids);
                walk_value(item, visited, guids);
            }
        }
        _ => {}
    }
}

// -----------------------------------------------------------------------------
// JSON form

/// Writes `{ "GUID": revision }` with upper case hyphenated GUIDs.
pub(crate) fn write_custom_versions(versions: &CustomVersionSet) -> Json {
    let map: Map<String, Json> = versions
        .iter()
        .map(|(guid, revision)| (format!("{:X}", guid.hyphenated()), Json::from(revision)))
        .collect();
    Json::Object(map)
}

pub(crate) fn read_custom_versions(json: &Json) -> Result<CustomVersionSet, EnvelopeError> {
    let Json::Object(map) = json else {
        return Err(EnvelopeError::InvalidCustomVersion {
            key: String::new(),
            value: json.clone(),
        });
    };

    let mut versions = CustomVersionSet::new();
    for (key, value) in map {
        let invalid = || EnvelopeError::InvalidCustomVersion {
            key: key.clone(),
            value: value.clone(),
        };
        let guid = Uuid::parse_str(key).map_err(|_| invalid())?;
        let revision = value
            .as_i64()
            .and_then(|r| i32::try_from(r).ok())
            .ok_or_else(invalid)?;
        versions.insert(guid, revision);
    }
    Ok(versions)
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use serde_json::json;
    use uuid::Uuid;

    use super::{collect_custom_versions, read_custom_versions, relevant_custom_versions, write_custom_versions};
    use crate::error::EnvelopeError;
    use crate::fixtures::{Fixture, WIDGET_VERSION};

    #[test]
    fn static_walk_finds_nested_types() {
        let fx = Fixture::new();
        assert!(relevant_custom_versions(&fx.widget).contains(&WIDGET_VERSION));
        assert!(relevant_custom_versions(&fx.holder).is_empty());
    }

    #[test]
    fn live_walk_writes_current_revision() {
        let fx = Fixture::new();
        let versions = collect_custom_versions(&fx.registry, &fx.widget.default_instance());
        assert_eq!(versions.try_get(&WIDGET_VERSION), Some(2));
        assert_eq!(versions.len(), 1);
    }

    #[test]
    fn json_form() {
        let fx = Fixture::new();
        let versions = collect_custom_versions(&fx.registry, &fx.widget.default_instance());
        let json = write_custom_versions(&versions);
        assert_eq!(json, json!({ "5C3E91A2-0B7D-4F6E-8A10-2D4B6C8EF013": 2 }));
        assert_eq!(read_custom_versions(&json).unwrap(), versions);

        let lower = json!({ "5c3e91a2-0b7d-4f6e-8a10-2d4b6c8ef013": 1 });
        assert_eq!(read_custom_versions(&lower).unwrap().try_get(&WIDGET_VERSION), Some(1));

        let bad = json!({ "not-a-guid": 1 });
        assert!(matches!(read_custom_versions(&bad), Err(EnvelopeError::InvalidCustomVersion { .. })));
        let nil = json!({ Uuid::nil().to_string(): "one" });
        assert!(read_custom_versions(&nil).is_err());
    }
}
