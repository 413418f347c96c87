//! Types and documents shared by the unit tests.

use std::sync::Arc;

use serde_json::json;
use vc_json::VersionContext;
use vc_object::info::{FieldDescriptor, FieldType, TypeBuilder, TypeDescriptor};
use vc_object::object::{Object, ObjectHandle};
use vc_object::path::ObjectPath;
use vc_object::registry::TypeRegistry;
use vc_object::value::Value;
use vc_object::version::ToolchainVersion;

use crate::cache::FormatVersion;
use crate::settings::LibrarySettings;
use crate::store::DocumentStore;
use crate::Library;

pub(crate) struct Fixture {
    pub registry: Arc<TypeRegistry>,
    pub asset: Arc<TypeDescriptor>,
    pub weapon: Arc<TypeDescriptor>,
    pub armor: Arc<TypeDescriptor>,
    pub enchanted: Arc<TypeDescriptor>,
    pub note: Arc<TypeDescriptor>,
}

impl Fixture {
    pub fn new() -> Self {
        let mut registry = TypeRegistry::new();
        registry.register_custom_version(FormatVersion::info());

        let asset = TypeBuilder::object("/Script/Game.Asset")
            .abstract_type()
            .field(FieldDescriptor::new("label", FieldType::String))
            .build()
            .unwrap();
        let weapon = TypeBuilder::object("/Script/Game.Weapon")
            .parent(&asset)
            .field(FieldDescriptor::new("damage", FieldType::Int).with_default(10))
            .field(FieldDescriptor::new("upgrade", FieldType::Object(Arc::clone(&asset))))
            .field(FieldDescriptor::new("sequel", FieldType::SoftObject(Arc::clone(&asset))))
            .build()
            .unwrap();
        let armor = TypeBuilder::object("/Script/Game.Armor")
            .parent(&asset)
            .field(FieldDescriptor::new("defense", FieldType::Int))
            .build()
            .unwrap();
        let enchanted = TypeBuilder::object("/Script/Game.Enchanted")
            .parent(&weapon)
            .field(FieldDescriptor::new("power", FieldType::Float))
            .build()
            .unwrap();
        let note = TypeBuilder::object("/Script/Game.Note")
            .field(FieldDescriptor::new("text", FieldType::String))
            .build()
            .unwrap();

        for ty in [&asset, &weapon, &armor, &enchanted, &note] {
            registry.register(Arc::clone(ty));
        }

        Self {
            registry: Arc::new(registry),
            asset,
            weapon,
            armor,
            enchanted,
            note,
        }
    }

    pub fn context() -> VersionContext {
        VersionContext::new(ToolchainVersion::new(1, 4, 0, 2210, "main"))
    }

    pub fn library(&self, store: impl DocumentStore + 'static, settings: LibrarySettings) -> Library {
        Library::new(Arc::clone(&self.registry), store, Arc::clone(&self.asset), settings).with_context(Self::context())
    }
}

pub(crate) fn path(text: &str) -> ObjectPath {
    ObjectPath::parse(text).unwrap()
}

/// A weapon document, optionally referencing another asset.
pub(crate) fn weapon_document(damage: i64, upgrade: Option<&str>) -> String {
    let mut data = json!({ "damage": damage });
    if let Some(upgrade) = upgrade {
        data["upgrade"] = json!(format!("/Script/Game.Weapon'{}'", path(upgrade)));
    }
    json!({ "Class": "/Script/Game.Weapon", "Data": data }).to_string()
}

pub(crate) fn armor_document(defense: i64) -> String {
    json!({ "Class": "/Script/Game.Armor", "Data": { "defense": defense } }).to_string()
}

pub(crate) fn int_field(object: &Object, name: &str) -> i64 {
    match object.read().get(name) {
        Some(Value::Int(value)) => *value,
        other => panic!("`{name}` is not an int: {other:?}"),
    }
}

pub(crate) fn reference_field(object: &Object, name: &str) -> Option<ObjectHandle> {
    match object.read().get(name) {
        Some(Value::Reference(handle)) => handle.clone(),
        other => panic!("`{name}` is not a reference: {other:?}"),
    }
}
