//! Types shared by the unit tests.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;
use vc_object::info::{EnumInfo, FieldDescriptor, FieldFlags, FieldType, TextCodec, TypeBuilder, TypeDescriptor};
use vc_object::object::{Object, ObjectHandle};
use vc_object::path::ObjectPath;
use vc_object::registry::TypeRegistry;
use vc_object::value::{Instance, Value};
use vc_object::version::{CustomVersionInfo, CustomVersionSet, ToolchainVersion};

use crate::resolver::ObjectResolver;

pub(crate) const WIDGET_VERSION: Uuid = Uuid::from_u128(0x5C3E_91A2_0B7D_4F6E_8A10_2D4B_6C8E_F013);

pub(crate) struct Fixture {
    pub registry: TypeRegistry,
    pub point: Arc<TypeDescriptor>,
    pub widget: Arc<TypeDescriptor>,
    pub shape: Arc<TypeDescriptor>,
    pub circle: Arc<TypeDescriptor>,
    pub square: Arc<TypeDescriptor>,
    pub holder: Arc<TypeDescriptor>,
    pub counter: Arc<TypeDescriptor>,
    pub legacy: Arc<TypeDescriptor>,
    objects: RefCell<HashMap<ObjectPath, ObjectHandle>>,
}

impl Fixture {
    pub fn new() -> Self {
        let mut registry = TypeRegistry::new();
        registry.add_tag("Status.Active");
        registry.add_tag("Status.Hidden");
        registry.register_custom_version(CustomVersionInfo::new(WIDGET_VERSION, "WidgetVersion", 2));
        registry.add_type_redirect("/Script/Game.OldCircle", "/Script/Game.Circle");

        let color = Arc::new(EnumInfo::new("/Script/Game.Color", [("RED", 10), ("GREEN", 20), ("BLUE", 30)]));

        let point = TypeBuilder::structure("/Script/Game.Point")
            .field(FieldDescriptor::new("x", FieldType::Int))
            .field(FieldDescriptor::new("y", FieldType::Int))
            .build()
            .unwrap();

        let tint = TypeBuilder::structure("/Script/Game.Tint")
            .field(FieldDescriptor::new("r", FieldType::Int))
            .field(FieldDescriptor::new("g", FieldType::Int))
            .field(FieldDescriptor::new("b", FieldType::Int))
            .text_codec(TextCodec {
                export: export_tint,
                import: import_tint,
            })
            .build()
            .unwrap();

        let widget = TypeBuilder::object("/Script/Game.Widget")
            .field(FieldDescriptor::new("tag", FieldType::Enum(color)))
            .field(FieldDescriptor::new("items", FieldType::Int).with_array_dim(2))
            .field(FieldDescriptor::new("origin", FieldType::Struct(Arc::clone(&point))))
            .field(FieldDescriptor::new("tint", FieldType::Struct(Arc::clone(&tint))))
            .field(FieldDescriptor::new("labels", FieldType::array(FieldType::String)))
            .field(FieldDescriptor::new("ids", FieldType::set(FieldType::Int)))
            .field(FieldDescriptor::new("scores", FieldType::map(FieldType::String, FieldType::Int)))
            .field(FieldDescriptor::new("weights", FieldType::map(FieldType::Int, FieldType::Float)))
            .field(FieldDescriptor::new("lookup", FieldType::map(FieldType::Tag, FieldType::Int)))
            .field(FieldDescriptor::new("flags", FieldType::TagContainer))
            .field(FieldDescriptor::new("category", FieldType::Tag))
            .field(FieldDescriptor::new("count", FieldType::UInt))
            .field(FieldDescriptor::new("ratio", FieldType::Float))
            .field(FieldDescriptor::new("title", FieldType::String))
            .field(FieldDescriptor::new("enabled", FieldType::Bool))
            .field(FieldDescriptor::new("cache", FieldType::Int).with_flags(FieldFlags::TRANSIENT))
            .custom_version(WIDGET_VERSION)
            .build()
            .unwrap();

        let shape = TypeBuilder::object("/Script/Game.Shape")
            .abstract_type()
            .field(FieldDescriptor::new("label", FieldType::String))
            .build()
            .unwrap();
        let circle = TypeBuilder::object("/Script/Game.Circle")
            .parent(&shape)
            .field(FieldDescriptor::new("radius", FieldType::Float).with_default(1.0))
            .interface("Named")
            .build()
            .unwrap();
        let square = TypeBuilder::object("/Script/Game.Square")
            .parent(&shape)
            .field(FieldDescriptor::new("side", FieldType::Int))
            .build()
            .unwrap();
        let abstract_base = TypeBuilder::object("/Script/Game.AbstractBase")
            .parent(&shape)
            .abstract_type()
            .build()
            .unwrap();

        let holder = TypeBuilder::object("/Script/Game.Holder")
            .field(
                FieldDescriptor::new("shape", FieldType::Object(Arc::clone(&shape))).with_flags(FieldFlags::INSTANCED),
            )
            .field(FieldDescriptor::new("target", FieldType::Object(Arc::clone(&shape))))
            .field(FieldDescriptor::new("named", FieldType::interface("Named")))
            .field(FieldDescriptor::new("later", FieldType::SoftObject(Arc::clone(&shape))))
            .field(
                FieldDescriptor::new("shapes", FieldType::array(FieldType::Object(Arc::clone(&shape))))
                    .with_flags(FieldFlags::INSTANCED),
            )
            .field(FieldDescriptor::new("revision", FieldType::Int).with_flags(FieldFlags::ALWAYS_SERIALIZE))
            .build()
            .unwrap();

        let counter = TypeBuilder::structure("/Script/Game.Counter")
            .field(FieldDescriptor::new("value", FieldType::Int))
            .field(FieldDescriptor::new("finalized", FieldType::Int))
            .finalize(count_finalize)
            .build()
            .unwrap();

        let legacy = TypeBuilder::object("/Script/Game.Legacy")
            .field(FieldDescriptor::new("name", FieldType::String))
            .field(FieldDescriptor::new("old_name", FieldType::String).with_flags(FieldFlags::DEPRECATED))
            .post_import(migrate_legacy)
            .build()
            .unwrap();

        for ty in [&point, &tint, &widget, &shape, &circle, &square, &abstract_base, &holder, &counter, &legacy] {
            registry.register(Arc::clone(ty));
        }

        Self {
            registry,
            point,
            widget,
            shape,
            circle,
            square,
            holder,
            counter,
            legacy,
            objects: RefCell::new(HashMap::new()),
        }
    }

    /// Creates a resident object that references can resolve to.
    pub fn object(&self, path: &str, ty: &Arc<TypeDescriptor>) -> ObjectHandle {
        let path = ObjectPath::parse(path).unwrap();
        let object = Object::new(path.clone(), ty.default_instance());
        self.objects.borrow_mut().insert(path, Arc::clone(&object));
        object
    }
}

impl ObjectResolver for Fixture {
    fn resolve_reference(&self, path: &ObjectPath) -> Option<ObjectHandle> {
        self.objects.borrow().get(path).cloned()
    }
}

fn export_tint(instance: &Instance) -> String {
    let channel = |name| match instance.get(name) {
        Some(Value::Int(v)) => *v,
        _ => 0,
    };
    format!("(R={},G={},B={})", channel("r"), channel("g"), channel("b"))
}

fn import_tint(text: &str, instance: &mut Instance) -> bool {
    let Some(inner) = text.trim().strip_prefix('(').and_then(|t| t.strip_suffix(')')) else {
        return false;
    };
    for part in inner.split(',') {
        let Some((key, value)) = part.split_once('=') else {
            return false;
        };
        let Ok(value) = value.trim().parse::<i64>() else {
            return false;
        };
        let field = key.trim().to_ascii_lowercase();
        if instance.set(&field, value).is_err() {
            return false;
        }
    }
    true
}

fn count_finalize(instance: &mut Instance, _versions: &CustomVersionSet) {
    let count = match instance.get("finalized") {
        Some(Value::Int(count)) => *count,
        _ => 0,
    };
    instance.set("finalized", count + 1).unwrap();
}

/// Moves the deprecated `old_name` into `name`; refuses documents named
/// `broken`.
fn migrate_legacy(
    instance: &mut Instance,
    _engine: Option<&ToolchainVersion>,
    _versions: &CustomVersionSet,
) -> Result<(), String> {
    let old = match instance.get("old_name") {
        Some(Value::String(old)) if !old.is_empty() => old.clone(),
        _ => return Ok(()),
    };
    if old == "broken" {
        return Err("legacy name `broken` cannot be migrated".to_owned());
    }
    instance.set("name", old).map_err(|e| e.to_string())?;
    instance.set("old_name", "").map_err(|e| e.to_string())
}
