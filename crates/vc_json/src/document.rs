//! The document envelope.
//!
//! ```json
//! {
//!     "Class": "/Script/Game.Widget",
//!     "EngineVersion": "1.4.0-2210",
//!     "IsLicenseeVersion": false,
//!     "CustomVersions": { "5C3E91A2-0B7D-4F6E-8A10-2D4B6C8EF013": 2 },
//!     "Data": { "tag": "BLUE" }
//! }
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value as Json};
use vc_object::info::TypeDescriptor;
use vc_object::registry::TypeRegistry;
use vc_object::value::Instance;
use vc_object::version::{CustomVersionSet, ToolchainVersion};

use crate::codec::{Decoder, Encoder};
use crate::error::{DecodeReport, EncodeError, EnvelopeError};
use crate::options::{DecodeOptions, EncodeOptions};
use crate::resolver::{NoResolver, ObjectResolver};
use crate::versions::{collect_custom_versions, read_custom_versions, relevant_custom_versions, write_custom_versions};

pub const CLASS_KEY: &str = "Class";
pub const ENGINE_VERSION_KEY: &str = "EngineVersion";
pub const LICENSEE_KEY: &str = "IsLicenseeVersion";
pub const CUSTOM_VERSIONS_KEY: &str = "CustomVersions";
pub const DATA_KEY: &str = "Data";

static NO_RESOLVER: NoResolver = NoResolver;

// -----------------------------------------------------------------------------
// VersionContext

/// Toolchain versions of the running program.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionContext {
    /// Written into new documents; documents must be compatible with it.
    pub current: ToolchainVersion,
    /// Oldest toolchain whose documents are still readable, reported in
    /// version errors.
    pub compatible_with: ToolchainVersion,
}

impl VersionContext {
    /// Creates a context compatible with itself only.
    pub fn new(current: ToolchainVersion) -> Self {
        Self {
            compatible_with: current.clone(),
            current,
        }
    }

    pub fn with_compatible(mut self, compatible_with: ToolchainVersion) -> Self {
        self.compatible_with = compatible_with;
        self
    }
}

impl Default for VersionContext {
    /// Uses the crate version, which has no changelist and so accepts every
    /// document.
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_VERSION").parse().unwrap_or_default())
    }
}

// -----------------------------------------------------------------------------
// Results

/// Header fields read from a document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DocumentHeader {
    pub class: Option<String>,
    pub engine_version: Option<ToolchainVersion>,
    /// Custom versions of the document, completed with revision `0` for
    /// every version the type depends on but the document lacks.
    pub custom_versions: CustomVersionSet,
}

/// Result of importing into an existing instance.
#[derive(Clone, Debug, Default)]
pub struct ImportOutcome {
    pub header: DocumentHeader,
    pub report: DecodeReport,
}

/// Result of decoding into a new instance.
#[derive(Clone, Debug)]
pub struct Decoded {
    pub instance: Instance,
    pub header: DocumentHeader,
    pub report: DecodeReport,
}

// -----------------------------------------------------------------------------
// Document

/// Assembles and reads the document envelope around encoded field data.
///
/// # Examples
///
/// ```
/// use vc_json::{DecodeOptions, Document, EncodeOptions, VersionContext};
/// use vc_object::info::{FieldDescriptor, FieldType, TypeBuilder};
/// use vc_object::registry::TypeRegistry;
/// use vc_object::value::Value;
///
/// let mut registry = TypeRegistry::new();
/// let point = registry.register(
///     TypeBuilder::object("/Script/Game.Point")
///         .field(FieldDescriptor::new("x", FieldType::Int))
///         .field(FieldDescriptor::new("y", FieldType::Int))
///         .build()
///         .unwrap(),
/// );
///
/// let context = VersionContext::default();
/// let document = Document::new(&registry, &context);
///
/// let value = point.default_instance().with("x", 5).unwrap();
/// let text = document.encode(&value, EncodeOptions::DELTA).unwrap();
///
/// let decoded = document.decode(&text, &point, DecodeOptions::STRICT).unwrap();
/// assert!(decoded.instance.identical(&value));
/// ```
#[derive(Clone, Copy)]
pub struct Document<'a> {
    registry: &'a TypeRegistry,
    resolver: &'a dyn ObjectResolver,
    context: &'a VersionContext,
}

impl<'a> Document<'a> {
    /// Creates a document codec that cannot resolve object references.
    pub fn new(registry: &'a TypeRegistry, context: &'a VersionContext) -> Self {
        Self {
            registry,
            resolver: &NO_RESOLVER,
            context,
        }
    }

    /// Resolves object references through `resolver`.
    pub fn with_resolver(mut self, resolver: &'a dyn ObjectResolver) -> Self {
        self.resolver = resolver;
        self
    }

    // -------------------------------------------------------------------------
    // Encode

    /// Builds the envelope for `instance`.
    pub fn export(&self, instance: &Instance, options: EncodeOptions) -> Result<Map<String, Json>, EncodeError> {
        let defaults = instance.ty().default_instance();
        let baseline = options.delta.then_some(&defaults);
        let data = Encoder::new(options).encode_fields(instance, baseline)?;

        let versions = collect_custom_versions(self.registry, instance);
        let current = &self.context.current;

        let mut root = Map::with_capacity(5);
        root.insert(CLASS_KEY.to_owned(), Json::String(instance.ty().path().to_owned()));
        root.insert(ENGINE_VERSION_KEY.to_owned(), Json::String(current.to_string()));
        root.insert(LICENSEE_KEY.to_owned(), Json::Bool(current.is_licensee()));
        root.insert(CUSTOM_VERSIONS_KEY.to_owned(), write_custom_versions(&versions));
        root.insert(DATA_KEY.to_owned(), Json::Object(data));
        Ok(root)
    }

    /// Encodes `instance` as pretty printed document text.
    pub fn encode(&self, instance: &Instance, options: EncodeOptions) -> Result<String, EncodeError> {
        let root = Json::Object(self.export(instance, options)?);

        let mut buffer = Vec::with_capacity(256);
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(b"    "));
        root.serialize(&mut serializer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    // -------------------------------------------------------------------------
    // Decode

    /// Parses document text into its root object.
    pub fn parse(text: &str) -> Result<Map<String, Json>, EnvelopeError> {
        match serde_json::from_str(text)? {
            Json::Object(root) => Ok(root),
            _ => Err(EnvelopeError::NotAnObject),
        }
    }

    /// Creates a default instance of the class named by the document.
    ///
    /// A document without `Class` is taken to be of type `expected`.
    pub fn instantiate(&self, root: &Map<String, Json>, expected: &Arc<TypeDescriptor>) -> Result<Instance, EnvelopeError> {
        let ty = match root.get(CLASS_KEY) {
            None | Some(Json::Null) => Arc::clone(expected),
            Some(Json::String(name)) => self
                .registry
                .resolve_type(name)
                .ok_or_else(|| EnvelopeError::UnknownClass(name.clone()))?,
            Some(other) => return Err(EnvelopeError::UnknownClass(other.to_string())),
        };

        if !ty.is_child_of(expected) {
            return Err(EnvelopeError::ClassMismatch {
                found: ty.path().to_owned(),
                expected: expected.path().to_owned(),
            });
        }
        TypeRegistry::construct(&ty).map_err(|_| EnvelopeError::AbstractClass(ty.path().to_owned()))
    }

    /// Imports a parsed document into `target`.
    ///
    /// The header is validated before anything is written. The `Data` block
    /// is decoded into fresh type defaults and the post-import hook of the
    /// type runs on the result, which then replaces `target`. On failure
    /// `target` is left as it was.
    pub fn import(
        &self,
        root: &Map<String, Json>,
        target: &mut Instance,
        options: DecodeOptions,
    ) -> Result<ImportOutcome, EnvelopeError> {
        let ty = Arc::clone(target.ty());

        let class = match root.get(CLASS_KEY) {
            Some(Json::String(name)) => {
                self.check_class(name, &ty)?;
                Some(name.clone())
            }
            _ => None,
        };

        let engine_version = self.read_engine_version(root)?;

        let mut versions = match root.get(CUSTOM_VERSIONS_KEY) {
            Some(json) => read_custom_versions(json)?,
            None => CustomVersionSet::new(),
        };
        self.check_custom_versions(&versions)?;
        versions.ensure_expected(relevant_custom_versions(&ty));

        let Some(Json::Object(data)) = root.get(DATA_KEY) else {
            return Err(EnvelopeError::MissingData);
        };

        let mut staged = ty.default_instance();
        let mut decoder = Decoder::new(self.registry, self.resolver, &versions, options);
        if let Err(source) = decoder.decode_fields(data, &mut staged) {
            return Err(EnvelopeError::Field {
                class: ty.path().to_owned(),
                source,
            });
        }
        let report = decoder.into_report();

        if let Some(post_import) = ty.post_import_hook() {
            post_import(&mut staged, engine_version.as_ref(), &versions).map_err(|message| EnvelopeError::PostImport {
                class: ty.path().to_owned(),
                message,
            })?;
        }

        *target = staged;
        Ok(ImportOutcome {
            header: DocumentHeader {
                class,
                engine_version,
                custom_versions: versions,
            },
            report,
        })
    }

    /// Decodes document text into a new instance of the class it names.
    pub fn decode(&self, text: &str, expected: &Arc<TypeDescriptor>, options: DecodeOptions) -> Result<Decoded, EnvelopeError> {
        let root = Self::parse(text)?;
        let mut instance = self.instantiate(&root, expected)?;
        let ImportOutcome { header, report } = self.import(&root, &mut instance, options)?;
        Ok(Decoded {
            instance,
            header,
            report,
        })
    }

    /// Decodes document text into an existing instance.
    pub fn decode_into(&self, text: &str, target: &mut Instance, options: DecodeOptions) -> Result<ImportOutcome, EnvelopeError> {
        let root = Self::parse(text)?;
        self.import(&root, target, options)
    }

    // -------------------------------------------------------------------------
    // Header checks

    fn check_class(&self, name: &str, ty: &TypeDescriptor) -> Result<(), EnvelopeError> {
        let Some(named) = self.registry.resolve_type(name) else {
            return Err(EnvelopeError::UnknownClass(name.to_owned()));
        };
        if ty.is_child_of(&named) {
            return Ok(());
        }
        // Objects created before their type was registered again keep the
        // stale descriptor.
        if ty.is_stale() && ty.path().contains(named.name()) {
            return Ok(());
        }
        Err(EnvelopeError::ClassMismatch {
            found: named.path().to_owned(),
            expected: ty.path().to_owned(),
        })
    }

    fn read_engine_version(&self, root: &Map<String, Json>) -> Result<Option<ToolchainVersion>, EnvelopeError> {
        let Some(json) = root.get(ENGINE_VERSION_KEY) else {
            return Ok(None);
        };
        let Json::String(text) = json else {
            return Err(EnvelopeError::InvalidEngineVersion(json.to_string()));
        };

        let licensee = root.get(LICENSEE_KEY).and_then(Json::as_bool).unwrap_or(false);
        let version = text
            .parse::<ToolchainVersion>()
            .map_err(|_| EnvelopeError::InvalidEngineVersion(text.clone()))?
            .with_licensee(licensee);

        if !self.context.current.is_compatible_with(&version) {
            return Err(EnvelopeError::IncompatibleEngineVersion {
                found: version,
                current: self.context.current.clone(),
                compatible: self.context.compatible_with.clone(),
            });
        }
        Ok(Some(version))
    }

    fn check_custom_versions(&self, versions: &CustomVersionSet) -> Result<(), EnvelopeError> {
        for (guid, revision) in versions.iter() {
            match self.registry.custom_version(guid) {
                Some(info) if !info.supports(revision) => {
                    return Err(EnvelopeError::UnsupportedCustomVersion {
                        guid: *guid,
                        name: info.name.clone(),
                        found: revision,
                        oldest: info.oldest_supported,
                        current: info.current,
                    });
                }
                Some(_) => {}
                None => log::debug!("document uses unregistered custom version {guid} at revision {revision}"),
            }
        }
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Tests
