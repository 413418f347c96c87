use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vc_json::VersionContext;
use vc_object::version::{CustomVersionInfo, ToolchainVersion};

use crate::error::AssetError;

/// File name of the ledger inside the cache directory.
pub const CACHE_VERSION_FILE: &str = "CacheVersion.json";

// -----------------------------------------------------------------------------
// FormatVersion

/// Revision of the data format the library reads and writes.
///
/// Bumping [`FormatVersion::LATEST`] invalidates every cache written by an
/// earlier revision.
pub struct FormatVersion;

impl FormatVersion {
    pub const GUID: Uuid = Uuid::from_u128(0x0E26_539A_1A69_4EAE_81CE_70D3_56B6_9D52);

    pub const INITIAL: i32 = 0;
    pub const LATEST: i32 = 1;

    /// Registration info for a [`TypeRegistry`](vc_object::registry::TypeRegistry).
    pub fn info() -> CustomVersionInfo {
        CustomVersionInfo::new(Self::GUID, "JsonDataFormat", Self::LATEST)
    }
}

// -----------------------------------------------------------------------------
// CacheVersion

/// Contents of the ledger: which toolchain and format revision produced the
/// caches.
///
/// A missing or unreadable ledger loads as an invalid one, which is never
/// compatible.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CacheVersion {
    pub engine_version: ToolchainVersion,
    pub is_licensee_version: bool,
    pub json_runtime_version: i32,
    #[serde(skip, default = "valid")]
    valid: bool,
}

fn valid() -> bool {
    true
}

impl CacheVersion {
    /// Returns the ledger of the running program.
    pub fn current(context: &VersionContext) -> Self {
        Self {
            engine_version: context.current.clone().with_licensee(false),
            is_licensee_version: context.current.is_licensee(),
            json_runtime_version: FormatVersion::LATEST,
            valid: true,
        }
    }

    pub fn invalid() -> Self {
        Self {
            engine_version: ToolchainVersion::default(),
            is_licensee_version: false,
            json_runtime_version: FormatVersion::INITIAL,
            valid: false,
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// The recorded toolchain with its licensee flag applied.
    pub fn toolchain(&self) -> ToolchainVersion {
        self.engine_version.clone().with_licensee(self.is_licensee_version)
    }

    /// Returns `true` if caches recorded by `old` can be used by `new`.
    ///
    /// Both ledgers must be valid, each toolchain must accept the other and
    /// the format revisions must be equal.
    pub fn is_compatible(new: &Self, old: &Self) -> bool {
        if !new.valid || !old.valid {
            return false;
        }
        let (new_toolchain, old_toolchain) = (new.toolchain(), old.toolchain());
        new_toolchain.is_compatible_with(&old_toolchain)
            && old_toolchain.is_compatible_with(&new_toolchain)
            && new.json_runtime_version == old.json_runtime_version
    }

    /// Reads the ledger of `dir`.
    pub fn load(dir: &Path) -> Self {
        match super::read_json::<Self>(&dir.join(CACHE_VERSION_FILE)) {
            Ok(Some(ledger)) => ledger,
            Ok(None) => Self::invalid(),
            Err(error) => {
                log::warn!("{error}, treating caches as stale");
                Self::invalid()
            }
        }
    }

    pub fn save(&self, dir: &Path) -> Result<(), AssetError> {
        super::write_json(&dir.join(CACHE_VERSION_FILE), self)
    }
}

// -----------------------------------------------------------------------------
// Tests
