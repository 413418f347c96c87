//! Toolchain versions and custom version sets.
//!
//! Every document records the toolchain version that wrote it and the
//! revision of each custom version its field layout depends on.

use core::cmp::Ordering;
use core::fmt;
use core::str::FromStr;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// -----------------------------------------------------------------------------
// ToolchainVersion

/// Changelist bit marking a licensee build.
pub const LICENSEE_BIT: u32 = 1 << 31;

/// Error returned by [`ToolchainVersion::from_str`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid toolchain version `{0}`, expected `major.minor.patch[-changelist][+branch]`")]
pub struct VersionParseError(pub String);

/// Result of [`ToolchainVersion::newest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionComparison {
    /// Both versions are equal or cannot be ordered.
    Neither,
    First,
    Second,
}

/// A `major.minor.patch-changelist+branch` version.
///
/// The licensee flag is packed into the highest changelist bit.
///
/// # Examples
///
/// ```
/// use vc_object::version::ToolchainVersion;
///
/// let version: ToolchainVersion = "5.3.2-29314046+++UE5+Release-5.3".parse().unwrap();
/// assert_eq!(version.major(), 5);
/// assert_eq!(version.changelist(), 29314046);
/// assert_eq!(version.branch(), "++UE5+Release-5.3");
/// assert_eq!(version.to_string(), "5.3.2-29314046+++UE5+Release-5.3");
///
/// let licensee = version.clone().with_licensee(true);
/// assert!(licensee.is_licensee());
/// assert_eq!(licensee.changelist(), 29314046);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ToolchainVersion {
    major: u16,
    minor: u16,
    patch: u16,
    changelist: u32,
    branch: String,
}

impl ToolchainVersion {
    /// Creates a new version. `changelist` may carry [`LICENSEE_BIT`].
    pub fn new(major: u16, minor: u16, patch: u16, changelist: u32, branch: &str) -> Self {
        Self {
            major,
            minor,
            patch,
            changelist,
            branch: branch.to_owned(),
        }
    }

    /// Sets or clears the licensee flag.
    pub fn with_licensee(mut self, licensee: bool) -> Self {
        if licensee {
            self.changelist |= LICENSEE_BIT;
        } else {
            self.changelist &= !LICENSEE_BIT;
        }
        self
    }

    #[inline]
    pub fn major(&self) -> u16 {
        self.major
    }

    #[inline]
    pub fn minor(&self) -> u16 {
        self.minor
    }

    #[inline]
    pub fn patch(&self) -> u16 {
        self.patch
    }

    /// Returns the changelist without the licensee flag.
    #[inline]
    pub fn changelist(&self) -> u32 {
        self.changelist & !LICENSEE_BIT
    }

    #[inline]
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Returns `true` for licensee builds.
    #[inline]
    pub fn is_licensee(&self) -> bool {
        self.changelist & LICENSEE_BIT != 0
    }

    /// Returns `true` for promoted builds, which carry a changelist.
    #[inline]
    pub fn has_changelist(&self) -> bool {
        self.changelist() != 0
    }

    /// Returns which of two versions is newer.
    ///
    /// Changelists are only compared between builds of the same origin,
    /// licensee and non-licensee changelists are unrelated.
    pub fn newest(first: &Self, second: &Self) -> VersionComparison {
        let triple = (first.major, first.minor, first.patch).cmp(&(second.major, second.minor, second.patch));
        match triple {
            Ordering::Greater => return VersionComparison::First,
            Ordering::Less => return VersionComparison::Second,
            Ordering::Equal => {}
        }
        if first.is_licensee() != second.is_licensee() {
            return VersionComparison::Neither;
        }
        match first.changelist().cmp(&second.changelist()) {
            Ordering::Greater => VersionComparison::First,
            Ordering::Less => VersionComparison::Second,
            Ordering::Equal => VersionComparison::Neither,
        }
    }

    /// Returns `true` if data written by `other` can be read by `self`.
    ///
    /// Builds without a changelist are always compatible; otherwise `other`
    /// must not be newer than `self`.
    pub fn is_compatible_with(&self, other: &Self) -> bool {
        if !self.has_changelist() || !other.has_changelist() {
            return true;
        }
        Self::newest(self, other) != VersionComparison::Second
    }
}

impl fmt::Display for ToolchainVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}-{}", self.major, self.minor, self.patch, self.changelist())?;
        if !self.branch.is_empty() {
            write!(f, "+{}", self.branch)?;
        }
        Ok(())
    }
}

impl FromStr for ToolchainVersion {
    type Err = VersionParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let error = || VersionParseError(text.to_owned());
        let trimmed = text.trim();

        let (numbers, branch) = match trimmed.split_once('+') {
            Some((numbers, branch)) => (numbers, branch),
            None => (trimmed, ""),
        };
        let (triple, changelist) = match numbers.split_once('-') {
            Some((triple, changelist)) => (triple, changelist.parse::<u32>().map_err(|_| error())?),
            None => (numbers, 0),
        };

        let mut parts = triple.split('.');
        let mut next = || -> Result<u16, VersionParseError> {
            parts.next().and_then(|p| p.parse().ok()).ok_or_else(error)
        };
        let (major, minor, patch) = (next()?, next()?, next()?);
        if parts.next().is_some() || changelist & LICENSEE_BIT != 0 {
            return Err(error());
        }

        Ok(Self::new(major, minor, patch, changelist, branch))
    }
}

impl From<ToolchainVersion> for String {
    fn from(version: ToolchainVersion) -> Self {
        version.to_string()
    }
}

impl TryFrom<String> for ToolchainVersion {
    type Error = VersionParseError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        text.parse()
    }
}

// -----------------------------------------------------------------------------
// CustomVersionSet

/// A registered custom version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CustomVersionInfo {
    pub guid: Uuid,
    pub name: String,
    /// Revision written by the running program.
    pub current: i32,
    /// Oldest revision the running program can still read.
    pub oldest_supported: i32,
}

impl CustomVersionInfo {
    /// Creates an entry supporting every revision up to `current`.
    pub fn new(guid: Uuid, name: &str, current: i32) -> Self {
        Self {
            guid,
            name: name.to_owned(),
            current,
            oldest_supported: 0,
        }
    }

    /// Returns `true` if documents at `revision` can be read.
    #[inline]
    pub fn supports(&self, revision: i32) -> bool {
        (self.oldest_supported..=self.current).contains(&revision)
    }
}

/// Custom version GUID to revision, each GUID at most once.
///
/// Iteration is ordered by GUID so written documents are deterministic.
///
/// # Examples
///
/// ```
/// use uuid::Uuid;
/// use vc_object::version::CustomVersionSet;
///
/// let guid = Uuid::from_u128(0x1234);
/// let mut versions = CustomVersionSet::new();
/// versions.insert(guid, 3);
///
/// assert_eq!(versions.get(&guid), 3);
/// assert_eq!(versions.get(&Uuid::nil()), -1);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CustomVersionSet {
    versions: BTreeMap<Uuid, i32>,
}

impl CustomVersionSet {
    /// Creates an empty set.
    #[inline]
    pub const fn new() -> Self {
        Self {
            versions: BTreeMap::new(),
        }
    }

    /// Sets the revision of `guid`, returning the previous one.
    #[inline]
    pub fn insert(&mut self, guid: Uuid, revision: i32) -> Option<i32> {
        self.versions.insert(guid, revision)
    }

    /// Returns the revision of `guid`, or `-1` if the set does not contain it.
    pub fn get(&self, guid: &Uuid) -> i32 {
        match self.versions.get(guid) {
            Some(revision) => *revision,
            None => {
                log::warn!("custom version {guid} was requested but is not part of the version set");
                -1
            }
        }
    }

    /// Returns the revision of `guid`, if present.
    #[inline]
    pub fn try_get(&self, guid: &Uuid) -> Option<i32> {
        self.versions.get(guid).copied()
    }

    /// Returns `true` if `guid` is present.
    #[inline]
    pub fn contains(&self, guid: &Uuid) -> bool {
        self.versions.contains_key(guid)
    }

    /// Adds every `expected` GUID missing from the set at revision `0`.
    ///
    /// A missing GUID means the document predates that custom version.
    pub fn ensure_expected(&mut self, expected: impl IntoIterator<Item = Uuid>) {
        for guid in expected {
            self.versions.entry(guid).or_insert(0);
        }
    }

    /// Returns an iterator over `(guid, revision)` ordered by GUID.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&Uuid, i32)> {
        self.versions.iter().map(|(guid, revision)| (guid, *revision))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::{CustomVersionSet, ToolchainVersion, VersionComparison};

    fn version(text: &str) -> ToolchainVersion {
        text.parse().unwrap()
    }

    #[test]
    fn parse_forms() {
        let plain = version("1.2.3");
        assert_eq!((plain.major(), plain.minor(), plain.patch()), (1, 2, 3));
        assert!(!plain.has_changelist());
        assert_eq!(plain.to_string(), "1.2.3-0");

        assert!("1.2".parse::<ToolchainVersion>().is_err());
        assert!("1.2.3.4".parse::<ToolchainVersion>().is_err());
        assert!("1.2.3-abc".parse::<ToolchainVersion>().is_err());
        assert!("1.2.3-4294967295".parse::<ToolchainVersion>().is_err());
    }

    #[test]
    fn serde_uses_text_form() {
        let v = version("5.1.0-100+main");
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "\"5.1.0-100+main\"");
        assert_eq!(serde_json::from_str::<ToolchainVersion>(&json).unwrap(), v);
    }

    #[test]
    fn compatibility_window() {
        let current = version("5.3.0-200");
        assert!(current.is_compatible_with(&version("5.3.0-150")));
        assert!(current.is_compatible_with(&version("5.2.9-999")));
        assert!(!current.is_compatible_with(&version("5.3.0-201")));
        assert!(!current.is_compatible_with(&version("5.4.0-1")));
        // Unversioned builds are trusted.
        assert!(current.is_compatible_with(&version("9.0.0")));

        let licensee = version("5.3.0-900").with_licensee(true);
        assert_eq!(ToolchainVersion::newest(&current, &licensee), VersionComparison::Neither);
        assert!(current.is_compatible_with(&licensee));
    }

    #[test]
    fn ensure_expected_fills_missing() {
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);
        let mut set = CustomVersionSet::new();
        set.insert(a, 4);
        set.ensure_expected([a, b]);
        assert_eq!(set.try_get(&a), Some(4));
        assert_eq!(set.try_get(&b), Some(0));
        assert_eq!(set.len(), 2);
    }
}
