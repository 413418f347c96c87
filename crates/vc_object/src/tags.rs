//! Hierarchical tags.
//!
//! A [`Tag`] is a dot separated name such as `Damage.Fire.Burning`. Every
//! prefix of a tag is its implicit parent. Only tags known to a
//! [`TagDictionary`] are accepted when decoding.

use core::fmt;
use std::collections::BTreeSet;

// -----------------------------------------------------------------------------
// Tag

/// A single hierarchical tag, empty for "no tag".
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(String);

impl Tag {
    /// Creates a tag from its full name.
    #[inline]
    pub fn new(name: &str) -> Self {
        Self(name.trim().to_owned())
    }

    /// Returns the empty tag.
    #[inline]
    pub const fn none() -> Self {
        Self(String::new())
    }

    /// Returns the full name.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for the empty tag.
    #[inline]
    pub fn is_none(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the direct parent, `Damage.Fire` for `Damage.Fire.Burning`.
    pub fn parent(&self) -> Option<Tag> {
        self.0.rfind('.').map(|index| Tag(self.0[..index].to_owned()))
    }

    /// Returns `true` if `self` equals `other` or is one of its descendants.
    pub fn matches(&self, other: &Tag) -> bool {
        if other.is_none() {
            return false;
        }
        self.0 == other.0
            || (self.0.starts_with(&other.0) && self.0.as_bytes().get(other.0.len()) == Some(&b'.'))
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// -----------------------------------------------------------------------------
// TagContainer

/// An ordered collection of distinct explicit tags.
///
/// Equality ignores insertion order.
///
/// # Examples
///
/// ```
/// use vc_object::tags::{Tag, TagContainer};
///
/// let mut tags = TagContainer::new();
/// assert!(tags.add(Tag::new("Damage.Fire")));
/// assert!(!tags.add(Tag::new("Damage.Fire")));
///
/// assert!(tags.has_tag(&Tag::new("Damage")));
/// assert!(!tags.has_tag_exact(&Tag::new("Damage")));
/// ```
#[derive(Clone, Debug, Default)]
pub struct TagContainer {
    tags: Vec<Tag>,
}

impl TagContainer {
    /// Creates an empty container.
    #[inline]
    pub const fn new() -> Self {
        Self { tags: Vec::new() }
    }

    /// Adds a tag, returning `false` for empty or already present tags.
    pub fn add(&mut self, tag: Tag) -> bool {
        if tag.is_none() || self.tags.contains(&tag) {
            return false;
        }
        self.tags.push(tag);
        true
    }

    /// Removes a tag, returning `true` if it was present.
    pub fn remove(&mut self, tag: &Tag) -> bool {
        let len = self.tags.len();
        self.tags.retain(|t| t != tag);
        len != self.tags.len()
    }

    /// Returns `true` if any explicit tag matches `tag` hierarchically.
    pub fn has_tag(&self, tag: &Tag) -> bool {
        self.tags.iter().any(|t| t.matches(tag))
    }

    /// Returns `true` if `tag` was added explicitly.
    pub fn has_tag_exact(&self, tag: &Tag) -> bool {
        self.tags.contains(tag)
    }

    /// Returns the implicit parents of all explicit tags.
    pub fn parents(&self) -> BTreeSet<Tag> {
        let mut parents = BTreeSet::new();
        for tag in &self.tags {
            let mut current = tag.parent();
            while let Some(parent) = current {
                current = parent.parent();
                parents.insert(parent);
            }
        }
        parents
    }

    /// Returns an iterator over the explicit tags in insertion order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Tag> {
        self.tags.iter()
    }

    /// Returns the number of explicit tags.
    #[inline]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Returns `true` if the container holds no tag.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl PartialEq for TagContainer {
    fn eq(&self, other: &Self) -> bool {
        self.tags.len() == other.tags.len() && self.tags.iter().all(|t| other.tags.contains(t))
    }
}

impl Eq for TagContainer {}

impl FromIterator<Tag> for TagContainer {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        let mut container = Self::new();
        for tag in iter {
            container.add(tag);
        }
        container
    }
}

// -----------------------------------------------------------------------------
// TagDictionary

/// The set of valid tags.
///
/// Adding a tag also adds all its parents.
#[derive(Clone, Debug, Default)]
pub struct TagDictionary {
    tags: BTreeSet<Tag>,
}

impl TagDictionary {
    /// Creates an empty dictionary.
    #[inline]
    pub const fn new() -> Self {
        Self {
            tags: BTreeSet::new(),
        }
    }

    /// Registers a tag and its parents.
    pub fn add(&mut self, name: &str) {
        let mut current = Some(Tag::new(name));
        while let Some(tag) = current {
            if tag.is_none() {
                break;
            }
            current = tag.parent();
            self.tags.insert(tag);
        }
    }

    /// Returns the registered tag with this name.
    pub fn request(&self, name: &str) -> Option<Tag> {
        let tag = Tag::new(name);
        self.tags.contains(&tag).then_some(tag)
    }

    /// Returns `true` if the tag is registered.
    pub fn is_valid(&self, name: &str) -> bool {
        self.tags.contains(&Tag::new(name))
    }

    /// Returns the number of registered tags, parents included.
    #[inline]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Returns an iterator over all registered tags in lexical order.
    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.tags.iter()
    }
}

// -----------------------------------------------------------------------------
// Tests
