//! Stable logical object identities.
//!
//! An [`ObjectPath`] locates an object independently of whether it is
//! resident in memory. Its text form is `/Package/Path.ObjectName`; the
//! reference form used in documents wraps it with the type path:
//! `TypePath'/Package/Path.ObjectName'`.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Text of an empty reference.
pub const NONE_TEXT: &str = "None";

// -----------------------------------------------------------------------------
// Errors

/// Error returned when parsing an [`ObjectPath`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PathError {
    /// The text is empty or `None`.
    #[error("object path is empty")]
    Empty,
    /// Package paths start with `/`.
    #[error("object path `{0}` is not rooted, expected a leading `/`")]
    NotRooted(String),
    /// Empty segments, dangling separators or unbalanced quotes.
    #[error("object path `{0}` is malformed")]
    Malformed(String),
}

// -----------------------------------------------------------------------------
// ObjectPath

/// A package path plus the name of the object inside the package.
///
/// # Examples
///
/// ```
/// use vc_object::path::ObjectPath;
///
/// let a: ObjectPath = "/Data/Items/Sword".parse().unwrap();
/// let b: ObjectPath = "/Data/Items/Sword.Sword".parse().unwrap();
/// let c: ObjectPath = "/Script/Game.Item'/Data/Items/Sword.Sword'".parse().unwrap();
///
/// assert_eq!(a, b);
/// assert_eq!(b, c);
/// assert_eq!(a.package(), "/Data/Items/Sword");
/// assert_eq!(a.name(), "Sword");
/// assert_eq!(a.to_string(), "/Data/Items/Sword.Sword");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ObjectPath {
    package: String,
    name: String,
}

impl ObjectPath {
    /// Creates the path of the main object of a package.
    ///
    /// The object name is the last package segment.
    pub fn from_package(package: &str) -> Result<Self, PathError> {
        validate_package(package)?;
        Ok(Self {
            package: package.to_owned(),
            name: object_name_of_package(package).to_owned(),
        })
    }

    /// Parses either an object path (containing `.`) or a package path.
    ///
    /// A `Type'...'` reference wrapper is stripped first.
    pub fn parse(text: &str) -> Result<Self, PathError> {
        let text = text.trim();
        if text.is_empty() || text == NONE_TEXT {
            return Err(PathError::Empty);
        }

        let inner = match text.find('\'') {
            Some(start) => {
                let rest = &text[start + 1..];
                match rest.strip_suffix('\'') {
                    Some(inner) if !inner.contains('\'') => inner,
                    _ => return Err(PathError::Malformed(text.to_owned())),
                }
            }
            None => text,
        };

        match inner.split_once('.') {
            Some((package, name)) => {
                validate_package(package)?;
                if name.is_empty() || name.contains(['/', '.']) {
                    return Err(PathError::Malformed(inner.to_owned()));
                }
                Ok(Self {
                    package: package.to_owned(),
                    name: name.to_owned(),
                })
            }
            None => Self::from_package(inner),
        }
    }

    /// Returns the package path.
    #[inline]
    pub fn package(&self) -> &str {
        &self.package
    }

    /// Returns the object name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` for the default, empty path.
    #[inline]
    pub fn is_null(&self) -> bool {
        self.package.is_empty()
    }

    /// Formats the document reference form `TypePath'/Package.Name'`.
    pub fn to_reference(&self, type_path: &str) -> String {
        format!("{type_path}'{self}'")
    }
}

/// Returns the text after the last `/` of a package path, or `""` if none.
pub fn object_name_of_package(package: &str) -> &str {
    match package.rfind('/') {
        Some(index) => &package[index + 1..],
        None => "",
    }
}

fn validate_package(package: &str) -> Result<(), PathError> {
    if package.is_empty() {
        return Err(PathError::Empty);
    }
    let Some(rest) = package.strip_prefix('/') else {
        return Err(PathError::NotRooted(package.to_owned()));
    };
    if rest.is_empty() || rest.split('/').any(str::is_empty) {
        return Err(PathError::Malformed(package.to_owned()));
    }
    Ok(())
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return f.write_str(NONE_TEXT);
        }
        write!(f, "{}.{}", self.package, self.name)
    }
}

impl FromStr for ObjectPath {
    type Err = PathError;

    #[inline]
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::parse(text)
    }
}

impl From<ObjectPath> for String {
    fn from(path: ObjectPath) -> Self {
        path.to_string()
    }
}

impl TryFrom<String> for ObjectPath {
    type Error = PathError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        Self::parse(&text)
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::{ObjectPath, PathError, object_name_of_package};

    #[test]
    fn package_object_names() {
        assert_eq!(object_name_of_package("/Data/Foo/Bar"), "Bar");
        assert_eq!(object_name_of_package("NoSlash"), "");
        assert_eq!(object_name_of_package("/Trailing/"), "");
    }

    #[test]
    fn rejects_bad_paths() {
        assert_eq!(ObjectPath::parse(""), Err(PathError::Empty));
        assert_eq!(ObjectPath::parse("None"), Err(PathError::Empty));
        assert!(matches!(ObjectPath::parse("Data/Foo"), Err(PathError::NotRooted(_))));
        assert!(matches!(ObjectPath::parse("/Data//Foo"), Err(PathError::Malformed(_))));
        assert!(matches!(ObjectPath::parse("/Data/Foo."), Err(PathError::Malformed(_))));
        assert!(matches!(ObjectPath::parse("Type'/Data/Foo"), Err(PathError::Malformed(_))));
    }

    #[test]
    fn object_name_may_differ_from_package() {
        let path = ObjectPath::parse("/Data/Foo.Other").unwrap();
        assert_eq!(path.name(), "Other");
        assert_eq!(path.to_reference("Item"), "Item'/Data/Foo.Other'");
    }

    #[test]
    fn serde_round_trip() {
        let path = ObjectPath::parse("/Data/Foo").unwrap();
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"/Data/Foo.Foo\"");
        assert_eq!(serde_json::from_str::<ObjectPath>(&json).unwrap(), path);
        assert!(ObjectPath::default().is_null());
    }
}
