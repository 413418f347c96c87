use std::sync::Arc;

// -----------------------------------------------------------------------------
// EnumInfo

/// Symbolic constants of an enum type.
///
/// Values are stored as `i64`, so any underlying representation fits. Several
/// names may share a value, the first declared one is the canonical name.
///
/// # Examples
///
/// ```
/// use vc_object::info::EnumInfo;
///
/// let color = EnumInfo::new("Color", [("RED", 0), ("GREEN", 1), ("BLUE", 2)]);
///
/// assert_eq!(color.name_of(1), Some("GREEN"));
/// assert_eq!(color.value_of("BLUE"), Some(2));
/// assert_eq!(color.value_of("Color::BLUE"), Some(2));
/// assert_eq!(color.value_of("PURPLE"), None);
/// ```
#[derive(Clone, Debug)]
pub struct EnumInfo {
    path: Arc<str>,
    variants: Box<[(Arc<str>, i64)]>,
}

impl EnumInfo {
    /// Creates a new [`EnumInfo`], keeping the variant order.
    pub fn new<'a>(path: &str, variants: impl IntoIterator<Item = (&'a str, i64)>) -> Self {
        Self {
            path: Arc::from(path),
            variants: variants
                .into_iter()
                .map(|(name, value)| (Arc::from(name), value))
                .collect(),
        }
    }

    /// Returns the enum path.
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the short enum name, the text after the last `.` or `/`.
    pub fn name(&self) -> &str {
        short_name(&self.path)
    }

    /// Returns the canonical name for `value`, if any constant has it.
    pub fn name_of(&self, value: i64) -> Option<&str> {
        self.variants
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(name, _)| &**name)
    }

    /// Returns the value of a constant.
    ///
    /// Accepts the bare name and the `Enum::Name` qualified form.
    pub fn value_of(&self, name: &str) -> Option<i64> {
        let name = match name.split_once("::") {
            Some((prefix, rest)) if prefix == self.name() => rest,
            _ => name,
        };
        self.variants
            .iter()
            .find(|(n, _)| &**n == name)
            .map(|(_, value)| *value)
    }

    /// Returns the value of the first declared constant, or `0`.
    pub fn default_value(&self) -> i64 {
        self.variants.first().map(|(_, v)| *v).unwrap_or(0)
    }

    /// Returns an iterator over `(name, value)` pairs in declaration order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&str, i64)> {
        self.variants.iter().map(|(name, value)| (&**name, *value))
    }
}

/// Text after the last `.` or `/` of a type path.
pub(crate) fn short_name(path: &str) -> &str {
    match path.rfind(['.', '/']) {
        Some(index) => &path[index + 1..],
        None => path,
    }
}

// -----------------------------------------------------------------------------
// Tests
