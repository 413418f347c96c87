//! Dense numbering of document identities.

use vc_object::hash::HashMap;
use vc_object::path::ObjectPath;

/// Sorted, deduplicated identities with their positions.
///
/// Built from a rescan. Sorting makes the numbering reproducible for the
/// same set of documents, so indices can be stored in packed form using
/// [`AssetIndex::index_bits`] bits.
///
/// # Examples
///
/// ```
/// use vc_asset::index::AssetIndex;
/// use vc_object::path::ObjectPath;
///
/// let paths = ["/Data/B", "/Data/A", "/Data/C", "/Data/A"].map(|p| ObjectPath::parse(p).unwrap());
/// let index = AssetIndex::from_paths(paths);
///
/// assert_eq!(index.len(), 3);
/// assert_eq!(index.index_of(&ObjectPath::parse("/Data/B").unwrap()), Some(1));
/// assert_eq!(index.index_bits(), 2);
/// ```
#[derive(Clone, Debug, Default)]
pub struct AssetIndex {
    paths: Vec<ObjectPath>,
    positions: HashMap<ObjectPath, usize>,
}

impl AssetIndex {
    pub fn from_paths(paths: impl IntoIterator<Item = ObjectPath>) -> Self {
        let mut paths: Vec<_> = paths.into_iter().collect();
        paths.sort_unstable();
        paths.dedup();

        let positions = paths
            .iter()
            .enumerate()
            .map(|(index, path)| (path.clone(), index))
            .collect();
        Self { paths, positions }
    }

    #[inline]
    pub fn index_of(&self, path: &ObjectPath) -> Option<usize> {
        self.positions.get(path).copied()
    }

    #[inline]
    pub fn path_at(&self, index: usize) -> Option<&ObjectPath> {
        self.paths.get(index)
    }

    /// Bits needed to store any index, `0` for fewer than two entries.
    #[inline]
    pub fn index_bits(&self) -> u32 {
        usize::BITS - self.paths.len().saturating_sub(1).leading_zeros()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Iterates in index order.
    pub fn iter(&self) -> core::slice::Iter<'_, ObjectPath> {
        self.paths.iter()
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use vc_object::path::ObjectPath;

    use super::AssetIndex;

    fn index(count: usize) -> AssetIndex {
        AssetIndex::from_paths((0..count).map(|i| ObjectPath::parse(&format!("/Data/Item{i:03}")).unwrap()))
    }

    #[test]
    fn index_bits() {
        assert_eq!(index(0).index_bits(), 0);
        assert_eq!(index(1).index_bits(), 0);
        assert_eq!(index(2).index_bits(), 1);
        assert_eq!(index(3).index_bits(), 2);
        assert_eq!(index(4).index_bits(), 2);
        assert_eq!(index(5).index_bits(), 3);
        assert_eq!(index(256).index_bits(), 8);
        assert_eq!(index(257).index_bits(), 9);
    }

    #[test]
    fn lexical_order() {
        let index = index(12);
        let paths: Vec<_> = index.iter().cloned().collect();
        let mut sorted = paths.clone();
        sorted.sort();
        assert_eq!(paths, sorted);

        for (position, path) in index.iter().enumerate() {
            assert_eq!(index.index_of(path), Some(position));
            assert_eq!(index.path_at(position), Some(path));
        }
        assert_eq!(index.path_at(12), None);
    }
}
