use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use vc_object::path::ObjectPath;
use walkdir::WalkDir;

use super::{DocumentStore, StoreError, is_below};

const EXTENSION: &str = "json";

// -----------------------------------------------------------------------------
// FileStore

/// Stores each document as a `.json` file below a directory.
///
/// The package root `mount` maps onto `root_dir`, so with the mount `/Data`
/// the identity `/Data/Items/Sword` lives in `<root_dir>/Items/Sword.json`.
///
/// # Examples
///
/// ```
/// use vc_asset::store::{DocumentStore, FileStore};
/// use vc_object::path::ObjectPath;
///
/// let dir = tempfile::tempdir().unwrap();
/// let store = FileStore::new(dir.path(), "/Data");
///
/// let sword = ObjectPath::parse("/Data/Items/Sword").unwrap();
/// store.write_text(&sword, "{}").unwrap();
///
/// assert!(dir.path().join("Items").join("Sword.json").is_file());
/// assert_eq!(store.read_text(&sword).unwrap(), "{}");
/// ```
#[derive(Clone, Debug)]
pub struct FileStore {
    root_dir: PathBuf,
    mount: String,
}

impl FileStore {
    pub fn new(root_dir: impl Into<PathBuf>, mount: &str) -> Self {
        Self {
            root_dir: root_dir.into(),
            mount: mount.trim_end_matches('/').to_owned(),
        }
    }

    #[inline]
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    #[inline]
    pub fn mount(&self) -> &str {
        &self.mount
    }

    /// Returns the file backing `path`.
    pub fn file_of(&self, path: &ObjectPath) -> Result<PathBuf, StoreError> {
        let file = self
            .dir_of(path.package())
            .filter(|_| path.package() != self.mount)
            .ok_or_else(|| StoreError::OutsideRoot(path.to_string()))?;
        let mut file = file.into_os_string();
        file.push(".");
        file.push(EXTENSION);
        Ok(PathBuf::from(file))
    }

    /// Returns the identity stored in `file`, `None` for files that are not
    /// documents of this store.
    pub fn path_of(&self, file: &Path) -> Option<ObjectPath> {
        if file.extension()? != EXTENSION {
            return None;
        }
        let relative = file.strip_prefix(&self.root_dir).ok()?.with_extension("");

        let mut package = self.mount.clone();
        for component in relative.components() {
            let Component::Normal(segment) = component else {
                return None;
            };
            package.push('/');
            package.push_str(segment.to_str()?);
        }
        ObjectPath::from_package(&package).ok()
    }

    /// Maps a package path below the mount onto a directory path.
    fn dir_of(&self, package: &str) -> Option<PathBuf> {
        if !is_below(package, &self.mount) {
            return None;
        }
        let mut dir = self.root_dir.clone();
        for segment in package[self.mount.len()..].split('/').filter(|s| !s.is_empty()) {
            if segment == "." || segment == ".." || segment.contains('\\') {
                return None;
            }
            dir.push(segment);
        }
        Some(dir)
    }
}

impl DocumentStore for FileStore {
    fn read_text(&self, path: &ObjectPath) -> Result<String, StoreError> {
        let file = self.file_of(path)?;
        fs::read_to_string(&file).map_err(|source| StoreError::io(path, file, source))
    }

    fn write_text(&self, path: &ObjectPath, text: &str) -> Result<(), StoreError> {
        let file = self.file_of(path)?;
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        log::trace!("writing `{path}` to `{}`", file.display());
        fs::write(&file, text).map_err(|source| StoreError::Io { path: file, source })
    }

    fn exists(&self, path: &ObjectPath) -> bool {
        self.file_of(path).is_ok_and(|file| file.is_file())
    }

    fn remove(&self, path: &ObjectPath) -> Result<(), StoreError> {
        let file = self.file_of(path)?;
        fs::remove_file(&file).map_err(|source| StoreError::io(path, file, source))
    }

    fn enumerate(&self, root: &str) -> Box<dyn Iterator<Item = Result<ObjectPath, StoreError>> + '_> {
        let Some(dir) = self.dir_of(root) else {
            return Box::new(core::iter::once(Err(StoreError::OutsideRoot(root.to_owned()))));
        };

        let walk = WalkDir::new(dir).sort_by_file_name().into_iter().filter_map(move |entry| {
            let entry = match entry {
                Ok(entry) => entry,
                // A missing root holds no documents.
                Err(error) if error.depth() == 0 && is_not_found(&error) => return None,
                Err(error) => {
                    let path = error.path().map(Path::to_path_buf).unwrap_or_default();
                    return Some(Err(StoreError::Io {
                        path,
                        source: error.into(),
                    }));
                }
            };
            if !entry.file_type().is_file() {
                return None;
            }
            let object = self.path_of(entry.path());
            if object.is_none() {
                log::trace!("skipping `{}`", entry.path().display());
            }
            object.map(Ok)
        });
        Box::new(walk)
    }
}

fn is_not_found(error: &walkdir::Error) -> bool {
    error.io_error().is_some_and(|source| source.kind() == ErrorKind::NotFound)
}

// -----------------------------------------------------------------------------
// Tests
