use vc_object::object::ObjectHandle;
use vc_object::path::ObjectPath;

/// Looks up objects named by references in a document.
///
/// Called while a document is being decoded, possibly while another object
/// is mid-import. Implementations must not block on the import of the
/// object they return.
pub trait ObjectResolver {
    /// Returns the object at `path`, following object redirects.
    fn resolve_reference(&self, path: &ObjectPath) -> Option<ObjectHandle>;
}

/// Resolves nothing; every non-null reference fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoResolver;

impl ObjectResolver for NoResolver {
    #[inline]
    fn resolve_reference(&self, _path: &ObjectPath) -> Option<ObjectHandle> {
        None
    }
}

impl<F> ObjectResolver for F
where
    F: Fn(&ObjectPath) -> Option<ObjectHandle>,
{
    #[inline]
    fn resolve_reference(&self, path: &ObjectPath) -> Option<ObjectHandle> {
        self(path)
    }
}
