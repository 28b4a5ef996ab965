use anyhow::Result;
use std::path::Path;

/// Destination for per-partition results that every node can read.
///
/// Paths are in the backend's namespace; for a mounted file system they
/// are ordinary absolute paths.
pub trait SharedStorage: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Create `dir` and its parents if missing
    fn ensure_dir(&self, dir: &Path) -> Result<()>;

    /// Copy the local file `local` to `dest`, replacing any existing object.
    ///
    /// Returns the number of bytes written. Readers never observe a partially
    /// written `dest`.
    fn copy_from_local(&self, local: &Path, dest: &Path) -> Result<u64>;

    /// Size of the object at `path`, or `None` if it does not exist
    fn size(&self, path: &Path) -> Result<Option<u64>>;

    fn remove(&self, path: &Path) -> Result<()>;

    /// List object names directly under `dir`, sorted
    fn list(&self, dir: &Path) -> Result<Vec<String>>;
}
