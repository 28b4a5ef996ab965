//! Shared storage on a file system mounted at the same path on every node

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::traits::SharedStorage;

#[derive(Debug, Clone, Default)]
pub struct MountedStorage;

impl MountedStorage {
    pub fn new() -> Self {
        Self
    }

    /// Staging name next to `dest`, renamed over it once the copy completes
    fn partial_path(dest: &Path) -> Result<PathBuf> {
        let name = dest
            .file_name()
            .with_context(|| format!("Destination has no file name: {}", dest.display()))?;
        let mut partial = std::ffi::OsString::from(".");
        partial.push(name);
        partial.push(".partial");
        Ok(dest.with_file_name(partial))
    }
}

impl SharedStorage for MountedStorage {
    fn name(&self) -> &str {
        "mounted"
    }

    fn ensure_dir(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))
    }

    fn copy_from_local(&self, local: &Path, dest: &Path) -> Result<u64> {
        if !local.is_file() {
            bail!("Local file not found: {}", local.display());
        }
        if let Some(parent) = dest.parent() {
            self.ensure_dir(parent)?;
        }

        let partial = Self::partial_path(dest)?;
        let copied = match fs::copy(local, &partial) {
            Ok(n) => n,
            Err(e) => {
                let _ = fs::remove_file(&partial);
                return Err(e).with_context(|| {
                    format!("Failed to copy {} to {}", local.display(), partial.display())
                });
            }
        };
        fs::rename(&partial, dest).with_context(|| {
            format!("Failed to move {} into place at {}", partial.display(), dest.display())
        })?;

        debug!("Copied {} bytes to {}", copied, dest.display());
        Ok(copied)
    }

    fn size(&self, path: &Path) -> Result<Option<u64>> {
        match fs::metadata(path) {
            Ok(meta) if meta.is_file() => Ok(Some(meta.len())),
            Ok(_) => bail!("Not a regular file: {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to stat {}", path.display())),
        }
    }

    fn remove(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                Err(e).with_context(|| format!("Failed to remove {}", path.display()))
            }
            _ => Ok(()),
        }
    }

    fn list(&self, dir: &Path) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(dir)
            .with_context(|| format!("Failed to list {}", dir.display()))?
        {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}
