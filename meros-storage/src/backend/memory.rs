//! In-process object store keyed by path

use anyhow::{bail, Context, Result};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::traits::SharedStorage;

/// Objects held in memory; clones share the same store
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    objects: Arc<RwLock<BTreeMap<PathBuf, Vec<u8>>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Contents of the object at `path`
    pub fn get(&self, path: &Path) -> Option<Vec<u8>> {
        self.objects.read().get(path).cloned()
    }

    pub fn object_count(&self) -> usize {
        self.objects.read().len()
    }
}

impl SharedStorage for MemoryStorage {
    fn name(&self) -> &str {
        "memory"
    }

    fn ensure_dir(&self, _dir: &Path) -> Result<()> {
        Ok(())
    }

    fn copy_from_local(&self, local: &Path, dest: &Path) -> Result<u64> {
        if !local.is_file() {
            bail!("Local file not found: {}", local.display());
        }
        let bytes = std::fs::read(local)
            .with_context(|| format!("Failed to read {}", local.display()))?;
        let len = bytes.len() as u64;
        self.objects.write().insert(dest.to_path_buf(), bytes);
        Ok(len)
    }

    fn size(&self, path: &Path) -> Result<Option<u64>> {
        Ok(self.objects.read().get(path).map(|b| b.len() as u64))
    }

    fn remove(&self, path: &Path) -> Result<()> {
        self.objects.write().remove(path);
        Ok(())
    }

    fn list(&self, dir: &Path) -> Result<Vec<String>> {
        Ok(self
            .objects
            .read()
            .keys()
            .filter(|p| p.parent() == Some(dir))
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
            .collect())
    }
}
