//! Shared storage with injectable copy failures

use anyhow::{bail, Result};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use meros_storage::{MountedStorage, SharedStorage};

/// Mounted storage whose first copies fail or come out truncated
#[derive(Debug, Clone, Default)]
pub struct FlakyStorage {
    inner: MountedStorage,
    failures_left: Arc<AtomicUsize>,
    truncations_left: Arc<AtomicUsize>,
    copies: Arc<AtomicUsize>,
}

impl FlakyStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` copies before touching the destination
    pub fn failing(self, n: usize) -> Self {
        self.failures_left.store(n, Ordering::SeqCst);
        self
    }

    /// Report success for the next `n` copies but leave half a file behind
    pub fn truncating(self, n: usize) -> Self {
        self.truncations_left.store(n, Ordering::SeqCst);
        self
    }

    /// Copy attempts seen so far, failed ones included
    pub fn copy_attempts(&self) -> usize {
        self.copies.load(Ordering::SeqCst)
    }

    fn take(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl SharedStorage for FlakyStorage {
    fn name(&self) -> &str {
        "flaky"
    }

    fn ensure_dir(&self, dir: &Path) -> Result<()> {
        self.inner.ensure_dir(dir)
    }

    fn copy_from_local(&self, local: &Path, dest: &Path) -> Result<u64> {
        self.copies.fetch_add(1, Ordering::SeqCst);
        if Self::take(&self.failures_left) {
            bail!("injected copy failure for {}", dest.display());
        }
        let copied = self.inner.copy_from_local(local, dest)?;
        if Self::take(&self.truncations_left) {
            let file = std::fs::OpenOptions::new().write(true).open(dest)?;
            file.set_len(copied / 2)?;
        }
        Ok(copied)
    }

    fn size(&self, path: &Path) -> Result<Option<u64>> {
        self.inner.size(path)
    }

    fn remove(&self, path: &Path) -> Result<()> {
        self.inner.remove(path)
    }

    fn list(&self, dir: &Path) -> Result<Vec<String>> {
        self.inner.list(dir)
    }
}
