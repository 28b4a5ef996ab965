//! Test environment management
//!
//! Isolated input, scratch and shared-output directories removed on drop.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use meros_core::{Algorithm, AlignmentJobContext, RunIdentity};

pub struct TestEnvironment {
    temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::with_prefix("meros-test")
            .context("Failed to create temporary directory")?;
        for sub in ["input", "scratch", "shared"] {
            std::fs::create_dir_all(temp_dir.path().join(sub))?;
        }
        Ok(Self { temp_dir })
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Where test inputs are written
    pub fn input_dir(&self) -> PathBuf {
        self.root().join("input")
    }

    /// Node-local scratch directory
    pub fn scratch_dir(&self) -> PathBuf {
        self.root().join("scratch")
    }

    /// Stand-in for the shared file system
    pub fn shared_dir(&self) -> PathBuf {
        self.root().join("shared")
    }

    /// Job context rooted in this environment, with identity `app`/`123`
    pub fn context(&self, algorithm: Algorithm, paired: bool) -> AlignmentJobContext {
        AlignmentJobContext::new(
            RunIdentity::new("app", "123"),
            self.scratch_dir(),
            algorithm,
            paired,
            self.shared_dir(),
        )
    }

    /// Sorted names of the regular files in `dir`
    pub fn list_files(&self, dir: &Path) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}
