use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::Algorithm;

/// Identity of a run as reported by the hosting session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunIdentity {
    pub app_name: String,
    pub app_id: String,
}

impl RunIdentity {
    pub fn new(app_name: impl Into<String>, app_id: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            app_id: app_id.into(),
        }
    }

    /// Identity with a freshly generated `local-<millis>` id
    pub fn generated(app_name: impl Into<String>) -> Self {
        Self::new(app_name, crate::system::generate_app_id())
    }
}

/// Name of the SAM file a partition publishes: `<appName>-<appId>-<ordinal>.sam`.
///
/// Pure in its arguments, so a re-executed partition overwrites its earlier
/// output instead of adding a second file.
pub fn published_name(app_name: &str, app_id: &str, ordinal: usize) -> String {
    format!("{}-{}-{}.sam", app_name, app_id, ordinal)
}

/// Immutable per-run settings shared by every partition's unit of work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentJobContext {
    pub identity: RunIdentity,
    /// Local scratch directory; every file in it is keyed by partition ordinal
    pub tmp_dir: PathBuf,
    pub algorithm: Algorithm,
    pub paired: bool,
    /// Shared output directory the publisher copies results into
    pub output_dir: PathBuf,
}

impl AlignmentJobContext {
    pub fn new(
        identity: RunIdentity,
        tmp_dir: impl Into<PathBuf>,
        algorithm: Algorithm,
        paired: bool,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            identity,
            tmp_dir: tmp_dir.into(),
            algorithm,
            paired,
            output_dir: output_dir.into(),
        }
    }

    pub fn app_name(&self) -> &str {
        &self.identity.app_name
    }

    pub fn app_id(&self) -> &str {
        &self.identity.app_id
    }

    pub fn output_name(&self, ordinal: usize) -> String {
        published_name(self.app_name(), self.app_id(), ordinal)
    }

    /// Where the aligner writes a partition's SAM before publishing
    pub fn local_output_path(&self, ordinal: usize) -> PathBuf {
        self.tmp_dir.join(self.output_name(ordinal))
    }

    /// Final location of a partition's SAM in shared storage
    pub fn published_path(&self, ordinal: usize) -> PathBuf {
        self.output_dir.join(self.output_name(ordinal))
    }

    /// Local copy of one mate file of a partition (`mate` is 1 or 2)
    pub fn local_reads_path(&self, ordinal: usize, mate: u8) -> PathBuf {
        self.tmp_dir.join(format!(
            "{}-{}-{}_{}.fastq",
            self.app_name(),
            self.app_id(),
            ordinal,
            mate
        ))
    }

    /// Intermediate index artifact produced for a read file (`<reads>.sai`)
    pub fn index_artifact_path(reads: &Path) -> PathBuf {
        let mut name = reads.as_os_str().to_os_string();
        name.push(".sai");
        PathBuf::from(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn context() -> AlignmentJobContext {
        AlignmentJobContext::new(
            RunIdentity::new("app", "123"),
            "/scratch",
            Algorithm::Aln,
            true,
            "/shared/out",
        )
    }

    #[test]
    fn test_published_name_is_deterministic() {
        assert_eq!(published_name("app", "123", 0), "app-123-0.sam");
        assert_eq!(
            published_name("app", "123", 3),
            published_name("app", "123", 3)
        );
        assert_ne!(published_name("app", "123", 3), published_name("app", "124", 3));
    }

    #[test]
    fn test_context_paths() {
        let ctx = context();
        assert_eq!(ctx.local_output_path(2), PathBuf::from("/scratch/app-123-2.sam"));
        assert_eq!(ctx.published_path(2), PathBuf::from("/shared/out/app-123-2.sam"));
        assert_eq!(
            ctx.local_reads_path(2, 1),
            PathBuf::from("/scratch/app-123-2_1.fastq")
        );
    }

    #[test]
    fn test_index_artifact_appends_suffix() {
        let reads = PathBuf::from("/scratch/app-123-2_2.fastq");
        assert_eq!(
            AlignmentJobContext::index_artifact_path(&reads),
            PathBuf::from("/scratch/app-123-2_2.fastq.sai")
        );
    }
}
