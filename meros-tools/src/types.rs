//! Common types for aligner invocations

use meros_core::Stage;
use std::fmt;
use std::path::PathBuf;

/// What an aligner invocation produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvocationMode {
    /// Per-read-file index artifact (`bwa aln`)
    Index,
    /// SAM from index artifacts plus reads (`bwa samse`/`sampe`)
    Merge,
    /// SAM straight from reads (`bwa mem`, `bwa bwasw`)
    Single,
}

impl InvocationMode {
    pub fn name(&self) -> &'static str {
        match self {
            InvocationMode::Index => "index",
            InvocationMode::Merge => "merge",
            InvocationMode::Single => "single",
        }
    }
}

impl fmt::Display for InvocationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One external aligner call within a partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageInvocation {
    pub partition: usize,
    pub stage: Stage,
    pub mode: InvocationMode,
    pub read_file1: PathBuf,
    pub read_file2: Option<PathBuf>,
    /// Index artifacts consumed by a merge, in mate order
    pub index_artifacts: Vec<PathBuf>,
    /// File receiving the tool's standard output
    pub output_file: PathBuf,
}

impl StageInvocation {
    /// Whether `output_file` is an intermediate rather than the partition's SAM
    pub fn produces_intermediate(&self) -> bool {
        self.mode == InvocationMode::Index
    }
}

/// Outcome of one stage invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageStatus {
    Success,
    Failed {
        exit_status: Option<i32>,
        /// Last lines the tool wrote to stderr
        stderr: String,
    },
    Cancelled,
}

impl StageStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, StageStatus::Success)
    }
}
