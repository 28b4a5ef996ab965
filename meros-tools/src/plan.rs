//! Per-partition stage plans.
//!
//! Single-stage algorithms (`mem`, `bwasw`) align straight to SAM. `aln`
//! indexes each read file into a `.sai` artifact, then merges the
//! artifacts with the reads (`sampe` paired, `samse` unpaired).

use std::path::{Path, PathBuf};

use meros_core::{Algorithm, AlignmentJobContext, Stage};

use crate::types::{InvocationMode, StageInvocation};

/// Ordered stage invocations for one partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePlan {
    pub algorithm: Algorithm,
    pub stages: Vec<StageInvocation>,
}

impl StagePlan {
    /// Plan the stages aligning `read1` (and `read2` when paired) into `output`
    pub fn build(
        algorithm: Algorithm,
        partition: usize,
        read1: &Path,
        read2: Option<&Path>,
        output: &Path,
    ) -> Self {
        let stages = if algorithm.is_multi_stage() {
            index_then_merge(partition, read1, read2, output)
        } else {
            vec![StageInvocation {
                partition,
                stage: Stage::Single,
                mode: InvocationMode::Single,
                read_file1: read1.to_path_buf(),
                read_file2: read2.map(Path::to_path_buf),
                index_artifacts: Vec::new(),
                output_file: output.to_path_buf(),
            }]
        };
        Self { algorithm, stages }
    }

    /// Plan for partition `ordinal` using the context's local file names
    pub fn for_partition(ctx: &AlignmentJobContext, ordinal: usize) -> Self {
        let read1 = ctx.local_reads_path(ordinal, 1);
        let read2 = ctx.paired.then(|| ctx.local_reads_path(ordinal, 2));
        Self::build(
            ctx.algorithm,
            ordinal,
            &read1,
            read2.as_deref(),
            &ctx.local_output_path(ordinal),
        )
    }

    /// Intermediate artifacts the plan creates, removed once the partition ends
    pub fn intermediates(&self) -> Vec<PathBuf> {
        self.stages
            .iter()
            .filter(|s| s.produces_intermediate())
            .map(|s| s.output_file.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

fn index_then_merge(
    partition: usize,
    read1: &Path,
    read2: Option<&Path>,
    output: &Path,
) -> Vec<StageInvocation> {
    let index = |stage, reads: &Path| StageInvocation {
        partition,
        stage,
        mode: InvocationMode::Index,
        read_file1: reads.to_path_buf(),
        read_file2: None,
        index_artifacts: Vec::new(),
        output_file: AlignmentJobContext::index_artifact_path(reads),
    };

    let mut stages = vec![index(Stage::IndexRead1, read1)];
    if let Some(read2) = read2 {
        stages.push(index(Stage::IndexRead2, read2));
    }
    let artifacts = stages.iter().map(|s| s.output_file.clone()).collect();
    stages.push(StageInvocation {
        partition,
        stage: Stage::Merge,
        mode: InvocationMode::Merge,
        read_file1: read1.to_path_buf(),
        read_file2: read2.map(Path::to_path_buf),
        index_artifacts: artifacts,
        output_file: output.to_path_buf(),
    });
    stages
}
