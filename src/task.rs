//! Per-partition alignment state machine.
//!
//! A task copies its partition's reads into the scratch directory, runs the
//! stage plan for the job's algorithm in order and leaves exactly one local
//! SAM file behind on success. Local reads and index artifacts are removed
//! whether the task succeeds or not; the SAM file is removed on failure.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use meros_bio::extract_range;
use meros_core::{AlignmentJobContext, CancellationToken, PartitionError, ReadPartition, Stage};
use meros_tools::{Aligner, StagePlan, StageStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Materializing,
    StageRunning(Stage),
    Completed,
    Failed,
}

/// Files removed when the owning task ends, unless released first
#[derive(Debug, Default)]
struct ScratchFiles {
    paths: Vec<PathBuf>,
}

impl ScratchFiles {
    fn track(&mut self, path: PathBuf) {
        self.paths.push(path);
    }

    fn release(&mut self, path: &Path) {
        self.paths.retain(|p| p != path);
    }
}

impl Drop for ScratchFiles {
    fn drop(&mut self) {
        for path in &self.paths {
            match fs::remove_file(path) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                    warn!("Failed to remove scratch file {}: {}", path.display(), e);
                }
                _ => {}
            }
        }
    }
}

/// Alignment of one partition, from reads on the input files to a local SAM file
pub struct AlignmentTask<'a> {
    ctx: &'a AlignmentJobContext,
    partition: &'a ReadPartition,
    aligner: &'a dyn Aligner,
    state: TaskState,
}

impl<'a> AlignmentTask<'a> {
    pub fn new(
        ctx: &'a AlignmentJobContext,
        partition: &'a ReadPartition,
        aligner: &'a dyn Aligner,
    ) -> Self {
        Self {
            ctx,
            partition,
            aligner,
            state: TaskState::Pending,
        }
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Run every stage; returns the local SAM path
    pub fn run(&mut self, cancel: &CancellationToken) -> Result<PathBuf, PartitionError> {
        let result = self.run_stages(cancel);
        self.state = match result {
            Ok(_) => TaskState::Completed,
            Err(_) => TaskState::Failed,
        };
        result
    }

    fn run_stages(&mut self, cancel: &CancellationToken) -> Result<PathBuf, PartitionError> {
        let ordinal = self.partition.ordinal;
        let cancelled = || PartitionError::Cancelled { partition: ordinal };
        let mut scratch = ScratchFiles::default();

        self.state = TaskState::Materializing;
        if cancel.is_cancelled() {
            return Err(cancelled());
        }
        self.materialize(&mut scratch)?;

        let plan = StagePlan::for_partition(self.ctx, ordinal);
        let output = self.ctx.local_output_path(ordinal);
        for artifact in plan.intermediates() {
            scratch.track(artifact);
        }
        scratch.track(output.clone());

        for invocation in &plan.stages {
            self.state = TaskState::StageRunning(invocation.stage);
            if cancel.is_cancelled() {
                return Err(cancelled());
            }
            debug!(
                "partition {}: running stage {} ({})",
                ordinal, invocation.stage, invocation.mode
            );

            let stage_error = |exit_status, detail| PartitionError::AlignmentStage {
                partition: ordinal,
                stage: invocation.stage,
                exit_status,
                detail,
            };
            let status = self
                .aligner
                .run_stage(invocation, cancel)
                .map_err(|e| stage_error(None, format!("{:#}", e)))?;
            match status {
                StageStatus::Success if invocation.output_file.is_file() => {}
                StageStatus::Success => {
                    return Err(stage_error(
                        Some(0),
                        format!("{} was not produced", invocation.output_file.display()),
                    ));
                }
                StageStatus::Failed { exit_status, stderr } => {
                    return Err(stage_error(exit_status, stderr));
                }
                StageStatus::Cancelled => return Err(cancelled()),
            }
        }

        scratch.release(&output);
        Ok(output)
    }

    /// Copy the partition's byte ranges into per-mate local FASTQ files
    fn materialize(&self, scratch: &mut ScratchFiles) -> Result<(), PartitionError> {
        let ordinal = self.partition.ordinal;
        let failed = |reason: String| PartitionError::Materialize {
            partition: ordinal,
            reason,
        };

        if self.ctx.paired != self.partition.is_paired() {
            return Err(failed(format!(
                "job is {} but partition has {} read file(s)",
                if self.ctx.paired { "paired" } else { "unpaired" },
                if self.partition.is_paired() { 2 } else { 1 }
            )));
        }

        let mates = std::iter::once(&self.partition.read1).chain(self.partition.read2.as_ref());
        for (mate, range) in (1u8..).zip(mates) {
            let dest = self.ctx.local_reads_path(ordinal, mate);
            scratch.track(dest.clone());
            let copied = extract_range(range, &dest)
                .map_err(|e| failed(format!("{}: {}", dest.display(), e)))?;
            debug!(
                "partition {}: staged {} reads ({} bytes) at {}",
                ordinal,
                range.record_count,
                copied,
                dest.display()
            );
        }
        Ok(())
    }
}
