//! Errors scoped to a single partition's unit of work

use crate::types::Stage;
use std::path::PathBuf;
use thiserror::Error;

/// Failure of one partition's alignment or publish step.
///
/// These never abort sibling partitions; they are carried inside a failed
/// [`crate::TaskResult`] and only surface to callers in aggregate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PartitionError {
    /// The partition's reads could not be copied into the local work directory
    #[error("partition {partition}: could not stage reads locally: {reason}")]
    Materialize { partition: usize, reason: String },

    /// An external aligner invocation failed or produced no output
    #[error("partition {partition}: stage {stage} failed (exit status {}): {detail}", display_status(.exit_status))]
    AlignmentStage {
        partition: usize,
        stage: Stage,
        exit_status: Option<i32>,
        detail: String,
    },

    /// Copying the local result to shared storage failed; the local result is kept
    #[error("partition {partition}: publishing to {} failed: {reason}", .destination.display())]
    Publish {
        partition: usize,
        destination: PathBuf,
        reason: String,
    },

    #[error("partition {partition}: cancelled")]
    Cancelled { partition: usize },
}

fn display_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "none".to_string(),
    }
}

impl PartitionError {
    /// Ordinal of the partition this error belongs to
    pub fn partition(&self) -> usize {
        match self {
            PartitionError::Materialize { partition, .. }
            | PartitionError::AlignmentStage { partition, .. }
            | PartitionError::Publish { partition, .. }
            | PartitionError::Cancelled { partition } => *partition,
        }
    }

    /// Whether a scheduler may re-run the unit after this error
    pub fn is_retryable(&self) -> bool {
        !matches!(self, PartitionError::Cancelled { .. })
    }

    /// The failing stage, when the error came from the aligner
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PartitionError::AlignmentStage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
