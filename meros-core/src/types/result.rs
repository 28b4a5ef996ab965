use std::path::PathBuf;
use std::time::Duration;

use crate::PartitionError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Succeeded,
    Failed(PartitionError),
}

/// Outcome of one partition's alignment and publish, after all retries
#[derive(Debug, Clone)]
pub struct TaskResult {
    pub partition: usize,
    pub local_output: PathBuf,
    /// Set only when the publish step succeeded
    pub published_path: Option<PathBuf>,
    pub status: TaskStatus,
    pub attempts: u32,
    pub elapsed: Duration,
}

impl TaskResult {
    pub fn is_success(&self) -> bool {
        matches!(self.status, TaskStatus::Succeeded)
    }

    pub fn error(&self) -> Option<&PartitionError> {
        match &self.status {
            TaskStatus::Failed(err) => Some(err),
            TaskStatus::Succeeded => None,
        }
    }
}
