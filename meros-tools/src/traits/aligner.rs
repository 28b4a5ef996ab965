/// Traits for alignment tools
use anyhow::Result;
use meros_core::CancellationToken;

use crate::types::{StageInvocation, StageStatus};

/// Runs one stage of a partition's alignment.
///
/// Implementations block until the stage finishes or `cancel` fires. An
/// `Err` means the stage could not be attempted at all (binary missing,
/// output not creatable); a stage that ran and failed is `Ok(Failed)`.
pub trait Aligner: Send + Sync {
    /// Execute one stage invocation
    fn run_stage(&self, invocation: &StageInvocation, cancel: &CancellationToken)
        -> Result<StageStatus>;

    /// Get tool version
    fn version(&self) -> Result<String>;

    /// Check if tool is available
    fn is_available(&self) -> bool;

    /// Short tool name for logs
    fn name(&self) -> &str {
        "aligner"
    }
}
