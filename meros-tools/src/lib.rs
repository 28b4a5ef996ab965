//! External aligner integration
//!
//! Wraps the BWA command line behind the [`Aligner`] trait and builds the
//! per-partition stage plan for each supported algorithm.

// Modules
pub mod aligners;
pub mod plan;
pub mod testing;
pub mod traits;
pub mod types;

// Re-exports for convenience
pub use aligners::BwaAligner;
pub use plan::StagePlan;
pub use testing::{MockAligner, MockBehavior, MockRule};
pub use traits::Aligner;
pub use types::{InvocationMode, StageInvocation, StageStatus};
