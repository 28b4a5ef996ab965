//! Shared data model for a partitioned alignment run

mod algorithm;
mod cancel;
mod context;
mod partition;
mod result;

pub use algorithm::{Algorithm, Stage};
pub use cancel::CancellationToken;
pub use context::{published_name, AlignmentJobContext, RunIdentity};
pub use partition::{ReadInputs, ReadPartition, ReadRange};
pub use result::{TaskResult, TaskStatus};
