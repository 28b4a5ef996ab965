//! Partitioned short-read alignment.
//!
//! A run splits one FASTQ file (or a mate-pair of files) into balanced,
//! record-aligned partitions, aligns each partition with BWA on a worker
//! pool and publishes one SAM file per partition to shared storage.

pub mod orchestrator;
pub mod publish;
pub mod scheduler;
pub mod task;
pub mod unit;

pub use orchestrator::{Orchestrator, RunReport};
pub use publish::ResultPublisher;
pub use scheduler::{PoolScheduler, ProgressCallback, Scheduler, UnitOutcome, WorkUnit};
pub use task::{AlignmentTask, TaskState};
pub use unit::PartitionUnit;
