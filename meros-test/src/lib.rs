//! Test utilities for the meros workspace
//!
//! Shared fixtures and helpers for tests across the workspace:
//!
//! - **Test Environment**: isolated input, scratch and shared directories with automatic cleanup
//! - **Fixtures**: deterministic single-end and paired FASTQ files
//! - **Mock Implementations**: shared storage with injectable failures

pub mod environment;
pub mod fixtures;
pub mod mock;

// Re-export commonly used items
pub use environment::TestEnvironment;
pub use fixtures::{
    generate_pairs, generate_reads, read_names, write_fastq, write_paired_fastq, write_single_fastq,
    TestRead,
};
pub use mock::FlakyStorage;

pub use anyhow::{Context, Result};
pub use tempfile;

/// Initialize test logging (safe to call from every test)
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("MEROS_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
