//! Core utilities and types shared across all meros crates

pub mod config;
pub mod error;
pub mod system;
pub mod types;

// Re-export commonly used types
pub use config::{load_config, save_config, Config};
pub use error::{MerosError, MerosResult, PartitionError};

// Re-export core types
pub use types::{
    published_name, Algorithm, AlignmentJobContext, CancellationToken, ReadInputs,
    ReadPartition, ReadRange, RunIdentity, Stage, TaskResult, TaskStatus,
};

// Re-export system utilities
pub use system::{default_config_path, generate_app_id, meros_home, resolve_tmp_dir};

/// Version information for the meros project
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");
