//! Core error types for meros

mod partition;

use thiserror::Error;
pub use partition::PartitionError;

/// Main error type for meros operations
#[derive(Error, Debug)]
pub enum MerosError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record boundaries could not be aligned; raised before any work is dispatched
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// One or more partitions never succeeded within the retry budget
    #[error("{} partition(s) could not be completed: {partition_ids:?}", .partition_ids.len())]
    PartitionFailure { partition_ids: Vec<usize> },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Other error: {0}")]
    Other(String),
}

/// Result type alias for meros operations
pub type MerosResult<T> = Result<T, MerosError>;

impl MerosError {
    /// Shorthand for building a [`MerosError::MalformedInput`]
    pub fn malformed(message: impl Into<String>) -> Self {
        MerosError::MalformedInput(message.into())
    }
}

impl From<serde_json::Error> for MerosError {
    fn from(err: serde_json::Error) -> Self {
        MerosError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for MerosError {
    fn from(err: anyhow::Error) -> Self {
        MerosError::Other(err.to_string())
    }
}
