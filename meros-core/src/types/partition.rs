use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A contiguous run of whole FASTQ records inside one input file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadRange {
    pub path: PathBuf,
    /// Byte offset of the first record's `@` line
    pub start: u64,
    /// Byte offset one past the last record of the range
    pub end: u64,
    /// Zero-based index of the first record in the file
    pub first_record: u64,
    pub record_count: u64,
}

impl ReadRange {
    pub fn byte_len(&self) -> u64 {
        self.end - self.start
    }

    /// Index one past the last record of the range
    pub fn end_record(&self) -> u64 {
        self.first_record + self.record_count
    }
}

/// A balanced slice of the input assigned to one worker.
///
/// In paired mode `read2` covers exactly the same record ordinals as `read1`,
/// so both mates of every pair land in the same partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadPartition {
    pub ordinal: usize,
    pub read1: ReadRange,
    pub read2: Option<ReadRange>,
}

impl ReadPartition {
    pub fn is_paired(&self) -> bool {
        self.read2.is_some()
    }

    /// Number of reads (unpaired) or mate pairs (paired) in the partition
    pub fn record_count(&self) -> u64 {
        self.read1.record_count
    }

    pub fn byte_len(&self) -> u64 {
        self.read1.byte_len() + self.read2.as_ref().map_or(0, ReadRange::byte_len)
    }
}

/// Input read files of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadInputs {
    pub read1: PathBuf,
    pub read2: Option<PathBuf>,
}

impl ReadInputs {
    pub fn single(read1: impl Into<PathBuf>) -> Self {
        Self {
            read1: read1.into(),
            read2: None,
        }
    }

    pub fn paired(read1: impl Into<PathBuf>, read2: impl Into<PathBuf>) -> Self {
        Self {
            read1: read1.into(),
            read2: Some(read2.into()),
        }
    }

    pub fn is_paired(&self) -> bool {
        self.read2.is_some()
    }

    pub fn read2_path(&self) -> Option<&Path> {
        self.read2.as_deref()
    }
}
