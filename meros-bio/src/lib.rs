//! Read file formats and record-aligned partitioning

pub mod formats;
pub mod partition;

pub use formats::fastq::{extract_range, FastqScanner, RecordSpan};
pub use partition::{boundary_ordinals, ReadPartitioner};
