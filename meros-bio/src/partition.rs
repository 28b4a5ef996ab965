//! Record-aligned partitioning of single and paired FASTQ inputs.
//!
//! Boundaries are chosen as record ordinals on the first file, then the
//! byte offsets of those same ordinals are located in the second file.
//! Splitting the second file independently by size would separate mates
//! whenever the two files have different read lengths.

use std::path::Path;

use meros_core::{MerosError, MerosResult, ReadInputs, ReadPartition, ReadRange};
use tracing::{debug, info};

use crate::formats::fastq::{mate_stem, FastqScanner};

/// Record ordinals delimiting `partitions` balanced slices of `total` records.
///
/// Returns `n + 1` ordinals for `n = min(partitions, total)` slices; the
/// first `total % n` slices hold one extra record. Empty slices are never
/// produced.
pub fn boundary_ordinals(total: u64, partitions: usize) -> Vec<u64> {
    let slices = (partitions as u64).min(total);
    if slices == 0 {
        return vec![0];
    }
    let quotient = total / slices;
    let remainder = total % slices;
    (0..=slices)
        .map(|k| k * quotient + k.min(remainder))
        .collect()
}

/// Byte offsets of the boundary records in one file
struct LocatedBoundaries {
    /// Offset of each boundary record, plus the end of the last record
    offsets: Vec<u64>,
    /// Mate stem of each boundary record's name
    stems: Vec<Vec<u8>>,
    total: u64,
}

/// Splits read files into balanced [`ReadPartition`]s
#[derive(Debug, Clone)]
pub struct ReadPartitioner {
    partitions: usize,
    verify_mates: bool,
}

impl ReadPartitioner {
    pub fn new(partitions: usize) -> Self {
        Self {
            partitions,
            verify_mates: true,
        }
    }

    /// Toggle the read-name check between mates at each boundary
    pub fn with_mate_check(mut self, enabled: bool) -> Self {
        self.verify_mates = enabled;
        self
    }

    pub fn requested(&self) -> usize {
        self.partitions
    }

    /// Partition `inputs`, covering every record exactly once
    pub fn partition(&self, inputs: &ReadInputs) -> MerosResult<Vec<ReadPartition>> {
        if self.partitions == 0 {
            return Err(MerosError::Configuration(
                "partition count must be at least 1".to_string(),
            ));
        }

        let total = count_records(&inputs.read1)?;
        if total == 0 {
            return Err(MerosError::malformed(format!(
                "{}: no FASTQ records found",
                inputs.read1.display()
            )));
        }

        let ordinals = boundary_ordinals(total, self.partitions);
        debug!(
            "{} records in {}, boundaries at {:?}",
            total,
            inputs.read1.display(),
            ordinals
        );

        let first = locate_boundaries(&inputs.read1, &ordinals)?;
        if first.total != total {
            return Err(MerosError::malformed(format!(
                "{} changed while partitioning ({} then {} records)",
                inputs.read1.display(),
                total,
                first.total
            )));
        }

        let second = match inputs.read2_path() {
            Some(read2) => {
                let located = locate_boundaries(read2, &ordinals)?;
                if located.total != total {
                    return Err(MerosError::malformed(format!(
                        "mate count mismatch: {} has {} records but {} has {}",
                        inputs.read1.display(),
                        total,
                        read2.display(),
                        located.total
                    )));
                }
                if self.verify_mates {
                    check_mates(inputs, &ordinals, &first, &located)?;
                }
                Some((read2, located))
            }
            None => None,
        };

        let partitions: Vec<ReadPartition> = ordinals
            .windows(2)
            .enumerate()
            .map(|(ordinal, bounds)| ReadPartition {
                ordinal,
                read1: range_for(&inputs.read1, &first, ordinal, bounds),
                read2: second
                    .as_ref()
                    .map(|(path, located)| range_for(path, located, ordinal, bounds)),
            })
            .collect();

        info!(
            "Partitioned {} {} into {} partition(s) (requested {})",
            total,
            if inputs.is_paired() { "mate pairs" } else { "reads" },
            partitions.len(),
            self.partitions
        );
        Ok(partitions)
    }
}

fn range_for(path: &Path, located: &LocatedBoundaries, ordinal: usize, bounds: &[u64]) -> ReadRange {
    ReadRange {
        path: path.to_path_buf(),
        start: located.offsets[ordinal],
        end: located.offsets[ordinal + 1],
        first_record: bounds[0],
        record_count: bounds[1] - bounds[0],
    }
}

fn count_records(path: &Path) -> MerosResult<u64> {
    let mut scanner = FastqScanner::open(path)?;
    while scanner.next_record()?.is_some() {}
    Ok(scanner.records_read())
}

fn locate_boundaries(path: &Path, ordinals: &[u64]) -> MerosResult<LocatedBoundaries> {
    let starts = &ordinals[..ordinals.len() - 1];
    let mut scanner = FastqScanner::open(path)?;
    let mut offsets = Vec::with_capacity(ordinals.len());
    let mut stems = Vec::with_capacity(starts.len());
    let mut end = 0;

    while let Some(span) = scanner.next_record()? {
        if offsets.len() < starts.len() && span.index == starts[offsets.len()] {
            offsets.push(span.offset);
            stems.push(mate_stem(scanner.name()).to_vec());
        }
        end = span.end();
    }
    offsets.push(end);

    Ok(LocatedBoundaries {
        offsets,
        stems,
        total: scanner.records_read(),
    })
}

fn check_mates(
    inputs: &ReadInputs,
    ordinals: &[u64],
    first: &LocatedBoundaries,
    second: &LocatedBoundaries,
) -> MerosResult<()> {
    for (k, (a, b)) in first.stems.iter().zip(&second.stems).enumerate() {
        if a != b {
            return Err(MerosError::malformed(format!(
                "mates disagree at record {}: '{}' in {} vs '{}' in {}",
                ordinals[k],
                String::from_utf8_lossy(a),
                inputs.read1.display(),
                String::from_utf8_lossy(b),
                inputs.read2_path().map(|p| p.display().to_string()).unwrap_or_default()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_even_split() {
        assert_eq!(boundary_ordinals(1000, 4), vec![0, 250, 500, 750, 1000]);
    }

    #[test]
    fn test_remainder_goes_to_leading_partitions() {
        let ordinals = boundary_ordinals(10, 4);
        assert_eq!(ordinals, vec![0, 3, 6, 8, 10]);
        let sizes: Vec<u64> = ordinals.windows(2).map(|w| w[1] - w[0]).collect();
        assert!(sizes.iter().max().unwrap() - sizes.iter().min().unwrap() <= 1);
    }

    #[test]
    fn test_more_partitions_than_records() {
        assert_eq!(boundary_ordinals(3, 8), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_single_partition() {
        assert_eq!(boundary_ordinals(7, 1), vec![0, 7]);
    }

    #[test]
    fn test_zero_partitions_rejected() {
        let err = ReadPartitioner::new(0)
            .partition(&ReadInputs::single("/nonexistent.fq"))
            .unwrap_err();
        assert!(matches!(err, MerosError::Configuration(_)));
    }
}
