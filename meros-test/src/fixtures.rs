//! Test fixtures and data generators
//!
//! Deterministic FASTQ inputs for partitioning and pipeline tests.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};

/// One FASTQ record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRead {
    pub name: String,
    pub sequence: String,
    pub quality: String,
}

impl TestRead {
    pub fn new(name: impl Into<String>, sequence: impl Into<String>) -> Self {
        let sequence = sequence.into();
        let quality = "I".repeat(sequence.len());
        Self {
            name: name.into(),
            sequence,
            quality,
        }
    }

    /// Render as a four-line FASTQ record
    pub fn to_fastq(&self) -> String {
        format!("@{}\n{}\n+\n{}\n", self.name, self.sequence, self.quality)
    }
}

fn random_bases(rng: &mut StdRng, length: usize) -> String {
    const BASES: [char; 4] = ['A', 'C', 'G', 'T'];
    (0..length).map(|_| BASES[rng.gen_range(0..4)]).collect()
}

/// Generate single-end reads named `read{i}`
pub fn generate_reads(count: usize, length: usize) -> Vec<TestRead> {
    let mut rng = StdRng::seed_from_u64(42); // Deterministic for tests
    (0..count)
        .map(|i| TestRead::new(format!("read{}", i), random_bases(&mut rng, length)))
        .collect()
}

/// Generate mate pairs named `frag{i}/1` and `frag{i}/2`.
///
/// Mate lengths differ per pair and between the two files so the files
/// have unrelated byte layouts.
pub fn generate_pairs(count: usize, length: usize) -> Vec<(TestRead, TestRead)> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..count)
        .map(|i| {
            let len1 = length + i % 7;
            let len2 = (length / 2).max(1) + i % 13;
            (
                TestRead::new(format!("frag{}/1", i), random_bases(&mut rng, len1)),
                TestRead::new(format!("frag{}/2", i), random_bases(&mut rng, len2)),
            )
        })
        .collect()
}

pub fn write_fastq(path: &Path, reads: &[TestRead]) -> Result<()> {
    let text: String = reads.iter().map(TestRead::to_fastq).collect();
    std::fs::write(path, text)?;
    Ok(())
}

/// Write `reads_1.fq` and `reads_2.fq` with `count` pairs into `dir`
pub fn write_paired_fastq(dir: &Path, count: usize, length: usize) -> Result<(PathBuf, PathBuf)> {
    let (first, second): (Vec<_>, Vec<_>) = generate_pairs(count, length).into_iter().unzip();
    let read1 = dir.join("reads_1.fq");
    let read2 = dir.join("reads_2.fq");
    write_fastq(&read1, &first)?;
    write_fastq(&read2, &second)?;
    Ok((read1, read2))
}

/// Write `reads.fq` with `count` single-end reads into `dir`
pub fn write_single_fastq(dir: &Path, count: usize, length: usize) -> Result<PathBuf> {
    let path = dir.join("reads.fq");
    write_fastq(&path, &generate_reads(count, length))?;
    Ok(path)
}

/// Read names in a FASTQ file, in order
pub fn read_names(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)?;
    Ok(text
        .lines()
        .step_by(4)
        .filter_map(|l| l.strip_prefix('@'))
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_is_deterministic() {
        assert_eq!(generate_reads(5, 20), generate_reads(5, 20));
        assert_eq!(generate_pairs(5, 20), generate_pairs(5, 20));
    }

    #[test]
    fn test_paired_files_share_names() {
        let dir = tempfile::TempDir::new().unwrap();
        let (r1, r2) = write_paired_fastq(dir.path(), 10, 30).unwrap();
        let names1 = read_names(&r1).unwrap();
        let names2 = read_names(&r2).unwrap();
        assert_eq!(names1.len(), 10);
        assert_eq!(names1[3], "frag3/1");
        assert_eq!(names2[3], "frag3/2");
        assert_ne!(
            std::fs::metadata(&r1).unwrap().len(),
            std::fs::metadata(&r2).unwrap().len()
        );
    }
}
