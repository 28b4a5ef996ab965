use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::MerosError;

/// BWA algorithm used for every partition of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// BWA-MEM, one invocation per partition
    #[default]
    Mem,
    /// BWA-backtrack: `aln` per read file, then `samse`/`sampe`
    Aln,
    /// BWA-SW, one invocation per partition
    Bwasw,
}

impl Algorithm {
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Mem => "mem",
            Algorithm::Aln => "aln",
            Algorithm::Bwasw => "bwasw",
        }
    }

    /// Index-then-merge algorithms run several aligner stages per partition
    pub fn is_multi_stage(&self) -> bool {
        matches!(self, Algorithm::Aln)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Algorithm {
    type Err = MerosError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mem" => Ok(Algorithm::Mem),
            "aln" | "backtrack" => Ok(Algorithm::Aln),
            "bwasw" | "sw" => Ok(Algorithm::Bwasw),
            _ => Err(MerosError::Configuration(format!("Unknown algorithm: {}", s))),
        }
    }
}

/// One step of a partition's alignment.
///
/// Ordinals are fixed so that an error report names the same stage
/// regardless of pairing: the merge step is always stage 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    /// The only stage of a single-stage algorithm
    Single,
    IndexRead1,
    IndexRead2,
    Merge,
}

impl Stage {
    pub fn ordinal(&self) -> u8 {
        match self {
            Stage::Single | Stage::IndexRead1 => 0,
            Stage::IndexRead2 => 1,
            Stage::Merge => 2,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Single => "single",
            Stage::IndexRead1 => "index-read1",
            Stage::IndexRead2 => "index-read2",
            Stage::Merge => "merge",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.ordinal())
    }
}
