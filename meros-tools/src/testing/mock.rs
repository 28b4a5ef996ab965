//! Mock aligner for tests
//!
//! Writes plausible output files without running BWA and records every
//! invocation. Rules select per-stage or per-partition misbehavior.

use anyhow::{bail, Result};
use parking_lot::Mutex;
use std::fs;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use meros_core::{CancellationToken, Stage};

use crate::traits::Aligner;
use crate::types::{InvocationMode, StageInvocation, StageStatus};

/// What a matched invocation does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockBehavior {
    /// Write the expected output and succeed
    Succeed,
    /// Write a partial output, then exit with this code
    Fail(i32),
    /// Exit 0 without creating the output file
    NoOutput,
    /// Write a partial output and block until cancelled
    WaitForCancel,
    /// The tool cannot be started
    SpawnError,
}

/// Behavior applied to invocations matching a stage and/or partition
#[derive(Debug, Clone)]
pub struct MockRule {
    stage: Option<Stage>,
    partition: Option<usize>,
    /// Matches left before the rule is spent; `None` never runs out
    remaining: Option<usize>,
    behavior: MockBehavior,
}

impl MockRule {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            stage: None,
            partition: None,
            remaining: None,
            behavior,
        }
    }

    pub fn at_stage(mut self, stage: Stage) -> Self {
        self.stage = Some(stage);
        self
    }

    pub fn for_partition(mut self, partition: usize) -> Self {
        self.partition = Some(partition);
        self
    }

    /// Apply only to the first `n` matching invocations
    pub fn times(mut self, n: usize) -> Self {
        self.remaining = Some(n);
        self
    }

    fn matches(&self, invocation: &StageInvocation) -> bool {
        self.remaining != Some(0)
            && self.stage.map_or(true, |s| s == invocation.stage)
            && self.partition.map_or(true, |p| p == invocation.partition)
    }
}

/// Aligner stand-in driven by [`MockRule`]s
pub struct MockAligner {
    rules: Mutex<Vec<MockRule>>,
    invocations: Mutex<Vec<StageInvocation>>,
    cancel_timeout: Duration,
}

impl Default for MockAligner {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAligner {
    pub fn new() -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
            invocations: Mutex::new(Vec::new()),
            cancel_timeout: Duration::from_secs(10),
        }
    }

    /// Add a rule; earlier rules take precedence
    pub fn with_rule(self, rule: MockRule) -> Self {
        self.rules.lock().push(rule);
        self
    }

    /// Every invocation seen so far, in call order
    pub fn invocations(&self) -> Vec<StageInvocation> {
        self.invocations.lock().clone()
    }

    pub fn invocations_for(&self, partition: usize) -> Vec<StageInvocation> {
        self.invocations
            .lock()
            .iter()
            .filter(|i| i.partition == partition)
            .cloned()
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.invocations.lock().len()
    }

    fn behavior_for(&self, invocation: &StageInvocation) -> MockBehavior {
        let mut rules = self.rules.lock();
        match rules.iter_mut().find(|r| r.matches(invocation)) {
            Some(rule) => {
                if let Some(n) = rule.remaining.as_mut() {
                    *n -= 1;
                }
                rule.behavior
            }
            None => MockBehavior::Succeed,
        }
    }

    fn write_output(invocation: &StageInvocation) -> Result<()> {
        let content = match invocation.mode {
            InvocationMode::Index => format!(
                "SAI\tmock\t{}\n",
                invocation.read_file1.display()
            ),
            InvocationMode::Single | InvocationMode::Merge => {
                let mut sam = String::from("@HD\tVN:1.6\tSO:unsorted\n@PG\tID:mock\tPN:mock\n");
                for line in fastq_names(&invocation.read_file1)? {
                    sam.push_str(&format!("{}\t4\t*\t0\t0\t*\t*\t0\t0\t*\t*\n", line));
                }
                sam
            }
        };
        fs::write(&invocation.output_file, content)?;
        Ok(())
    }
}

/// Read names of a FASTQ file without the `@` and mate suffix
fn fastq_names(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)?;
    Ok(text
        .lines()
        .step_by(4)
        .filter_map(|l| l.strip_prefix('@'))
        .map(|n| {
            let id = n.split_whitespace().next().unwrap_or(n);
            id.strip_suffix("/1")
                .or_else(|| id.strip_suffix("/2"))
                .unwrap_or(id)
                .to_string()
        })
        .collect())
}

impl Aligner for MockAligner {
    fn run_stage(
        &self,
        invocation: &StageInvocation,
        cancel: &CancellationToken,
    ) -> Result<StageStatus> {
        self.invocations.lock().push(invocation.clone());
        if cancel.is_cancelled() {
            return Ok(StageStatus::Cancelled);
        }

        // Inputs a real tool would refuse to run without
        let mut inputs = vec![&invocation.read_file1];
        inputs.extend(invocation.read_file2.iter());
        inputs.extend(invocation.index_artifacts.iter());
        if let Some(missing) = inputs.into_iter().find(|p| !p.is_file()) {
            return Ok(StageStatus::Failed {
                exit_status: Some(1),
                stderr: format!("[E::main] fail to open file '{}'", missing.display()),
            });
        }

        match self.behavior_for(invocation) {
            MockBehavior::Succeed => {
                Self::write_output(invocation)?;
                Ok(StageStatus::Success)
            }
            MockBehavior::Fail(code) => {
                fs::write(&invocation.output_file, b"@HD\tVN:1.6\n")?;
                Ok(StageStatus::Failed {
                    exit_status: Some(code),
                    stderr: format!("mock failure at stage {}", invocation.stage),
                })
            }
            MockBehavior::NoOutput => Ok(StageStatus::Success),
            MockBehavior::WaitForCancel => {
                fs::write(&invocation.output_file, b"@HD\tVN:1.6\n")?;
                let started = Instant::now();
                while !cancel.is_cancelled() {
                    if started.elapsed() > self.cancel_timeout {
                        bail!("mock aligner was never cancelled");
                    }
                    thread::sleep(Duration::from_millis(5));
                }
                let _ = fs::remove_file(&invocation.output_file);
                Ok(StageStatus::Cancelled)
            }
            MockBehavior::SpawnError => bail!("Failed to start mock-bwa: No such file or directory"),
        }
    }

    fn version(&self) -> Result<String> {
        Ok("mock-0.1.0".to_string())
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn invocation(dir: &Path, partition: usize, stage: Stage) -> StageInvocation {
        let reads = dir.join(format!("p{}_1.fastq", partition));
        fs::write(&reads, "@frag1/1\nACGT\n+\nIIII\n@frag2/1\nACGT\n+\nIIII\n").unwrap();
        StageInvocation {
            partition,
            stage,
            mode: if stage == Stage::IndexRead1 {
                InvocationMode::Index
            } else {
                InvocationMode::Single
            },
            read_file1: reads,
            read_file2: None,
            index_artifacts: Vec::new(),
            output_file: dir.join(format!("p{}.out", partition)),
        }
    }

    #[test]
    fn test_default_writes_sam_per_read() {
        let dir = TempDir::new().unwrap();
        let aligner = MockAligner::new();
        let inv = invocation(dir.path(), 0, Stage::Single);

        let status = aligner.run_stage(&inv, &CancellationToken::new()).unwrap();
        assert_eq!(status, StageStatus::Success);

        let sam = fs::read_to_string(&inv.output_file).unwrap();
        assert!(sam.starts_with("@HD"));
        assert!(sam.contains("frag1\t4\t*"));
        assert!(sam.contains("frag2\t4\t*"));
        assert_eq!(aligner.call_count(), 1);
    }

    #[test]
    fn test_rules_match_partition_and_run_out() {
        let dir = TempDir::new().unwrap();
        let aligner = MockAligner::new()
            .with_rule(MockRule::new(MockBehavior::Fail(2)).for_partition(1).times(1));
        let cancel = CancellationToken::new();

        let other = invocation(dir.path(), 0, Stage::Single);
        assert!(aligner.run_stage(&other, &cancel).unwrap().is_success());

        let target = invocation(dir.path(), 1, Stage::Single);
        assert_eq!(
            aligner.run_stage(&target, &cancel).unwrap(),
            StageStatus::Failed {
                exit_status: Some(2),
                stderr: "mock failure at stage single (0)".to_string(),
            }
        );
        assert!(aligner.run_stage(&target, &cancel).unwrap().is_success());
        assert_eq!(aligner.invocations_for(1).len(), 2);
    }

    #[test]
    fn test_missing_input_fails_like_a_tool() {
        let dir = TempDir::new().unwrap();
        let aligner = MockAligner::new();
        let mut inv = invocation(dir.path(), 0, Stage::Merge);
        inv.index_artifacts = vec![PathBuf::from("/nonexistent/r1.sai")];

        match aligner.run_stage(&inv, &CancellationToken::new()).unwrap() {
            StageStatus::Failed { exit_status, stderr } => {
                assert_eq!(exit_status, Some(1));
                assert!(stderr.contains("r1.sai"));
            }
            other => panic!("Expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_wait_for_cancel() {
        let dir = TempDir::new().unwrap();
        let aligner = MockAligner::new().with_rule(MockRule::new(MockBehavior::WaitForCancel));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            trigger.cancel();
        });

        let inv = invocation(dir.path(), 0, Stage::Single);
        assert_eq!(aligner.run_stage(&inv, &cancel).unwrap(), StageStatus::Cancelled);
        handle.join().unwrap();
        assert!(!inv.output_file.exists());
    }
}
