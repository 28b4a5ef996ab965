//! BWA command-line integration

use anyhow::{bail, Context, Result};
use std::collections::VecDeque;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

use meros_core::config::AlignerConfig;
use meros_core::{Algorithm, CancellationToken};

use crate::traits::Aligner;
use crate::types::{InvocationMode, StageInvocation, StageStatus};

/// Lines of stderr kept for error reports
const STDERR_TAIL_LINES: usize = 20;

/// BWA aligner integration
#[derive(Debug, Clone)]
pub struct BwaAligner {
    binary: PathBuf,
    /// Index prefix given to every subcommand
    reference: PathBuf,
    algorithm: Algorithm,
    threads: usize,
    extra_args: Vec<String>,
    poll_interval: Duration,
}

impl BwaAligner {
    pub fn new(binary: impl Into<PathBuf>, reference: impl Into<PathBuf>, algorithm: Algorithm) -> Self {
        Self {
            binary: binary.into(),
            reference: reference.into(),
            algorithm,
            threads: 1,
            extra_args: Vec::new(),
            poll_interval: Duration::from_millis(50),
        }
    }

    pub fn from_config(config: &AlignerConfig) -> Result<Self> {
        let reference = config
            .reference
            .as_ref()
            .context("aligner.reference is required")?;
        Ok(Self::new(&config.binary, reference, config.algorithm)
            .with_threads(config.threads)
            .with_extra_args(config.extra_args.clone()))
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Extra arguments for `mem`, `bwasw` or `aln`; merge steps take none
    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    /// How often a running stage checks for cancellation
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Command-line arguments for one stage, excluding the binary
    pub fn command_args(&self, invocation: &StageInvocation) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        match invocation.mode {
            InvocationMode::Single | InvocationMode::Index => {
                let subcommand = match invocation.mode {
                    InvocationMode::Index => "aln",
                    _ => self.algorithm.name(),
                };
                args.push(subcommand.into());
                args.push("-t".into());
                args.push(self.threads.to_string().into());
                args.extend(self.extra_args.iter().map(OsString::from));
                args.push(self.reference.clone().into());
                args.push(invocation.read_file1.clone().into());
                if invocation.mode == InvocationMode::Single {
                    if let Some(read2) = &invocation.read_file2 {
                        args.push(read2.clone().into());
                    }
                }
            }
            InvocationMode::Merge => {
                let paired = invocation.read_file2.is_some();
                let subcommand = if paired { "sampe" } else { "samse" };
                args.push(subcommand.into());
                args.push(self.reference.clone().into());
                args.extend(invocation.index_artifacts.iter().cloned().map(OsString::from));
                args.push(invocation.read_file1.clone().into());
                if let Some(read2) = &invocation.read_file2 {
                    args.push(read2.clone().into());
                }
            }
        }
        args
    }

    /// Run the binary with `args` as given, inheriting stdio; returns its exit code
    pub fn exec_passthrough(&self, args: &[String]) -> Result<i32> {
        let status = Command::new(&self.binary)
            .args(args)
            .status()
            .with_context(|| format!("Failed to run {}", self.binary.display()))?;
        Ok(status.code().unwrap_or(1))
    }
}

impl Aligner for BwaAligner {
    fn run_stage(
        &self,
        invocation: &StageInvocation,
        cancel: &CancellationToken,
    ) -> Result<StageStatus> {
        if cancel.is_cancelled() {
            return Ok(StageStatus::Cancelled);
        }
        if invocation.mode == InvocationMode::Merge && invocation.index_artifacts.is_empty() {
            bail!("merge stage of partition {} has no index artifacts", invocation.partition);
        }

        let args = self.command_args(invocation);
        debug!(
            "partition {} stage {}: {} {}",
            invocation.partition,
            invocation.stage,
            self.binary.display(),
            args.iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let output = File::create(&invocation.output_file).with_context(|| {
            format!("Failed to create output file {}", invocation.output_file.display())
        })?;
        let spawned = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(output))
            .stderr(Stdio::piped())
            .spawn();
        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                let _ = fs::remove_file(&invocation.output_file);
                return Err(e)
                    .with_context(|| format!("Failed to start {}", self.binary.display()));
            }
        };

        let stderr = child.stderr.take();
        let drain = thread::spawn(move || stderr.map(collect_tail).unwrap_or_default());

        let exit = loop {
            if let Some(status) = child.try_wait()? {
                break Some(status);
            }
            if cancel.is_cancelled() {
                if let Err(e) = child.kill() {
                    warn!("Failed to kill {}: {}", self.binary.display(), e);
                }
                let _ = child.wait();
                break None;
            }
            thread::sleep(self.poll_interval);
        };

        let Some(status) = exit else {
            // Descendants may still hold stderr open, so the drain thread is left behind
            let _ = fs::remove_file(&invocation.output_file);
            return Ok(StageStatus::Cancelled);
        };
        let stderr = drain.join().unwrap_or_default();

        if !status.success() {
            return Ok(StageStatus::Failed {
                exit_status: status.code(),
                stderr,
            });
        }
        if !invocation.output_file.is_file() {
            return Ok(StageStatus::Failed {
                exit_status: status.code(),
                stderr: format!("{} was not created", invocation.output_file.display()),
            });
        }
        Ok(StageStatus::Success)
    }

    fn version(&self) -> Result<String> {
        // bwa without arguments prints usage with a "Version:" line to stderr
        let output = Command::new(&self.binary)
            .output()
            .with_context(|| format!("Failed to run {}", self.binary.display()))?;
        let text = String::from_utf8_lossy(&output.stderr);
        text.lines()
            .find_map(|line| line.trim().strip_prefix("Version:"))
            .map(|v| v.trim().to_string())
            .with_context(|| format!("No version reported by {}", self.binary.display()))
    }

    fn is_available(&self) -> bool {
        self.binary.is_file() || which::which(&self.binary).is_ok()
    }

    fn name(&self) -> &str {
        "bwa"
    }
}

/// Last `STDERR_TAIL_LINES` lines of a stream, newline-joined
fn collect_tail(stream: impl Read) -> String {
    let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
    for line in BufReader::new(stream).lines().map_while(|l| l.ok()) {
        if tail.len() == STDERR_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line);
    }
    tail.into_iter().collect::<Vec<_>>().join("\n")
}
