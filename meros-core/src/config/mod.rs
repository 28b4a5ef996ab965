//! Configuration types for meros

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::types::Algorithm;
use crate::MerosError;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub job: JobConfig,
    #[serde(default)]
    pub aligner: AlignerConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Application name, first component of every output file name
    #[serde(default = "default_app_name")]
    pub app_name: String,
    /// Application id; generated per run when absent
    #[serde(default)]
    pub app_id: Option<String>,
    /// Shared directory receiving the per-partition SAM files
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    /// Requested partition count (0 = one per worker)
    #[serde(default)]
    pub partitions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignerConfig {
    #[serde(default = "default_binary")]
    pub binary: PathBuf,
    /// Prefix of the BWA reference index (`bwa index` output)
    #[serde(default)]
    pub reference: Option<PathBuf>,
    #[serde(default)]
    pub algorithm: Algorithm,
    /// Threads handed to each aligner invocation (`-t`)
    #[serde(default = "default_aligner_threads")]
    pub threads: usize,
    /// Extra arguments for the primary subcommand (`mem`, `aln`, `bwasw`)
    #[serde(default)]
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Concurrent partitions (0 = all available cores)
    #[serde(default)]
    pub workers: usize,
    /// Attempts per partition before it counts as failed
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Milliseconds to wait between attempts of one partition
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Preferred scratch directory (may carry a `file:` prefix)
    #[serde(default)]
    pub local_dir: Option<String>,
    /// Scratch directory used when `local_dir` is unset or unusable
    #[serde(default)]
    pub fallback_tmp_dir: Option<String>,
}

// Default value functions
fn default_app_name() -> String { "meros".to_string() }
fn default_binary() -> PathBuf { PathBuf::from("bwa") }
fn default_aligner_threads() -> usize { 1 }
fn default_max_attempts() -> u32 { 3 }
fn default_retry_delay_ms() -> u64 { 500 }

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            app_id: None,
            output_dir: None,
            partitions: 0,
        }
    }
}

impl Default for AlignerConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            reference: None,
            algorithm: Algorithm::default(),
            threads: default_aligner_threads(),
            extra_args: Vec::new(),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            local_dir: None,
            fallback_tmp_dir: None,
        }
    }
}

impl Config {
    /// Scratch directory for this configuration, see [`crate::resolve_tmp_dir`]
    pub fn tmp_dir(&self) -> PathBuf {
        crate::system::resolve_tmp_dir(&[
            self.runtime.local_dir.as_deref(),
            self.runtime.fallback_tmp_dir.as_deref(),
        ])
    }

    /// Check the settings a run cannot start without
    pub fn validate(&self) -> Result<(), MerosError> {
        if self.job.app_name.trim().is_empty() {
            return Err(MerosError::Configuration("job.app_name must not be empty".to_string()));
        }
        if self.job.app_name.contains('/') {
            return Err(MerosError::Configuration(format!(
                "job.app_name must not contain '/': {}",
                self.job.app_name
            )));
        }
        if let Some(id) = &self.job.app_id {
            if id.trim().is_empty() || id.contains('/') {
                return Err(MerosError::Configuration(format!(
                    "job.app_id must be non-empty and must not contain '/': {:?}",
                    id
                )));
            }
        }
        if self.job.output_dir.is_none() {
            return Err(MerosError::Configuration("job.output_dir is required".to_string()));
        }
        if self.aligner.reference.is_none() {
            return Err(MerosError::Configuration("aligner.reference is required".to_string()));
        }
        if self.runtime.max_attempts == 0 {
            return Err(MerosError::Configuration(
                "runtime.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn default_config() -> Config {
    Config::default()
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, MerosError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)
        .map_err(|e| MerosError::Configuration(format!("Failed to parse config: {}", e)))?;
    Ok(config)
}

pub fn save_config<P: AsRef<Path>>(path: P, config: &Config) -> Result<(), MerosError> {
    let contents = toml::to_string_pretty(config)
        .map_err(|e| MerosError::Configuration(format!("Failed to serialize config: {}", e)))?;
    std::fs::write(path, contents)?;
    Ok(())
}
