//! Run driver: partition the inputs, schedule one unit per partition and
//! collect the per-partition results.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};

use meros_bio::ReadPartitioner;
use meros_core::{
    AlignmentJobContext, CancellationToken, Config, MerosError, MerosResult, ReadInputs,
    ReadPartition, RunIdentity, TaskResult, TaskStatus,
};
use meros_storage::{MountedStorage, SharedStorage};
use meros_tools::{Aligner, BwaAligner};

use crate::publish::ResultPublisher;
use crate::scheduler::{PoolScheduler, ProgressCallback, Scheduler, WorkUnit};
use crate::unit::PartitionUnit;

/// Outcome of a run in which every partition was published
#[derive(Debug, Clone)]
pub struct RunReport {
    pub context: AlignmentJobContext,
    pub partitions: Vec<ReadPartition>,
    /// One result per partition, by ordinal
    pub results: Vec<TaskResult>,
    pub published_bytes: u64,
    pub elapsed: Duration,
}

impl RunReport {
    /// Published SAM files sorted by partition ordinal
    pub fn published_paths(&self) -> Vec<PathBuf> {
        self.results
            .iter()
            .filter_map(|r| r.published_path.clone())
            .collect()
    }

    pub fn total_records(&self) -> u64 {
        self.partitions.iter().map(ReadPartition::record_count).sum()
    }

    /// Attempts beyond the first, summed over partitions
    pub fn retries(&self) -> u32 {
        self.results.iter().map(|r| r.attempts.saturating_sub(1)).sum()
    }
}

/// Whether two directories resolve to the same place
fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

pub struct Orchestrator {
    ctx: Arc<AlignmentJobContext>,
    aligner: Arc<dyn Aligner>,
    storage: Arc<dyn SharedStorage>,
    scheduler: Box<dyn Scheduler>,
    partitions: usize,
    verify_mates: bool,
    cancel: CancellationToken,
}

impl Orchestrator {
    pub fn new(
        ctx: AlignmentJobContext,
        aligner: Arc<dyn Aligner>,
        storage: Arc<dyn SharedStorage>,
    ) -> Self {
        Self {
            ctx: Arc::new(ctx),
            aligner,
            storage,
            scheduler: Box::new(PoolScheduler::new(0)),
            partitions: num_cpus::get(),
            verify_mates: true,
            cancel: CancellationToken::new(),
        }
    }

    /// Orchestrator running `bwa` on a mounted shared file system, as configured
    pub fn from_config(
        config: &Config,
        paired: bool,
        progress: Option<ProgressCallback>,
    ) -> MerosResult<Self> {
        config.validate()?;

        let identity = match &config.job.app_id {
            Some(id) => RunIdentity::new(&config.job.app_name, id),
            None => RunIdentity::generated(&config.job.app_name),
        };
        let output_dir = config
            .job
            .output_dir
            .clone()
            .ok_or_else(|| MerosError::Configuration("job.output_dir is required".to_string()))?;
        let ctx = AlignmentJobContext::new(
            identity,
            config.tmp_dir(),
            config.aligner.algorithm,
            paired,
            output_dir,
        );

        let aligner = BwaAligner::from_config(&config.aligner)
            .map_err(|e| MerosError::Configuration(format!("{:#}", e)))?;
        if !aligner.is_available() {
            return Err(MerosError::Tool(format!(
                "aligner binary not found: {}",
                aligner.binary().display()
            )));
        }

        let mut scheduler = PoolScheduler::new(config.runtime.workers)
            .with_max_attempts(config.runtime.max_attempts)
            .with_retry_delay(Duration::from_millis(config.runtime.retry_delay_ms));
        if let Some(callback) = progress {
            scheduler = scheduler.with_progress(callback);
        }
        let partitions = match config.job.partitions {
            0 => scheduler.workers(),
            n => n,
        };

        Ok(Self::new(ctx, Arc::new(aligner), Arc::new(MountedStorage::new()))
            .with_scheduler(Box::new(scheduler))
            .with_partitions(partitions))
    }

    pub fn with_scheduler(mut self, scheduler: Box<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Requested partition count; fewer are produced when there are fewer records
    pub fn with_partitions(mut self, partitions: usize) -> Self {
        self.partitions = partitions;
        self
    }

    pub fn with_mate_check(mut self, enabled: bool) -> Self {
        self.verify_mates = enabled;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn context(&self) -> &AlignmentJobContext {
        &self.ctx
    }

    /// Token that cancels this orchestrator's runs
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Partition `inputs` without aligning anything
    pub fn plan(&self, inputs: &ReadInputs) -> MerosResult<Vec<ReadPartition>> {
        if self.ctx.paired != inputs.is_paired() {
            return Err(MerosError::Configuration(format!(
                "job is configured as {} but {} read file(s) were given",
                if self.ctx.paired { "paired" } else { "unpaired" },
                if inputs.is_paired() { 2 } else { 1 }
            )));
        }
        ReadPartitioner::new(self.partitions)
            .with_mate_check(self.verify_mates)
            .partition(inputs)
    }

    /// Align every partition and publish the results.
    ///
    /// Fails with [`MerosError::PartitionFailure`] naming every partition that
    /// did not publish, or [`MerosError::Cancelled`]; never returns a partial
    /// report.
    pub fn run(&self, inputs: &ReadInputs) -> MerosResult<RunReport> {
        let started = Instant::now();
        info!(
            "Starting {} run {}-{} ({} alignment)",
            if self.ctx.paired { "paired" } else { "single-end" },
            self.ctx.app_name(),
            self.ctx.app_id(),
            self.ctx.algorithm
        );

        let partitions = self.plan(inputs)?;

        std::fs::create_dir_all(&self.ctx.tmp_dir)?;
        self.storage.ensure_dir(&self.ctx.output_dir)?;
        if same_dir(&self.ctx.tmp_dir, &self.ctx.output_dir) {
            return Err(MerosError::Configuration(format!(
                "scratch directory and output directory must differ: {}",
                self.ctx.output_dir.display()
            )));
        }

        let publisher = Arc::new(ResultPublisher::new(self.storage.clone()));
        let units: Vec<Box<dyn WorkUnit>> = partitions
            .iter()
            .map(|p| {
                Box::new(PartitionUnit::new(
                    p.clone(),
                    self.ctx.clone(),
                    self.aligner.clone(),
                    publisher.clone(),
                )) as Box<dyn WorkUnit>
            })
            .collect();

        let outcomes = self.scheduler.run_units(units, &self.cancel)?;

        let results: Vec<TaskResult> = partitions
            .iter()
            .map(|p| {
                let local_output = self.ctx.local_output_path(p.ordinal);
                match outcomes.iter().find(|o| o.id == p.ordinal) {
                    Some(o) => TaskResult {
                        partition: p.ordinal,
                        local_output,
                        published_path: o.result.as_ref().ok().cloned(),
                        status: match &o.result {
                            Ok(_) => TaskStatus::Succeeded,
                            Err(e) => TaskStatus::Failed(e.clone()),
                        },
                        attempts: o.attempts,
                        elapsed: o.elapsed,
                    },
                    None => TaskResult {
                        partition: p.ordinal,
                        local_output,
                        published_path: None,
                        status: TaskStatus::Failed(meros_core::PartitionError::Cancelled {
                            partition: p.ordinal,
                        }),
                        attempts: 0,
                        elapsed: Duration::ZERO,
                    },
                }
            })
            .collect();

        if self.cancel.is_cancelled() {
            info!("Run {}-{} cancelled", self.ctx.app_name(), self.ctx.app_id());
            return Err(MerosError::Cancelled);
        }

        let failed: Vec<usize> = results
            .iter()
            .filter_map(|r| {
                let err = r.error()?;
                error!("{} after {} attempt(s)", err, r.attempts);
                Some(r.partition)
            })
            .collect();
        if !failed.is_empty() {
            return Err(MerosError::PartitionFailure {
                partition_ids: failed,
            });
        }

        let mut published_bytes = 0;
        for path in results.iter().filter_map(|r| r.published_path.as_ref()) {
            published_bytes += self.storage.size(path)?.unwrap_or(0);
        }

        let report = RunReport {
            context: self.ctx.as_ref().clone(),
            partitions,
            results,
            published_bytes,
            elapsed: started.elapsed(),
        };
        info!(
            "Published {} partition(s), {} records, {} bytes in {:.1}s",
            report.results.len(),
            report.total_records(),
            report.published_bytes,
            report.elapsed.as_secs_f64()
        );
        Ok(report)
    }
}
