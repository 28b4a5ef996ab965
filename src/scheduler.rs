//! Work-unit scheduling with per-unit retries

use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use meros_core::{CancellationToken, MerosError, MerosResult, PartitionError};

/// One independently retryable piece of a run
pub trait WorkUnit: Send + Sync {
    /// Partition ordinal this unit covers
    fn id(&self) -> usize;

    /// Run one attempt (1-based) and return the published location
    fn execute(&self, attempt: u32, cancel: &CancellationToken) -> Result<PathBuf, PartitionError>;

    /// Release anything kept for a retry once the unit has finally failed
    fn discard(&self) {}
}

/// Final result of a unit after all its attempts
#[derive(Debug, Clone)]
pub struct UnitOutcome {
    pub id: usize,
    pub result: Result<PathBuf, PartitionError>,
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Runs work units, retrying each one within a budget
pub trait Scheduler: Send + Sync {
    /// Run every unit; returns one outcome per unit, sorted by id
    fn run_units(
        &self,
        units: Vec<Box<dyn WorkUnit>>,
        cancel: &CancellationToken,
    ) -> MerosResult<Vec<UnitOutcome>>;
}

pub type ProgressCallback = Arc<dyn Fn(&UnitOutcome) + Send + Sync>;

/// Scheduler backed by a dedicated rayon thread pool
pub struct PoolScheduler {
    workers: usize,
    max_attempts: u32,
    retry_delay: Duration,
    on_finish: Option<ProgressCallback>,
}

impl PoolScheduler {
    /// `workers` concurrent units; 0 uses every available core
    pub fn new(workers: usize) -> Self {
        Self {
            workers,
            max_attempts: 3,
            retry_delay: Duration::from_millis(500),
            on_finish: None,
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Called from the worker thread as each unit finishes
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_finish = Some(callback);
        self
    }

    pub fn workers(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get()
        } else {
            self.workers
        }
    }

    fn run_unit(&self, unit: &dyn WorkUnit, cancel: &CancellationToken) -> UnitOutcome {
        let started = Instant::now();
        let id = unit.id();
        let mut attempts = 0;

        let result = loop {
            if cancel.is_cancelled() {
                break Err(PartitionError::Cancelled { partition: id });
            }
            attempts += 1;
            match unit.execute(attempts, cancel) {
                Ok(path) => break Ok(path),
                Err(e) if !e.is_retryable() || attempts >= self.max_attempts => break Err(e),
                Err(e) => {
                    warn!(
                        "{} (attempt {}/{}), retrying",
                        e, attempts, self.max_attempts
                    );
                    sleep_unless_cancelled(self.retry_delay, cancel);
                }
            }
        };

        if result.is_err() {
            unit.discard();
        }
        UnitOutcome {
            id,
            result,
            attempts,
            elapsed: started.elapsed(),
        }
    }
}

impl Scheduler for PoolScheduler {
    fn run_units(
        &self,
        units: Vec<Box<dyn WorkUnit>>,
        cancel: &CancellationToken,
    ) -> MerosResult<Vec<UnitOutcome>> {
        let workers = self.workers();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("meros-worker-{}", i))
            .build()
            .map_err(|e| MerosError::Other(format!("Failed to build worker pool: {}", e)))?;
        debug!("Running {} unit(s) on {} worker(s)", units.len(), workers);

        let mut outcomes: Vec<UnitOutcome> = pool.install(|| {
            units
                .par_iter()
                .with_max_len(1)
                .map(|unit| {
                    let outcome = self.run_unit(unit.as_ref(), cancel);
                    if let Some(callback) = &self.on_finish {
                        callback(&outcome);
                    }
                    outcome
                })
                .collect()
        });
        outcomes.sort_by_key(|o| o.id);
        Ok(outcomes)
    }
}

fn sleep_unless_cancelled(delay: Duration, cancel: &CancellationToken) {
    let step = Duration::from_millis(10);
    let deadline = Instant::now() + delay;
    while !cancel.is_cancelled() {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep(step.min(deadline - now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meros_core::Stage;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

    /// Fails its first `failures` attempts
    struct CountingUnit {
        id: usize,
        failures: u32,
        calls: AtomicU32,
        discarded: AtomicU32,
    }

    impl CountingUnit {
        fn new(id: usize, failures: u32) -> Self {
            Self {
                id,
                failures,
                calls: AtomicU32::new(0),
                discarded: AtomicU32::new(0),
            }
        }
    }

    impl WorkUnit for Arc<CountingUnit> {
        fn id(&self) -> usize {
            self.id
        }

        fn execute(&self, attempt: u32, _cancel: &CancellationToken) -> Result<PathBuf, PartitionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if attempt <= self.failures {
                return Err(PartitionError::AlignmentStage {
                    partition: self.id,
                    stage: Stage::Single,
                    exit_status: Some(1),
                    detail: format!("attempt {}", attempt),
                });
            }
            Ok(PathBuf::from(format!("/shared/{}.sam", self.id)))
        }

        fn discard(&self) {
            self.discarded.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn scheduler() -> PoolScheduler {
        PoolScheduler::new(2)
            .with_max_attempts(3)
            .with_retry_delay(Duration::from_millis(1))
    }

    #[test]
    fn test_retries_until_success() {
        let unit = Arc::new(CountingUnit::new(0, 2));
        let outcomes = scheduler()
            .run_units(vec![Box::new(unit.clone())], &CancellationToken::new())
            .unwrap();

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].attempts, 3);
        assert_eq!(outcomes[0].result, Ok(PathBuf::from("/shared/0.sam")));
        assert_eq!(unit.discarded.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_budget_exhausted() {
        let unit = Arc::new(CountingUnit::new(5, 10));
        let outcomes = scheduler()
            .run_units(vec![Box::new(unit.clone())], &CancellationToken::new())
            .unwrap();

        assert_eq!(outcomes[0].attempts, 3);
        assert_eq!(unit.calls.load(Ordering::SeqCst), 3);
        assert_eq!(unit.discarded.load(Ordering::SeqCst), 1);
        assert!(matches!(
            outcomes[0].result,
            Err(PartitionError::AlignmentStage { partition: 5, .. })
        ));
    }

    #[test]
    fn test_outcomes_sorted_and_progress_reported() {
        let finished = Arc::new(Mutex::new(Vec::new()));
        let sink = finished.clone();
        let scheduler = scheduler().with_progress(Arc::new(move |o: &UnitOutcome| {
            sink.lock().push(o.id);
        }));

        let units: Vec<Box<dyn WorkUnit>> = (0..6)
            .rev()
            .map(|id| Box::new(Arc::new(CountingUnit::new(id, 0))) as Box<dyn WorkUnit>)
            .collect();
        let outcomes = scheduler.run_units(units, &CancellationToken::new()).unwrap();

        let ids: Vec<usize> = outcomes.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4, 5]);
        let mut seen = finished.lock().clone();
        seen.sort();
        assert_eq!(seen, ids);
    }

    #[test]
    fn test_cancelled_units_never_execute() {
        let unit = Arc::new(CountingUnit::new(0, 0));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcomes = scheduler()
            .run_units(vec![Box::new(unit.clone())], &cancel)
            .unwrap();
        assert_eq!(outcomes[0].attempts, 0);
        assert_eq!(outcomes[0].result, Err(PartitionError::Cancelled { partition: 0 }));
        assert_eq!(unit.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cancelled_error_is_not_retried() {
        struct CancelledUnit(AtomicUsize);
        impl WorkUnit for CancelledUnit {
            fn id(&self) -> usize {
                7
            }
            fn execute(&self, _: u32, _: &CancellationToken) -> Result<PathBuf, PartitionError> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Err(PartitionError::Cancelled { partition: 7 })
            }
        }

        let outcomes = scheduler()
            .run_units(
                vec![Box::new(CancelledUnit(AtomicUsize::new(0)))],
                &CancellationToken::new(),
            )
            .unwrap();
        assert_eq!(outcomes[0].attempts, 1);
    }

    #[test]
    fn test_zero_workers_uses_all_cores() {
        assert_eq!(PoolScheduler::new(0).workers(), num_cpus::get());
        assert_eq!(PoolScheduler::new(3).workers(), 3);
    }
}
