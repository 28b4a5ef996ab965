//! Alignment followed by publication, as one schedulable unit per partition

use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use meros_core::{AlignmentJobContext, CancellationToken, PartitionError, ReadPartition};
use meros_tools::Aligner;

use crate::publish::ResultPublisher;
use crate::scheduler::WorkUnit;
use crate::task::AlignmentTask;

pub struct PartitionUnit {
    partition: ReadPartition,
    ctx: Arc<AlignmentJobContext>,
    aligner: Arc<dyn Aligner>,
    publisher: Arc<ResultPublisher>,
    /// Local SAM from an attempt whose publish failed
    aligned: Mutex<Option<PathBuf>>,
}

impl PartitionUnit {
    pub fn new(
        partition: ReadPartition,
        ctx: Arc<AlignmentJobContext>,
        aligner: Arc<dyn Aligner>,
        publisher: Arc<ResultPublisher>,
    ) -> Self {
        Self {
            partition,
            ctx,
            aligner,
            publisher,
            aligned: Mutex::new(None),
        }
    }

    pub fn partition(&self) -> &ReadPartition {
        &self.partition
    }

    fn align(&self, cancel: &CancellationToken) -> Result<PathBuf, PartitionError> {
        let retained = self.aligned.lock().clone();
        if let Some(local) = retained {
            if local.is_file() {
                debug!(
                    "partition {}: reusing aligned output {}",
                    self.partition.ordinal,
                    local.display()
                );
                return Ok(local);
            }
        }

        let local = AlignmentTask::new(&self.ctx, &self.partition, self.aligner.as_ref())
            .run(cancel)?;
        *self.aligned.lock() = Some(local.clone());
        Ok(local)
    }
}

impl WorkUnit for PartitionUnit {
    fn id(&self) -> usize {
        self.partition.ordinal
    }

    fn execute(&self, attempt: u32, cancel: &CancellationToken) -> Result<PathBuf, PartitionError> {
        let ordinal = self.partition.ordinal;
        info!(
            "partition {}: attempt {} ({} records, {} bytes)",
            ordinal,
            attempt,
            self.partition.record_count(),
            self.partition.byte_len()
        );

        let local = self.align(cancel)?;
        if cancel.is_cancelled() {
            self.discard();
            return Err(PartitionError::Cancelled { partition: ordinal });
        }

        let published = self.publisher.publish(&self.ctx, ordinal, &local)?;
        *self.aligned.lock() = None;
        Ok(published)
    }

    fn discard(&self) {
        if let Some(local) = self.aligned.lock().take() {
            if let Err(e) = std::fs::remove_file(&local) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to remove {}: {}", local.display(), e);
                }
            }
        }
    }
}
