//! Moves a partition's local SAM file into shared storage

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use meros_core::{AlignmentJobContext, PartitionError};
use meros_storage::SharedStorage;

pub struct ResultPublisher {
    storage: Arc<dyn SharedStorage>,
}

impl ResultPublisher {
    pub fn new(storage: Arc<dyn SharedStorage>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &dyn SharedStorage {
        self.storage.as_ref()
    }

    /// Copy `local` to the partition's published path, verify it, then delete `local`.
    ///
    /// On error the local file is left in place so that a later attempt can
    /// publish it again without re-aligning.
    pub fn publish(
        &self,
        ctx: &AlignmentJobContext,
        ordinal: usize,
        local: &Path,
    ) -> Result<PathBuf, PartitionError> {
        let destination = ctx.published_path(ordinal);
        let failed = |reason: String| PartitionError::Publish {
            partition: ordinal,
            destination: destination.clone(),
            reason,
        };

        if destination == local {
            return Err(failed("local output is already at the published path".to_string()));
        }
        let local_len = fs::metadata(local)
            .map_err(|e| failed(format!("{}: {}", local.display(), e)))?
            .len();
        self.storage
            .copy_from_local(local, &destination)
            .map_err(|e| failed(format!("{:#}", e)))?;

        let verified = match self.storage.size(&destination) {
            Ok(Some(len)) if len == local_len => Ok(()),
            Ok(Some(len)) => Err(format!(
                "published size {} does not match local size {}",
                len, local_len
            )),
            Ok(None) => Err("file missing after copy".to_string()),
            Err(e) => Err(format!("{:#}", e)),
        };
        if let Err(reason) = verified {
            if let Err(e) = self.storage.remove(&destination) {
                warn!("Failed to remove unverified {}: {:#}", destination.display(), e);
            }
            return Err(failed(reason));
        }

        if let Err(e) = fs::remove_file(local) {
            warn!("Published {} but could not remove {}: {}", destination.display(), local.display(), e);
        }
        info!(
            "partition {}: published {} ({} bytes)",
            ordinal,
            destination.display(),
            local_len
        );
        Ok(destination)
    }
}
