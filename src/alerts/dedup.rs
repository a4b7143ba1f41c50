// src/alerts/dedup.rs
use crate::storage::{BlobStore, StorageError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupStatus {
    New,
    AlreadyProcessed,
}

/// Idempotency gate: a persisted record means the alert was already handled.
///
/// A failing probe is an error, not `New`; guessing "new" could post twice.
pub async fn check(store: &dyn BlobStore, key: &str) -> Result<DedupStatus, StorageError> {
    if store.exists(key).await? {
        Ok(DedupStatus::AlreadyProcessed)
    } else {
        Ok(DedupStatus::New)
    }
}
