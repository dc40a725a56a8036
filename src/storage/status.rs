//! Poll status snapshot persistence
//!
//! A failed status write is never fatal: the in-memory [`PollStatus`] stays
//! authoritative and the next cycle writes again.

use std::path::{Path, PathBuf};

use super::{read_json, write_json, StorageError};
use crate::models::PollStatus;

/// Reads and writes the `status.json` snapshot
#[derive(Debug, Clone)]
pub struct StatusStore {
    path: PathBuf,
}

impl StatusStore {
    /// Create a store backed by the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the persisted status, if any.
    ///
    /// A corrupt status file is recovered from silently: the status is
    /// advisory (timestamps and backoff level), so starting fresh only costs
    /// one cold-start poll at base cadence.
    pub fn load(&self) -> PollStatus {
        match read_json::<PollStatus>(&self.path) {
            Ok(Some(status)) => status,
            Ok(None) => PollStatus::default(),
            Err(e) => {
                tracing::warn!(error = %e, "status file unreadable, starting fresh");
                PollStatus::default()
            }
        }
    }

    /// Persist the status snapshot
    pub fn save(&self, status: &PollStatus) -> Result<(), StorageError> {
        write_json(&self.path, status)
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}
