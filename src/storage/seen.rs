//! Durable seen-set backing deduplication
//!
//! The seen-set is the monotonically-growing record of availability ids that
//! have already been announced. Only the poll engine requests additions,
//! after a successful notification; the set never shrinks except by deleting
//! the file out-of-band.
//!
//! Persistence discipline is persist-then-proceed: `mark_seen` writes the
//! file before returning success, so the only window for a duplicate
//! notification is a crash between dispatch and persistence. When a write
//! fails the in-memory set stays authoritative (already-marked ids are never
//! re-notified) and the store stays dirty until a later write succeeds.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{read_json, write_json, StorageError};
use crate::models::{AvailabilityId, Snapshot};

/// On-disk layout: `{"seen": [...]}`
#[derive(Debug, Default, Serialize, Deserialize)]
struct SeenFile {
    seen: BTreeSet<AvailabilityId>,
}

/// The dedup store
#[derive(Debug)]
pub struct SeenStore {
    path: PathBuf,
    seen: BTreeSet<AvailabilityId>,
    dirty: bool,
}

impl SeenStore {
    /// Open the store, loading any previously persisted set.
    ///
    /// A corrupt file is an error rather than an empty set: silently
    /// starting over would re-announce everything ever seen.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let seen = read_json::<SeenFile>(&path)?.unwrap_or_default().seen;

        if !seen.is_empty() {
            tracing::info!(count = seen.len(), path = %path.display(), "loaded seen-set");
        }

        Ok(Self {
            path,
            seen,
            dirty: false,
        })
    }

    /// The ids already notified
    pub fn previously_seen(&self) -> &BTreeSet<AvailabilityId> {
        &self.seen
    }

    /// Check a single id
    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// Number of ids held
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Ids in `snapshot` not yet seen
    pub fn new_ids(&self, snapshot: &Snapshot) -> Snapshot {
        snapshot.difference(&self.seen).cloned().collect()
    }

    /// Add ids to the set and persist. Additive only.
    ///
    /// On persistence failure the ids are still held in memory (and will not
    /// be re-notified); the store is left dirty for a later [`flush`].
    ///
    /// [`flush`]: SeenStore::flush
    pub fn mark_seen(&mut self, ids: &Snapshot) -> Result<(), StorageError> {
        if ids.is_empty() && !self.dirty {
            return Ok(());
        }

        self.seen.extend(ids.iter().cloned());
        self.dirty = true;
        self.flush()
    }

    /// Retry persisting the current in-memory set
    pub fn flush(&mut self) -> Result<(), StorageError> {
        let file = SeenFile {
            seen: self.seen.clone(),
        };
        write_json(&self.path, &file)?;
        self.dirty = false;
        Ok(())
    }

    /// Whether the in-memory set is ahead of the file
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}
