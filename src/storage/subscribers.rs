//! Subscriber registry
//!
//! Durable list of Telegram chat ids that receive broadcasts. Registration
//! is idempotent; the engine only reads the current list at dispatch time.
//! The registry is a collaborator of the engine, not part of it: the
//! `/start` command handler adds entries, nothing in the poll path does.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use super::{read_json, write_json, StorageError};

/// Opaque subscriber identifier (a Telegram chat id)
pub type Subscriber = i64;

/// Durable, idempotent registry of subscribers
#[derive(Debug)]
pub struct SubscriberRegistry {
    path: PathBuf,
    chats: BTreeSet<Subscriber>,
}

impl SubscriberRegistry {
    /// Open the registry, loading any persisted subscriber list.
    ///
    /// A corrupt file starts the registry empty with a warning: losing
    /// registrations is recoverable (subscribers re-issue `/start`), and
    /// refusing to boot over it would take the watcher down.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();

        let chats = match read_json::<Vec<Subscriber>>(&path) {
            Ok(Some(list)) => list.into_iter().collect(),
            Ok(None) => BTreeSet::new(),
            Err(e) => {
                tracing::warn!(error = %e, "subscriber file unreadable, starting empty");
                BTreeSet::new()
            }
        };

        Ok(Self { path, chats })
    }

    /// Current subscribers, in stable ascending order
    pub fn list(&self) -> Vec<Subscriber> {
        self.chats.iter().copied().collect()
    }

    /// Number of subscribers
    pub fn len(&self) -> usize {
        self.chats.len()
    }

    /// Whether anyone is registered
    pub fn is_empty(&self) -> bool {
        self.chats.is_empty()
    }

    /// Register a subscriber. Idempotent; returns `true` when newly added.
    pub fn add(&mut self, chat: Subscriber) -> Result<bool, StorageError> {
        if !self.chats.insert(chat) {
            return Ok(false);
        }

        let list = self.list();
        write_json(&self.path, &list)?;
        tracing::info!(chat, total = list.len(), "subscriber registered");
        Ok(true)
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}
