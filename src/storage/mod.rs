//! Durable state for the watcher
//!
//! Three small JSON files under the configured data directory:
//!
//! - `seen.json` - the seen-set, `{"seen": [...]}` ([`seen::SeenStore`])
//! - `status.json` - the last poll status snapshot ([`status::StatusStore`])
//! - `subscribers.json` - registered chat ids ([`subscribers::SubscriberRegistry`])
//!
//! All writes go through the same atomic discipline: serialize to a temp
//! file in the target directory, then rename over the destination, so a
//! crash mid-write leaves the previous state intact.

pub mod seen;
pub mod status;
pub mod subscribers;

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

pub use seen::SeenStore;
pub use status::StatusStore;
pub use subscribers::SubscriberRegistry;

/// Errors that can occur during persistence operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O failure reading or writing a state file
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// State file exists but does not parse
    #[error("Corrupt state file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Serialization failure while writing
    #[error("Failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The configured data directory path is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

impl StorageError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Atomically write a JSON state file: temp file first, then rename
pub(crate) fn write_json<T: Serialize>(path: &Path, state: &T) -> Result<(), StorageError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;
    }

    let temp_path = path.with_extension("json.tmp");

    let file = File::create(&temp_path).map_err(|e| StorageError::io(&temp_path, e))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, state)?;

    fs::rename(&temp_path, path).map_err(|e| StorageError::io(path, e))?;

    tracing::debug!(path = %path.display(), "state file saved");
    Ok(())
}

/// Load a JSON state file, `None` if it does not exist
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
    if !path.exists() {
        return Ok(None);
    }

    let file = File::open(path).map_err(|e| StorageError::io(path, e))?;
    let reader = BufReader::new(file);
    let state = serde_json::from_reader(reader).map_err(|e| StorageError::Corrupt {
        path: path.to_path_buf(),
        source: e,
    })?;

    tracing::debug!(path = %path.display(), "state file loaded");
    Ok(Some(state))
}
