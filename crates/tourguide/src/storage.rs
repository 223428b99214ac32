#![forbid(unsafe_code)]

//! String-keyed storage backends for tour progress.
//!
//! [`StorageBackend`] is the local-storage analog the persistence adapter
//! writes through: flat string keys, string values, no transactions. Two
//! backends ship with the crate:
//!
//! - [`MemoryStorage`]: a map in memory. Used by tests and by hosts that
//!   bridge to their own storage (e.g. `window.localStorage` under wasm).
//! - [`FileStorage`]: a single JSON object on disk, rewritten atomically on
//!   every mutation.
//!
//! # File Format
//!
//! ```json
//! {
//!   "tour-progress": "{\"stepIndex\":2}",
//!   "tour-completed": "true"
//! }
//! ```
//!
//! # Atomic Writes
//!
//! Writes use a temp-file-then-rename pattern so a crash mid-write leaves
//! either the old or the new contents, never a torn file.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use ahash::AHashMap;
use thiserror::Error;

pub type StorageResult<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode storage file: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

/// A flat string key/value store.
pub trait StorageBackend {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: &str) -> StorageResult<()>;

    /// Delete `key`. Removing a missing key is not an error.
    fn remove(&mut self, key: &str) -> StorageResult<()>;
}

impl<S: StorageBackend + ?Sized> StorageBackend for &mut S {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> StorageResult<()> {
        (**self).remove(key)
    }
}

/// In-memory backend.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: AHashMap<String, String>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl StorageBackend for MemoryStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> StorageResult<()> {
        self.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StorageResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// JSON-file backend.
///
/// The file is read once on [`open`](Self::open); every mutation rewrites it.
/// The parent directory must already exist. A mutation whose write fails is
/// rolled back, so reads always match the last successful write.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStorage {
    /// Open (or lazily create) the storage file at `path`.
    ///
    /// - **Missing file** starts empty (not an error).
    /// - **Corrupted file** starts empty and is overwritten on the next write.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(entries) => entries,
                Err(err) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %err,
                        "discarding unreadable tour storage file"
                    );
                    BTreeMap::new()
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StorageError::Io { path, source }),
        };
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> StorageResult<()> {
        let json = serde_json::to_string_pretty(&self.entries)?;
        let temp = self.path.with_extension("json.tmp");
        std::fs::write(&temp, json).map_err(|source| StorageError::Io {
            path: temp.clone(),
            source,
        })?;
        std::fs::rename(&temp, &self.path).map_err(|source| StorageError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl StorageBackend for FileStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> StorageResult<()> {
        let previous = self.entries.insert(key.to_owned(), value.to_owned());
        self.flush().inspect_err(|_| match previous {
            Some(old) => {
                self.entries.insert(key.to_owned(), old);
            }
            None => {
                self.entries.remove(key);
            }
        })
    }

    fn remove(&mut self, key: &str) -> StorageResult<()> {
        let Some(old) = self.entries.remove(key) else {
            return Ok(());
        };
        self.flush().inspect_err(|_| {
            self.entries.insert(key.to_owned(), old);
        })
    }
}
