#![forbid(unsafe_code)]

//! Tour progress and completion persistence.
//!
//! Two keys are kept in the backing [`StorageBackend`]:
//!
//! | key              | value             | lifetime                        |
//! |------------------|-------------------|---------------------------------|
//! | `tour-progress`  | `{"stepIndex":k}` | while a tour is in progress     |
//! | `tour-completed` | `"true"`          | permanent once a tour completes |
//!
//! Keys are not versioned. A schema change needs a new key (or a new
//! prefix) so old values never get misread.
//!
//! Writes are best-effort from the controller's point of view: a failure is
//! reported to the caller, which logs it and carries on navigating.

use serde::{Deserialize, Serialize};

use crate::storage::{StorageBackend, StorageResult};

pub const PROGRESS_KEY: &str = "tour-progress";
pub const COMPLETED_KEY: &str = "tour-completed";

/// On-storage shape of in-progress state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedProgress {
    #[serde(rename = "stepIndex")]
    pub step_index: usize,
}

/// Adapter that reads and writes tour state through a storage backend.
#[derive(Debug)]
pub struct Persistence<S> {
    storage: S,
    progress_key: String,
    completed_key: String,
}

impl<S: StorageBackend> Persistence<S> {
    /// Use the default keys.
    pub fn new(storage: S) -> Self {
        Self::with_prefix(storage, "")
    }

    /// Namespace both keys with `prefix` (e.g. `"docs:"`), so several tours
    /// can share one backend.
    pub fn with_prefix(storage: S, prefix: &str) -> Self {
        Self {
            storage,
            progress_key: format!("{prefix}{PROGRESS_KEY}"),
            completed_key: format!("{prefix}{COMPLETED_KEY}"),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    pub fn progress_key(&self) -> &str {
        &self.progress_key
    }

    pub fn completed_key(&self) -> &str {
        &self.completed_key
    }

    /// Load saved progress.
    ///
    /// A value that does not parse is deleted and reported as `None`.
    pub fn load_progress(&mut self) -> StorageResult<Option<usize>> {
        let Some(raw) = self.storage.get(&self.progress_key)? else {
            return Ok(None);
        };
        match serde_json::from_str::<PersistedProgress>(&raw) {
            Ok(progress) => Ok(Some(progress.step_index)),
            Err(err) => {
                tracing::warn!(
                    key = %self.progress_key,
                    error = %err,
                    "discarding malformed tour progress"
                );
                self.storage.remove(&self.progress_key)?;
                Ok(None)
            }
        }
    }

    pub fn save_progress(&mut self, step_index: usize) -> StorageResult<()> {
        let json = serde_json::to_string(&PersistedProgress { step_index })?;
        self.storage.set(&self.progress_key, &json)
    }

    pub fn clear_progress(&mut self) -> StorageResult<()> {
        self.storage.remove(&self.progress_key)
    }

    /// Whether the tour was ever completed. Anything but `"true"` reads as
    /// not completed.
    pub fn is_completed(&self) -> StorageResult<bool> {
        Ok(self.storage.get(&self.completed_key)?.as_deref() == Some("true"))
    }

    pub fn mark_completed(&mut self) -> StorageResult<()> {
        self.storage.set(&self.completed_key, "true")
    }

    pub fn clear_completed(&mut self) -> StorageResult<()> {
        self.storage.remove(&self.completed_key)
    }
}
