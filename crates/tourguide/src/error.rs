use thiserror::Error;

use crate::storage::StorageError;

pub type Result<T> = std::result::Result<T, TourError>;

#[derive(Debug, Error)]
pub enum TourError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("step id already registered: {id}")]
    DuplicateStep { id: String },

    #[error("config validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[cfg(feature = "logging")]
    #[error("failed to install tracing subscriber: {0}")]
    Logging(String),
}

impl TourError {
    #[must_use]
    pub fn duplicate(id: impl Into<String>) -> Self {
        Self::DuplicateStep { id: id.into() }
    }
}
