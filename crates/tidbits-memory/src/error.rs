//! Error types for the store and its storage adapters.

use thiserror::Error;

/// Failure inside a storage backend. Passed through the store unmodified.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("invalid timestamp {value:?}: {source}")]
    Timestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

impl StorageError {
    pub(crate) fn io(path: impl std::fmt::Display, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_string(),
            source,
        }
    }
}

/// Coarse classification of a [`StoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    DuplicateVote,
    RateLimited,
    Storage,
}

/// Failure of a store operation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("memory {0:?} not found")]
    NotFound(String),

    #[error("voter_id {voter_id:?} already voted on memory {memory_id:?}")]
    DuplicateVote { memory_id: String, voter_id: String },

    #[error("anonymous vote on memory {memory_id:?} rate-limited (1 per {cooldown_secs}s)")]
    RateLimited { memory_id: String, cooldown_secs: i64 },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::DuplicateVote { .. } => ErrorKind::DuplicateVote,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
