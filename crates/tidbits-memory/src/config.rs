//! Backend selection.

use crate::error::StorageError;
use crate::storage::{InMemoryAdapter, JsonFileAdapter, MemoryAdapter, SqliteAdapter};
use camino::Utf8PathBuf;
use std::fmt;
use std::str::FromStr;

/// Environment variable overriding the storage path.
pub const DB_PATH_ENV: &str = "TIDBITS_DB";

/// Default storage file when nothing else is configured.
pub const DEFAULT_DB_PATH: &str = "memories.json";

/// Storage backend kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    #[default]
    Json,
    Sqlite,
    Memory,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Sqlite => "sqlite",
            Self::Memory => "memory",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => Err(format!(
                "unknown backend {other:?}; expected json, sqlite or memory"
            )),
        }
    }
}

/// Which backend to use and where it keeps its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub backend: Backend,
    /// File path for json/sqlite; ignored by the memory backend
    pub path: Utf8PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            path: Self::default_path(),
        }
    }
}

impl StoreConfig {
    pub fn new(backend: Backend, path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            backend,
            path: path.into(),
        }
    }

    /// Get default storage path.
    ///
    /// Priority:
    /// 1. TIDBITS_DB environment variable (if set)
    /// 2. ./memories.json
    pub fn default_path() -> Utf8PathBuf {
        path_or_default(std::env::var(DB_PATH_ENV).ok())
    }

    /// Construct the configured adapter.
    pub fn open_adapter(&self) -> Result<Box<dyn MemoryAdapter>, StorageError> {
        log::debug!("opening {} backend at {}", self.backend, self.path);
        Ok(match self.backend {
            Backend::Json => Box::new(JsonFileAdapter::open(self.path.clone())?),
            Backend::Sqlite => Box::new(SqliteAdapter::open(self.path.as_str())?),
            Backend::Memory => Box::new(InMemoryAdapter::new()),
        })
    }
}

fn path_or_default(custom: Option<String>) -> Utf8PathBuf {
    match custom {
        Some(custom) if !custom.is_empty() => Utf8PathBuf::from(custom),
        _ => Utf8PathBuf::from(DEFAULT_DB_PATH),
    }
}
