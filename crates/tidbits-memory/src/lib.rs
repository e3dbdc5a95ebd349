//! Voting memory store for agents.
//!
//! Provides:
//! - Memory schema and vote records
//! - Storage adapters (in-memory, JSON file, SQLite)
//! - The store that enforces vote dedupe and anonymous rate limiting

pub mod config;
pub mod error;
pub mod schema;
pub mod storage;
pub mod store;

pub use config::{Backend, StoreConfig};
pub use error::{ErrorKind, StorageError, StoreError};
pub use schema::{Memory, MemoryListing, PublicMemory, VoteRecord};
pub use storage::{InMemoryAdapter, JsonFileAdapter, MemoryAdapter, SqliteAdapter};
pub use store::{
    ANON_VOTE_COOLDOWN_SECS, ListQuery, MemoryStore, MemoryUpdate, NewMemory, OrderBy,
    VoteDirection, create_voter_id,
};
