//! Storage adapters.
//!
//! Every backend implements [`MemoryAdapter`]: a keyed upsert/lookup/delete
//! store with no business rules of its own. Ordering, filtering and all
//! vote invariants live in [`crate::store::MemoryStore`].

mod json_file;
mod memory;
mod sqlite;

pub use json_file::JsonFileAdapter;
pub use memory::InMemoryAdapter;
pub use sqlite::SqliteAdapter;

use crate::error::StorageError;
use crate::schema::Memory;

/// Storage backend contract.
pub trait MemoryAdapter: Send + Sync {
    /// Insert or replace a memory by id. Durable before returning.
    fn save(&self, memory: &Memory) -> Result<(), StorageError>;

    /// Look up a memory by id.
    fn get(&self, id: &str) -> Result<Option<Memory>, StorageError>;

    /// Delete a memory. Returns true if it existed.
    fn delete(&self, id: &str) -> Result<bool, StorageError>;

    /// All stored memories, in no particular order.
    fn list_all(&self) -> Result<Vec<Memory>, StorageError>;
}

impl<A: MemoryAdapter + ?Sized> MemoryAdapter for Box<A> {
    fn save(&self, memory: &Memory) -> Result<(), StorageError> {
        (**self).save(memory)
    }

    fn get(&self, id: &str) -> Result<Option<Memory>, StorageError> {
        (**self).get(id)
    }

    fn delete(&self, id: &str) -> Result<bool, StorageError> {
        (**self).delete(id)
    }

    fn list_all(&self) -> Result<Vec<Memory>, StorageError> {
        (**self).list_all()
    }
}
