//! Volatile in-process backend.

use super::MemoryAdapter;
use crate::error::StorageError;
use crate::schema::Memory;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Keeps memories in a map for the lifetime of the process.
///
/// Values are cloned on the way in and on the way out, so a caller holding
/// a returned [`Memory`] can never reach the stored copy.
#[derive(Debug, Default)]
pub struct InMemoryAdapter {
    data: RwLock<HashMap<String, Memory>>,
}

impl InMemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryAdapter for InMemoryAdapter {
    fn save(&self, memory: &Memory) -> Result<(), StorageError> {
        self.data.write().insert(memory.id.clone(), memory.clone());
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<Memory>, StorageError> {
        Ok(self.data.read().get(id).cloned())
    }

    fn delete(&self, id: &str) -> Result<bool, StorageError> {
        Ok(self.data.write().remove(id).is_some())
    }

    fn list_all(&self) -> Result<Vec<Memory>, StorageError> {
        Ok(self.data.read().values().cloned().collect())
    }
}
