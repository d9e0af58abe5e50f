//! In-memory learner storage.
//!
//! A thread-safe implementation of the LearnerStore trait, used by tests and
//! by embedders that persist state elsewhere.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::core::LearnerState;
use crate::error::Result;
use crate::storage::LearnerStore;

/// In-memory learner store.
///
/// Learners are lost when the store is dropped.
#[derive(Debug, Default)]
pub struct MemoryLearnerStore {
    learners: RwLock<HashMap<String, LearnerState>>,
}

impl MemoryLearnerStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            learners: RwLock::new(HashMap::new()),
        }
    }

    // A poisoned lock still holds consistent data: every write is a single insert or remove.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, LearnerState>> {
        self.learners.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, LearnerState>> {
        self.learners.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Get the number of learners in the store.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Remove every learner from the store.
    pub fn clear(&self) {
        self.write().clear();
    }
}

impl LearnerStore for MemoryLearnerStore {
    fn get(&self, id: &str) -> Result<Option<LearnerState>> {
        Ok(self.read().get(id).cloned())
    }

    fn put(&self, state: &LearnerState) -> Result<()> {
        self.write().insert(state.id.clone(), state.clone());
        Ok(())
    }

    fn list(&self, limit: usize) -> Result<Vec<LearnerState>> {
        let mut result: Vec<LearnerState> = self.read().values().cloned().collect();

        // Most recently updated first
        result.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        result.truncate(limit);

        Ok(result)
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.write().remove(id);
        Ok(())
    }
}
