//! Learner storage traits for drillbit.
//!
//! This module defines the `LearnerStore` trait for learner state persistence.

use std::sync::Arc;

use crate::core::LearnerState;
use crate::error::Result;

/// Trait for learner storage backends.
///
/// The practice core never persists anything itself; callers load a
/// learner's state before an interaction and save it afterwards.
pub trait LearnerStore: Send + Sync {
    /// Retrieve a learner by ID.
    ///
    /// Returns `Ok(None)` if the learner doesn't exist.
    fn get(&self, id: &str) -> Result<Option<LearnerState>>;

    /// Save a learner, creating or replacing the stored record.
    fn put(&self, state: &LearnerState) -> Result<()>;

    /// List learners, most recently updated first, up to `limit`.
    fn list(&self, limit: usize) -> Result<Vec<LearnerState>>;

    /// Delete a learner.
    ///
    /// Returns `Ok(())` even if the learner doesn't exist.
    fn delete(&self, id: &str) -> Result<()>;

    /// Check if a learner exists.
    fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.get(id)?.is_some())
    }

    /// Load a learner, or create an empty state on first encounter.
    ///
    /// A newly created state is not saved until the caller puts it.
    fn load_or_create(&self, id: &str) -> Result<LearnerState> {
        Ok(self.get(id)?.unwrap_or_else(|| LearnerState::new(id)))
    }
}

/// Blanket implementation of LearnerStore for Arc-wrapped stores.
impl<T: LearnerStore + ?Sized> LearnerStore for Arc<T> {
    fn get(&self, id: &str) -> Result<Option<LearnerState>> {
        (**self).get(id)
    }

    fn put(&self, state: &LearnerState) -> Result<()> {
        (**self).put(state)
    }

    fn list(&self, limit: usize) -> Result<Vec<LearnerState>> {
        (**self).list(limit)
    }

    fn delete(&self, id: &str) -> Result<()> {
        (**self).delete(id)
    }

    fn load_or_create(&self, id: &str) -> Result<LearnerState> {
        (**self).load_or_create(id)
    }
}
