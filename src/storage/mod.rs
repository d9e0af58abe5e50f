//! Learner storage for drillbit.
//!
//! This module provides persistent storage for learner state,
//! supporting file-based and in-memory backends.

pub mod file;
pub mod memory;
pub mod traits;

pub use file::{validate_learner_id, FileLearnerStore};
pub use memory::MemoryLearnerStore;
pub use traits::LearnerStore;
