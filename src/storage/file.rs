//! File-based learner storage for drillbit.
//!
//! Learners are stored as JSON files in `~/.drillbit/learners/`.
//! Atomic writes are achieved via temp file + rename pattern.
//!
//! Files named `user_<id>.json` from older installs are still read, and are
//! replaced by `<id>.json` on the next save.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::learners_dir;
use crate::core::LearnerState;
use crate::error::{DrillError, Result};
use crate::storage::LearnerStore;
use crate::util::{atomic_write, read_to_string_limited};

/// Maximum length of a learner id.
pub const MAX_LEARNER_ID_LEN: usize = 128;

/// File-based learner storage.
///
/// Stores each learner as `<dir>/<id>.json`.
#[derive(Debug, Clone)]
pub struct FileLearnerStore {
    /// Directory where learner files are stored.
    learners_dir: PathBuf,
}

impl FileLearnerStore {
    /// Create a store in the default directory.
    ///
    /// Uses `~/.drillbit/learners/` or `$DRILLBIT_HOME/learners/`.
    pub fn new() -> Result<Self> {
        let dir = learners_dir().ok_or_else(|| {
            DrillError::config("could not determine learners directory (no home directory)")
        })?;
        Self::with_dir(dir)
    }

    /// Create a store in a custom directory, creating it if needed.
    pub fn with_dir(learners_dir: impl Into<PathBuf>) -> Result<Self> {
        let learners_dir = learners_dir.into();

        if !learners_dir.exists() {
            fs::create_dir_all(&learners_dir)
                .map_err(|e| DrillError::storage(&learners_dir, e))?;
        }

        Ok(Self { learners_dir })
    }

    pub fn dir(&self) -> &PathBuf {
        &self.learners_dir
    }

    /// Get the path for a learner file.
    fn learner_path(&self, id: &str) -> Result<PathBuf> {
        validate_learner_id(id)?;
        Ok(self.learners_dir.join(format!("{}.json", id)))
    }

    /// Path of a learner file in the legacy `user_<id>.json` layout.
    fn legacy_path(&self, id: &str) -> PathBuf {
        self.learners_dir.join(format!("user_{}.json", id))
    }

    /// Get the path for the temp file used during atomic writes.
    fn temp_path(&self, id: &str) -> PathBuf {
        self.learners_dir.join(format!(".{}.json.tmp", id))
    }

    /// Remove a learner's legacy file, if it belongs to that learner.
    fn remove_legacy(&self, id: &str) {
        let legacy = self.legacy_path(id);
        if !legacy.exists() {
            return;
        }
        match read_learner(&legacy) {
            Ok(state) if state.id == id => {
                if let Err(e) = fs::remove_file(&legacy) {
                    tracing::warn!("could not remove legacy learner file {}: {}", legacy.display(), e);
                }
            }
            _ => {}
        }
    }
}

fn read_learner(path: &Path) -> Result<LearnerState> {
    let content = read_to_string_limited(path)?;
    serde_json::from_str(&content)
        .map_err(|e| DrillError::serde(format!("failed to parse {}: {}", path.display(), e)))
}

/// Check that a learner id is usable as a file name.
pub fn validate_learner_id(id: &str) -> Result<()> {
    let reason = if id.is_empty() {
        Some("must not be empty")
    } else if id.len() > MAX_LEARNER_ID_LEN {
        Some("is too long")
    } else if id.starts_with('.') {
        Some("must not start with a dot")
    } else if id.contains(['/', '\\']) {
        Some("contains a path separator")
    } else if id.chars().any(char::is_control) {
        Some("contains control characters")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(DrillError::invalid_learner_id(id, reason)),
        None => Ok(()),
    }
}

impl LearnerStore for FileLearnerStore {
    fn get(&self, id: &str) -> Result<Option<LearnerState>> {
        let path = self.learner_path(id)?;
        if path.exists() {
            return read_learner(&path).map(Some);
        }

        let legacy = self.legacy_path(id);
        if !legacy.exists() {
            return Ok(None);
        }
        let state = read_learner(&legacy)?;
        // `user_<id>.json` may also be the current file of a learner named `user_<id>`.
        if state.id != id {
            return Ok(None);
        }
        tracing::debug!(learner = id, "loaded legacy learner file {}", legacy.display());
        Ok(Some(state))
    }

    fn put(&self, state: &LearnerState) -> Result<()> {
        let path = self.learner_path(&state.id)?;
        let json = serde_json::to_string_pretty(state)?;
        atomic_write(&path, json.as_bytes())?;
        self.remove_legacy(&state.id);
        Ok(())
    }

    fn list(&self, limit: usize) -> Result<Vec<LearnerState>> {
        if !self.learners_dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.learners_dir)
            .map_err(|e| DrillError::storage(&self.learners_dir, e))?;

        let mut learners = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| DrillError::storage(&self.learners_dir, e))?;
            let path = entry.path();

            // Skip non-JSON files and temp files
            if path.extension().map(|e| e != "json").unwrap_or(true) {
                continue;
            }
            if path
                .file_name()
                .map(|n| n.to_string_lossy().starts_with('.'))
                .unwrap_or(true)
            {
                continue;
            }

            match read_learner(&path) {
                Ok(state) => learners.push(state),
                Err(e) => tracing::warn!("skipping unreadable learner file: {}", e),
            }
        }

        learners.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        let mut seen = HashSet::new();
        learners.retain(|state| seen.insert(state.id.clone()));
        learners.truncate(limit);

        Ok(learners)
    }

    fn delete(&self, id: &str) -> Result<()> {
        let path = self.learner_path(id)?;

        if path.exists() {
            fs::remove_file(&path).map_err(|e| DrillError::storage(&path, e))?;
        }
        self.remove_legacy(id);

        // Also clean up any temp file
        let temp_path = self.temp_path(id);
        if temp_path.exists() {
            let _ = fs::remove_file(&temp_path);
        }

        Ok(())
    }
}
