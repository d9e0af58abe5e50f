//! Restart command for drillbit.
//!
//! Starts a new round for a learner: every question becomes available
//! again while mastery and history are kept.

use serde::{Deserialize, Serialize};

use super::to_json;
use crate::error::Result;
use crate::storage::{validate_learner_id, LearnerStore};

/// Options for the restart command.
#[derive(Debug, Clone, Default)]
pub struct RestartOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the restart command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestartOutput {
    pub success: bool,
    pub learner_id: String,
    /// Questions that were marked answered before the restart.
    pub cleared: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RestartOutput {
    pub fn failure(learner_id: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            learner_id: learner_id.to_string(),
            cleared: 0,
            error: Some(error.into()),
        }
    }
}

/// The restart command implementation.
pub struct RestartCommand<S: LearnerStore> {
    store: S,
}

impl<S: LearnerStore> RestartCommand<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn run(&self, learner_id: &str, _options: &RestartOptions) -> RestartOutput {
        self.try_run(learner_id)
            .unwrap_or_else(|e| RestartOutput::failure(learner_id, e.to_string()))
    }

    fn try_run(&self, learner_id: &str) -> Result<RestartOutput> {
        validate_learner_id(learner_id)?;
        let mut state = self.store.load_or_create(learner_id)?;
        let cleared = state.answered.len();

        state.restart_round();
        self.store.put(&state)?;
        tracing::info!("learner '{}' restarted the round ({} cleared)", learner_id, cleared);

        Ok(RestartOutput {
            success: true,
            learner_id: learner_id.to_string(),
            cleared,
            error: None,
        })
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &RestartOutput, options: &RestartOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            to_json(output)
        } else if output.success {
            format!(
                "New round started for {} ({} answered questions cleared, mastery kept).\n",
                output.learner_id, output.cleared
            )
        } else {
            format!(
                "Restart failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LearnerState;
    use crate::storage::MemoryLearnerStore;
    use std::sync::Arc;

    #[test]
    fn test_restart_keeps_mastery_and_history() {
        let store = Arc::new(MemoryLearnerStore::new());
        let mut state = LearnerState::new("alice");
        state.record("m1", "1", true);
        state.record("m2", "0", false);
        state.mastery.insert("极限".to_string(), 0.76);
        store.put(&state).unwrap();

        let cmd = RestartCommand::new(Arc::clone(&store));
        let output = cmd.run("alice", &RestartOptions::default());

        assert!(output.success);
        assert_eq!(output.cleared, 2);

        let saved = store.get("alice").unwrap().unwrap();
        assert!(saved.answered.is_empty());
        assert!(saved.correct_this_round.is_empty());
        assert_eq!(saved.history.len(), 2);
        assert_eq!(saved.mastery.get("极限"), Some(&0.76));
    }

    #[test]
    fn test_restart_new_learner() {
        let store = Arc::new(MemoryLearnerStore::new());
        let cmd = RestartCommand::new(Arc::clone(&store));

        let output = cmd.run("bob", &RestartOptions::default());
        assert!(output.success);
        assert_eq!(output.cleared, 0);
        assert!(store.get("bob").unwrap().is_some());
    }

    #[test]
    fn test_restart_invalid_id() {
        let cmd = RestartCommand::new(MemoryLearnerStore::new());
        let output = cmd.run("", &RestartOptions::default());
        assert!(!output.success);

        let text = cmd.format_output(&output, &RestartOptions::default());
        assert!(text.starts_with("Restart failed"));
    }
}
