//! Reset command for drillbit.
//!
//! Deletes a learner's stored state. The interaction log is untouched.

use serde::{Deserialize, Serialize};

use super::to_json;
use crate::error::Result;
use crate::storage::{validate_learner_id, LearnerStore};

/// Options for the reset command.
#[derive(Debug, Clone, Default)]
pub struct ResetOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the reset command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetOutput {
    pub success: bool,
    pub learner_id: String,
    /// Whether there was stored state to delete.
    pub existed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResetOutput {
    pub fn failure(learner_id: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            learner_id: learner_id.to_string(),
            existed: false,
            error: Some(error.into()),
        }
    }
}

/// The reset command implementation.
pub struct ResetCommand<S: LearnerStore> {
    store: S,
}

impl<S: LearnerStore> ResetCommand<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn run(&self, learner_id: &str, _options: &ResetOptions) -> ResetOutput {
        self.try_run(learner_id)
            .unwrap_or_else(|e| ResetOutput::failure(learner_id, e.to_string()))
    }

    fn try_run(&self, learner_id: &str) -> Result<ResetOutput> {
        validate_learner_id(learner_id)?;
        let existed = self.store.exists(learner_id)?;
        if existed {
            self.store.delete(learner_id)?;
            tracing::info!("deleted learner '{}'", learner_id);
        }

        Ok(ResetOutput {
            success: true,
            learner_id: learner_id.to_string(),
            existed,
            error: None,
        })
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &ResetOutput, options: &ResetOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            to_json(output)
        } else if !output.success {
            format!(
                "Reset failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            )
        } else if output.existed {
            format!("Learner {} reset.\n", output.learner_id)
        } else {
            format!("Learner {} has no saved state.\n", output.learner_id)
        }
    }
}
