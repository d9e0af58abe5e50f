//! Progress command for drillbit.
//!
//! Shows a learner's progress through the active subject and their mastery
//! of every knowledge component seen so far.

use serde::{Deserialize, Serialize};

use super::{open_session, to_json};
use crate::config::Config;
use crate::core::Progress;
use crate::error::Result;
use crate::storage::{validate_learner_id, LearnerStore};

/// Options for the progress command.
#[derive(Debug, Clone, Default)]
pub struct ProgressOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Subject to report on instead of the configured default.
    pub subject: Option<String>,
}

/// Output format for the progress command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressOutput {
    pub success: bool,
    pub learner_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<Progress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProgressOutput {
    pub fn failure(learner_id: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            learner_id: learner_id.to_string(),
            progress: None,
            error: Some(error.into()),
        }
    }
}

/// The progress command implementation.
pub struct ProgressCommand<S: LearnerStore> {
    store: S,
    config: Config,
}

impl<S: LearnerStore> ProgressCommand<S> {
    pub fn new(store: S, config: Config) -> Self {
        Self { store, config }
    }

    /// Report progress without modifying the stored learner.
    pub fn run(&self, learner_id: &str, options: &ProgressOptions) -> ProgressOutput {
        self.try_run(learner_id, options)
            .unwrap_or_else(|e| ProgressOutput::failure(learner_id, e.to_string()))
    }

    fn try_run(&self, learner_id: &str, options: &ProgressOptions) -> Result<ProgressOutput> {
        validate_learner_id(learner_id)?;
        let session = open_session(&self.config, options.subject.as_deref())?;
        let state = self.store.load_or_create(learner_id)?;

        Ok(ProgressOutput {
            success: true,
            learner_id: learner_id.to_string(),
            progress: Some(session.progress(&state)),
            error: None,
        })
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &ProgressOutput, options: &ProgressOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            to_json(output)
        } else {
            self.format_human_readable(output)
        }
    }

    fn format_human_readable(&self, output: &ProgressOutput) -> String {
        let progress = match (&output.progress, output.success) {
            (Some(progress), true) => progress,
            _ => {
                return format!(
                    "Progress unavailable: {}\n",
                    output.error.as_deref().unwrap_or("unknown error")
                )
            }
        };

        let mut text = format!("Learner: {}\nSubject: {}\n", output.learner_id, progress.subject);
        text.push_str(&format!(
            "Answered: {}/{} (accuracy {:.1}%)\n",
            progress.answered,
            progress.total,
            progress.accuracy * 100.0
        ));

        if progress.mastery.is_empty() {
            text.push_str("No knowledge components practiced yet.\n");
        } else {
            text.push_str("Mastery:\n");
            for (kc, mastery) in &progress.mastery {
                text.push_str(&format!("  {:<16} {:.2}\n", kc, mastery));
            }
        }
        text
    }
}
