//! History command for drillbit.
//!
//! Lists a learner's judged answers from the interaction log, most recent
//! first, together with the questions they ever got wrong.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::to_json;
use crate::error::Result;
use crate::stats::{InteractionEvent, InteractionLog};
use crate::storage::validate_learner_id;

/// Default number of entries shown.
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Options for the history command.
#[derive(Debug, Clone, Default)]
pub struct HistoryOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Maximum number of entries (default 20).
    pub limit: Option<usize>,
    /// Only list the wrong-question set.
    pub wrong_only: bool,
}

/// One logged answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub question_id: String,
    pub correct: bool,
    pub ts: DateTime<Utc>,
}

impl From<InteractionEvent> for HistoryItem {
    fn from(event: InteractionEvent) -> Self {
        Self {
            question_id: event.question_id,
            correct: event.correct,
            ts: event.ts,
        }
    }
}

/// Output format for the history command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryOutput {
    pub success: bool,
    pub learner_id: String,
    pub entries: Vec<HistoryItem>,
    /// Distinct questions answered incorrectly at least once.
    pub wrong_questions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HistoryOutput {
    pub fn failure(learner_id: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            learner_id: learner_id.to_string(),
            entries: Vec::new(),
            wrong_questions: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// The history command implementation.
pub struct HistoryCommand {
    log: InteractionLog,
}

impl HistoryCommand {
    pub fn new(log: InteractionLog) -> Self {
        Self { log }
    }

    pub fn run(&self, learner_id: &str, options: &HistoryOptions) -> HistoryOutput {
        self.try_run(learner_id, options)
            .unwrap_or_else(|e| HistoryOutput::failure(learner_id, e.to_string()))
    }

    fn try_run(&self, learner_id: &str, options: &HistoryOptions) -> Result<HistoryOutput> {
        validate_learner_id(learner_id)?;

        let entries = if options.wrong_only {
            Vec::new()
        } else {
            let limit = options.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
            self.log
                .for_learner(learner_id, Some(limit))?
                .into_iter()
                .map(HistoryItem::from)
                .collect()
        };

        Ok(HistoryOutput {
            success: true,
            learner_id: learner_id.to_string(),
            entries,
            wrong_questions: self.log.wrong_questions(learner_id)?,
            error: None,
        })
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &HistoryOutput, options: &HistoryOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            return to_json(output);
        }

        if !output.success {
            return format!(
                "History unavailable: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        let mut text = String::new();
        if !options.wrong_only {
            if output.entries.is_empty() {
                text.push_str(&format!("No answers recorded for {}.\n", output.learner_id));
            }
            for entry in &output.entries {
                text.push_str(&format!(
                    "{}  {:<12} {}\n",
                    entry.ts.format("%Y-%m-%d %H:%M"),
                    entry.question_id,
                    if entry.correct { "correct" } else { "wrong" }
                ));
            }
        }

        if output.wrong_questions.is_empty() {
            text.push_str("No wrong questions.\n");
        } else {
            text.push_str(&format!("Wrong questions: {}\n", output.wrong_questions.join(", ")));
        }
        text
    }
}
