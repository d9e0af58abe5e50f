//! Answer command for drillbit.
//!
//! Judges a submitted answer, updates the learner's mastery, saves the
//! learner and appends the interaction to the log.

use serde::{Deserialize, Serialize};

use super::{open_session, to_json};
use crate::checker::Stage;
use crate::config::Config;
use crate::core::MasteryChange;
use crate::error::{exit_codes, FailOpen, Result};
use crate::stats::InteractionLog;
use crate::storage::{validate_learner_id, LearnerStore};

/// Options for the answer command.
#[derive(Debug, Clone, Default)]
pub struct AnswerOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Subject the question belongs to, if not the configured default.
    pub subject: Option<String>,
}

/// Output format for the answer command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerOutput {
    /// Whether the answer was judged and saved.
    pub success: bool,
    pub learner_id: String,
    pub question_id: String,
    pub correct: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_answer: Option<String>,
    /// Mastery change of every knowledge component of the question.
    pub changes: Vec<MasteryChange>,
    /// Error message if the command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnswerOutput {
    /// Create a failed output.
    pub fn failure(learner_id: &str, question_id: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            learner_id: learner_id.to_string(),
            question_id: question_id.to_string(),
            correct: false,
            stage: None,
            reference_answer: None,
            changes: Vec::new(),
            error: Some(error.into()),
        }
    }

    /// Process exit code: OK when correct, INCORRECT when wrong, ERROR on failure.
    pub fn exit_code(&self) -> i32 {
        if !self.success {
            exit_codes::ERROR
        } else if self.correct {
            exit_codes::OK
        } else {
            exit_codes::INCORRECT
        }
    }
}

/// The answer command implementation.
pub struct AnswerCommand<S: LearnerStore> {
    store: S,
    config: Config,
    log: InteractionLog,
}

impl<S: LearnerStore> AnswerCommand<S> {
    pub fn new(store: S, config: Config, log: InteractionLog) -> Self {
        Self { store, config, log }
    }

    /// Submit `answer` to `question_id` on behalf of `learner_id`.
    pub fn run(
        &self,
        learner_id: &str,
        question_id: &str,
        answer: &str,
        options: &AnswerOptions,
    ) -> AnswerOutput {
        self.try_run(learner_id, question_id, answer, options)
            .unwrap_or_else(|e| AnswerOutput::failure(learner_id, question_id, e.to_string()))
    }

    fn try_run(
        &self,
        learner_id: &str,
        question_id: &str,
        answer: &str,
        options: &AnswerOptions,
    ) -> Result<AnswerOutput> {
        validate_learner_id(learner_id)?;
        let session = open_session(&self.config, options.subject.as_deref())?;
        let mut state = self.store.load_or_create(learner_id)?;

        let outcome = session.submit(&mut state, question_id, answer)?;
        self.store.put(&state)?;

        self.log
            .record(learner_id, question_id, outcome.correct)
            .fail_open_default("logging interaction");

        Ok(AnswerOutput {
            success: true,
            learner_id: learner_id.to_string(),
            question_id: outcome.question_id,
            correct: outcome.correct,
            stage: Some(outcome.stage),
            reference_answer: Some(outcome.reference_answer),
            changes: outcome.changes,
            error: None,
        })
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &AnswerOutput, options: &AnswerOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            to_json(output)
        } else {
            self.format_human_readable(output)
        }
    }

    fn format_human_readable(&self, output: &AnswerOutput) -> String {
        if !output.success {
            return format!(
                "Answer not recorded: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        let mut text = if output.correct {
            "Correct!\n".to_string()
        } else {
            format!(
                "Incorrect. Reference answer: {}\n",
                output.reference_answer.as_deref().unwrap_or("")
            )
        };

        for change in &output.changes {
            text.push_str(&format!(
                "  {}: {:.2} -> {:.2} ({:+.2})\n",
                change.kc,
                change.before,
                change.after,
                change.delta()
            ));
        }
        text
    }
}
