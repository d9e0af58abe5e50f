//! Next command for drillbit.
//!
//! Recommends the next question for a learner and persists the knowledge
//! components the recommender materialized.

use serde::{Deserialize, Serialize};

use super::{open_session, to_json};
use crate::config::Config;
use crate::core::{NextQuestion, Question};
use crate::error::{FailOpen, Result};
use crate::storage::{validate_learner_id, LearnerStore};

/// Options for the next command.
#[derive(Debug, Clone, Default)]
pub struct NextOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Subject to practice instead of the configured default.
    pub subject: Option<String>,
}

/// Why no question was served, or that one was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextStatus {
    Question,
    AllMastered,
    Exhausted,
}

/// A question as shown to the learner, without its answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionInfo {
    pub id: String,
    pub chapter: String,
    pub question_text: String,
    pub knowledge_tags: Vec<String>,
    pub difficulty: f64,
    pub answer_type: String,
}

impl From<&Question> for QuestionInfo {
    fn from(question: &Question) -> Self {
        Self {
            id: question.id.clone(),
            chapter: question.chapter.clone(),
            question_text: question.question_text.clone(),
            knowledge_tags: question.knowledge_tags.clone(),
            difficulty: question.difficulty,
            answer_type: question.answer_type.to_string(),
        }
    }
}

/// Output format for the next command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextOutput {
    /// Whether a recommendation could be computed.
    pub success: bool,
    pub learner_id: String,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<NextStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<QuestionInfo>,
    /// Error message if the command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NextOutput {
    fn from_next(learner_id: &str, subject: &str, next: &NextQuestion) -> Self {
        let (status, question) = match next {
            NextQuestion::Question(q) => (NextStatus::Question, Some(QuestionInfo::from(q))),
            NextQuestion::AllMastered => (NextStatus::AllMastered, None),
            NextQuestion::Exhausted => (NextStatus::Exhausted, None),
        };
        Self {
            success: true,
            learner_id: learner_id.to_string(),
            subject: subject.to_string(),
            status: Some(status),
            question,
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(learner_id: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            learner_id: learner_id.to_string(),
            subject: String::new(),
            status: None,
            question: None,
            error: Some(error.into()),
        }
    }
}

/// The next command implementation.
pub struct NextCommand<S: LearnerStore> {
    store: S,
    config: Config,
}

impl<S: LearnerStore> NextCommand<S> {
    pub fn new(store: S, config: Config) -> Self {
        Self { store, config }
    }

    /// Recommend the next question for `learner_id`.
    pub fn run(&self, learner_id: &str, options: &NextOptions) -> NextOutput {
        self.try_run(learner_id, options)
            .unwrap_or_else(|e| NextOutput::failure(learner_id, e.to_string()))
    }

    fn try_run(&self, learner_id: &str, options: &NextOptions) -> Result<NextOutput> {
        validate_learner_id(learner_id)?;
        let mut session = open_session(&self.config, options.subject.as_deref())?;
        let mut state = self.store.load_or_create(learner_id)?;

        let next = session.next_question(&mut state);

        // Materialized mastery entries are worth keeping but not worth failing over.
        state.touch();
        self.store
            .put(&state)
            .fail_open_default("saving learner state");

        Ok(NextOutput::from_next(learner_id, session.subject(), &next))
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &NextOutput, options: &NextOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            to_json(output)
        } else {
            self.format_human_readable(output)
        }
    }

    fn format_human_readable(&self, output: &NextOutput) -> String {
        if !output.success {
            return format!(
                "Could not pick a question: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        match (&output.status, &output.question) {
            (Some(NextStatus::Question), Some(q)) => {
                let mut text = format!("[{}] {} ({})\n", q.id, q.chapter, output.subject);
                text.push_str(&format!("{}\n", q.question_text));
                if !q.knowledge_tags.is_empty() {
                    text.push_str(&format!("Tags: {}\n", q.knowledge_tags.join(", ")));
                }
                text.push_str(&format!("Answer type: {}\n", q.answer_type));
                text
            }
            (Some(NextStatus::AllMastered), _) => format!(
                "Every remaining question in {} is already mastered.\n",
                output.subject
            ),
            _ => format!(
                "All questions in {} answered this round. Run `drillbit restart` to go again.\n",
                output.subject
            ),
        }
    }
}
