//! Stats command for drillbit.
//!
//! Displays system-wide answer statistics, optionally one learner's summary,
//! and the most recently active learners.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::to_json;
use crate::core::LearnerState;
use crate::error::Result;
use crate::stats::{InteractionLog, LearnerSummary, Statistics};
use crate::storage::{validate_learner_id, LearnerStore};

/// Default number of learners listed.
pub const DEFAULT_LEARNER_LIMIT: usize = 10;

/// Options for the stats command.
#[derive(Debug, Clone, Default)]
pub struct StatsOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Include the summary of this learner.
    pub learner: Option<String>,
    /// Maximum number of learners listed.
    pub limit: Option<usize>,
}

/// A stored learner, as listed by the stats command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerInfo {
    pub id: String,
    pub answered: usize,
    pub components: usize,
    pub updated_at: DateTime<Utc>,
}

impl From<&LearnerState> for LearnerInfo {
    fn from(state: &LearnerState) -> Self {
        Self {
            id: state.id.clone(),
            answered: state.answered.len(),
            components: state.mastery.len(),
            updated_at: state.updated_at,
        }
    }
}

/// Output format for the stats command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsOutput {
    pub success: bool,
    pub statistics: Statistics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learner: Option<LearnerSummary>,
    /// Most recently active learners first.
    pub learners: Vec<LearnerInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatsOutput {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            statistics: Statistics::default(),
            learner: None,
            learners: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// The stats command implementation.
pub struct StatsCommand<S: LearnerStore> {
    store: S,
    log: InteractionLog,
}

impl<S: LearnerStore> StatsCommand<S> {
    pub fn new(store: S, log: InteractionLog) -> Self {
        Self { store, log }
    }

    pub fn run(&self, options: &StatsOptions) -> StatsOutput {
        self.try_run(options)
            .unwrap_or_else(|e| StatsOutput::failure(e.to_string()))
    }

    fn try_run(&self, options: &StatsOptions) -> Result<StatsOutput> {
        let events = self.log.read_all()?;

        let learner = match &options.learner {
            Some(id) => {
                validate_learner_id(id)?;
                Some(LearnerSummary::from_events(id, &events))
            }
            None => None,
        };

        let learners = self
            .store
            .list(options.limit.unwrap_or(DEFAULT_LEARNER_LIMIT))?
            .iter()
            .map(LearnerInfo::from)
            .collect();

        Ok(StatsOutput {
            success: true,
            statistics: Statistics::from_events(&events),
            learner,
            learners,
            error: None,
        })
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &StatsOutput, options: &StatsOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            to_json(output)
        } else {
            self.format_human_readable(output)
        }
    }

    fn format_human_readable(&self, output: &StatsOutput) -> String {
        if !output.success {
            return format!(
                "Stats unavailable: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        let stats = &output.statistics;
        let mut text = String::from("Answer statistics\n");
        text.push_str(&format!("  Learners:      {}\n", stats.total_learners));
        text.push_str(&format!("  Interactions:  {}\n", stats.total_interactions));
        text.push_str(&format!("  Correct rate:  {:.1}%\n", stats.correct_rate * 100.0));

        if let Some(summary) = &output.learner {
            text.push_str(&format!(
                "\n{}: {} answers, {} correct ({:.1}%)\n",
                summary.learner_id,
                summary.interactions,
                summary.correct,
                summary.correct_rate * 100.0
            ));
            if !summary.wrong_questions.is_empty() {
                text.push_str(&format!(
                    "  Wrong questions: {}\n",
                    summary.wrong_questions.join(", ")
                ));
            }
        }

        if !output.learners.is_empty() {
            text.push_str("\nRecent learners\n");
            for info in &output.learners {
                text.push_str(&format!(
                    "  {:<20} {:>4} answered  {:>3} components  {}\n",
                    info.id,
                    info.answered,
                    info.components,
                    info.updated_at.format("%Y-%m-%d %H:%M")
                ));
            }
        }
        text
    }
}
