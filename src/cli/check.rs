//! Check command for drillbit.
//!
//! Compares a submitted answer with a reference answer without touching
//! any learner. Useful for authoring question banks.

use serde::{Deserialize, Serialize};

use super::to_json;
use crate::checker::{normalize, AnswerChecker, Stage};
use crate::config::Config;
use crate::core::AnswerType;
use crate::error::exit_codes;

/// Options for the check command.
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the check command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckOutput {
    pub success: bool,
    pub answer_type: String,
    pub correct: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    /// Normalized reference, for formula answers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalized_reference: Option<String>,
    /// Normalized submission, for formula answers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalized_submitted: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckOutput {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            answer_type: String::new(),
            correct: false,
            stage: None,
            normalized_reference: None,
            normalized_submitted: None,
            error: Some(error.into()),
        }
    }

    /// Process exit code: OK when equivalent, INCORRECT when not, ERROR on failure.
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

/// The check command implementation.
pub struct CheckCommand {
    checker: AnswerChecker,
}

impl CheckCommand {
    pub fn new(config: Config) -> Self {
        Self {
            checker: AnswerChecker::new(config.checker),
        }
    }

    /// Judge `submitted` against `reference`; `answer_type` is parsed leniently.
    pub fn run(
        &self,
        answer_type: &str,
        reference: &str,
        submitted: &str,
        _options: &CheckOptions,
    ) -> CheckOutput {
        let answer_type: AnswerType = match answer_type.parse() {
            Ok(t) => t,
            Err(e) => return CheckOutput::failure(e),
        };

        let verdict = self.checker.check(answer_type, reference, submitted);
        let (normalized_reference, normalized_submitted) = if answer_type == AnswerType::Formula {
            (Some(normalize(reference)), Some(normalize(submitted)))
        } else {
            (None, None)
        };

        CheckOutput {
            success: true,
            answer_type: answer_type.to_string(),
            correct: verdict.correct,
            stage: Some(verdict.stage),
            normalized_reference,
            normalized_submitted,
            error: None,
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &CheckOutput, options: &CheckOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            return to_json(output);
        }

        if !output.success {
            return format!(
                "Check failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        let mut text = format!(
            "{} ({} check: {})\n",
            if output.correct { "Equivalent" } else { "Not equivalent" },
            output.answer_type,
            output.stage.map(|s| s.as_str()).unwrap_or("none")
        );
        if let (Some(reference), Some(submitted)) =
            (&output.normalized_reference, &output.normalized_submitted)
        {
            text.push_str(&format!("  reference: {}\n  submitted: {}\n", reference, submitted));
        }
        text
    }
}
