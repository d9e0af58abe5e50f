//! Subjects command for drillbit.
//!
//! Lists the configured subjects with their question bank files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::to_json;
use crate::config::Config;
use crate::core::QuestionBank;

/// Options for the subjects command.
#[derive(Debug, Clone, Default)]
pub struct SubjectsOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// One configured subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectInfo {
    pub name: String,
    pub path: PathBuf,
    /// Number of questions, 0 when the bank is missing or unreadable.
    pub questions: usize,
    pub is_default: bool,
    /// Why the bank could not be loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub problem: Option<String>,
}

/// Output format for the subjects command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectsOutput {
    pub success: bool,
    pub subjects: Vec<SubjectInfo>,
}

/// The subjects command implementation.
pub struct SubjectsCommand {
    config: Config,
}

impl SubjectsCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn run(&self, _options: &SubjectsOptions) -> SubjectsOutput {
        let subjects = self
            .config
            .subject_names()
            .into_iter()
            .filter_map(|name| {
                let path = self.config.question_bank_path(name)?;
                let (questions, problem) = if !path.exists() {
                    (0, Some("file not found".to_string()))
                } else {
                    match QuestionBank::load(name, &path) {
                        Ok(bank) => (bank.len(), None),
                        Err(e) => (0, Some(e.to_string())),
                    }
                };
                Some(SubjectInfo {
                    name: name.to_string(),
                    path,
                    questions,
                    is_default: name == self.config.default_subject,
                    problem,
                })
            })
            .collect();

        SubjectsOutput {
            success: true,
            subjects,
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &SubjectsOutput, options: &SubjectsOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            return to_json(output);
        }

        let mut text = String::new();
        for subject in &output.subjects {
            text.push_str(&format!(
                "{} {}  {} questions  ({})",
                if subject.is_default { "*" } else { " " },
                subject.name,
                subject.questions,
                subject.path.display()
            ));
            if let Some(problem) = &subject.problem {
                text.push_str(&format!("  [{}]", problem));
            }
            text.push('\n');
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::test_support::fixture_config;
    use std::fs;

    #[test]
    fn test_subjects_lists_configured_banks() {
        let (dir, config) = fixture_config();
        fs::write(dir.path().join("prob.json"), "{ not an array").unwrap();

        let cmd = SubjectsCommand::new(config);
        let output = cmd.run(&SubjectsOptions::default());

        assert!(output.success);
        assert_eq!(output.subjects.len(), 3);

        let math = output.subjects.iter().find(|s| s.name == "高等数学").unwrap();
        assert_eq!(math.questions, 3);
        assert!(math.is_default);
        assert!(math.problem.is_none());

        let linalg = output.subjects.iter().find(|s| s.name == "线性代数").unwrap();
        assert_eq!(linalg.problem.as_deref(), Some("file not found"));

        let prob = output.subjects.iter().find(|s| s.name == "概率论").unwrap();
        assert!(prob.problem.as_ref().unwrap().contains("question bank error"));
    }

    #[test]
    fn test_format_output_marks_default() {
        let (_dir, config) = fixture_config();
        let cmd = SubjectsCommand::new(config);
        let output = cmd.run(&SubjectsOptions::default());

        let text = cmd.format_output(&output, &SubjectsOptions::default());
        assert!(text.contains("* 高等数学  3 questions"));
        assert!(text.contains("  线性代数  0 questions"));
    }
}
