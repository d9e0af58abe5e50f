//! Question records and per-subject question banks.
//!
//! Questions are immutable once loaded. A bank is the pool for one subject,
//! read from a JSON array of question objects.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DrillError, Result};
use crate::util::read_to_string_limited;

/// Knowledge component used for questions without tags.
pub const DEFAULT_KC: &str = "default";

/// How a submitted answer is compared to the reference answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnswerType {
    /// Compared as floating-point numbers.
    Numeric,
    /// Compared as algebraic expressions.
    Formula,
    /// Compared as trimmed text.
    #[default]
    String,
}

impl AnswerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerType::Numeric => "numeric",
            AnswerType::Formula => "formula",
            AnswerType::String => "string",
        }
    }
}

impl std::fmt::Display for AnswerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AnswerType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "numeric" | "number" => Ok(AnswerType::Numeric),
            "formula" | "expression" => Ok(AnswerType::Formula),
            "string" | "text" => Ok(AnswerType::String),
            other => Err(format!(
                "unknown answer type '{}' (expected numeric, formula or string)",
                other
            )),
        }
    }
}

/// A single practice question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub chapter: String,
    #[serde(default, alias = "question")]
    pub question_text: String,
    /// Knowledge components exercised by the question.
    #[serde(default)]
    pub knowledge_tags: Vec<String>,
    #[serde(default)]
    pub difficulty: f64,
    /// Reference answer.
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub answer_type: AnswerType,
}

impl Question {
    /// Knowledge components this question updates.
    ///
    /// An untagged question counts as exercising the `"default"` component.
    pub fn knowledge_components(&self) -> Vec<&str> {
        if self.knowledge_tags.is_empty() {
            vec![DEFAULT_KC]
        } else {
            self.knowledge_tags.iter().map(String::as_str).collect()
        }
    }
}

/// The question pool of one subject.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuestionBank {
    pub subject: String,
    pub questions: Vec<Question>,
}

impl QuestionBank {
    pub fn new(subject: impl Into<String>, questions: Vec<Question>) -> Self {
        Self {
            subject: subject.into(),
            questions,
        }
    }

    /// Load a bank from a JSON array of questions.
    ///
    /// A missing file yields an empty bank. Unreadable or malformed files
    /// are errors.
    pub fn load(subject: impl Into<String>, path: &Path) -> Result<Self> {
        let subject = subject.into();

        if !path.exists() {
            tracing::warn!(
                "question bank for '{}' not found at {}, using an empty pool",
                subject,
                path.display()
            );
            return Ok(Self::new(subject, Vec::new()));
        }

        let content = read_to_string_limited(path)?;
        let questions: Vec<Question> = serde_json::from_str(&content).map_err(|e| {
            DrillError::question_bank(format!("failed to parse {}: {}", path.display(), e))
        })?;

        let mut seen = HashSet::new();
        for question in &questions {
            if !seen.insert(question.id.as_str()) {
                return Err(DrillError::question_bank(format!(
                    "duplicate question id '{}' in {}",
                    question.id,
                    path.display()
                )));
            }
        }

        tracing::debug!(
            "loaded {} questions for '{}' from {}",
            questions.len(),
            subject,
            path.display()
        );

        Ok(Self::new(subject, questions))
    }

    pub fn get(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// Ids of every question in the bank.
    pub fn ids(&self) -> HashSet<String> {
        self.questions.iter().map(|q| q.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}
