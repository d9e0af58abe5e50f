//! Typed answer checking.
//!
//! A submitted answer is compared to the question's reference answer under
//! the question's answer type. Checking never fails: anything that cannot be
//! parsed or evaluated is simply not confirmed as equivalent.

use serde::{Deserialize, Serialize};

use super::expr::Expr;
use super::normalize::normalize;
use super::symbolic::{difference_is_zero, symbolically_equal};
use crate::core::question::{AnswerType, Question};

/// Answer checker settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    /// Absolute tolerance for numeric answers.
    pub numeric_tolerance: f64,
    /// Formula answers longer than this (in chars) only get the literal comparison.
    pub max_formula_len: usize,
    /// Compare string answers case-sensitively.
    pub case_sensitive_strings: bool,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            numeric_tolerance: 1e-6,
            max_formula_len: 512,
            case_sensitive_strings: false,
        }
    }
}

/// Which check decided the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// The submitted answer was empty after trimming.
    Empty,
    /// Numeric comparison.
    Numeric,
    /// String comparison.
    Text,
    /// Symbolic equality of the raw inputs.
    Direct,
    /// Symbolic equality after LaTeX normalization.
    Normalized,
    /// The normalized difference simplified to zero.
    Difference,
    /// Literal comparison of stripped strings.
    Literal,
    /// No formula stage confirmed equivalence.
    None,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Empty => "empty",
            Stage::Numeric => "numeric",
            Stage::Text => "text",
            Stage::Direct => "direct",
            Stage::Normalized => "normalized",
            Stage::Difference => "difference",
            Stage::Literal => "literal",
            Stage::None => "none",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of checking one answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub correct: bool,
    pub stage: Stage,
}

impl Verdict {
    fn new(correct: bool, stage: Stage) -> Self {
        Self { correct, stage }
    }
}

/// Answer checker with its settings.
#[derive(Debug, Clone, Default)]
pub struct AnswerChecker {
    config: CheckerConfig,
}

impl AnswerChecker {
    pub fn new(config: CheckerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    /// Check `submitted` against `reference` under `answer_type`.
    pub fn check(&self, answer_type: AnswerType, reference: &str, submitted: &str) -> Verdict {
        let submitted = submitted.trim();
        let reference = reference.trim();

        if submitted.is_empty() {
            return Verdict::new(false, Stage::Empty);
        }

        match answer_type {
            AnswerType::Numeric => Verdict::new(self.numeric_equal(reference, submitted), Stage::Numeric),
            AnswerType::String => Verdict::new(self.text_equal(reference, submitted), Stage::Text),
            AnswerType::Formula => self.check_formula(reference, submitted),
        }
    }

    /// Check an answer to `question`.
    pub fn check_question(&self, question: &Question, submitted: &str) -> Verdict {
        self.check(question.answer_type, &question.answer, submitted)
    }

    fn numeric_equal(&self, reference: &str, submitted: &str) -> bool {
        match (submitted.parse::<f64>(), reference.parse::<f64>()) {
            (Ok(user), Ok(expected)) => (user - expected).abs() < self.config.numeric_tolerance,
            _ => false,
        }
    }

    fn text_equal(&self, reference: &str, submitted: &str) -> bool {
        if self.config.case_sensitive_strings {
            submitted == reference
        } else {
            submitted.to_lowercase() == reference.to_lowercase()
        }
    }

    fn check_formula(&self, reference: &str, submitted: &str) -> Verdict {
        let max = self.config.max_formula_len;
        let within_limit = reference.chars().count() <= max && submitted.chars().count() <= max;

        if within_limit {
            if let (Ok(user), Ok(expected)) = (Expr::parse(submitted), Expr::parse(reference)) {
                if symbolically_equal(&user, &expected) {
                    return Verdict::new(true, Stage::Direct);
                }
            }

            let normalized_user = normalize(submitted);
            let normalized_expected = normalize(reference);
            if let (Ok(user), Ok(expected)) = (
                Expr::parse(&normalized_user),
                Expr::parse(&normalized_expected),
            ) {
                if symbolically_equal(&user, &expected) {
                    return Verdict::new(true, Stage::Normalized);
                }
                if difference_is_zero(&user, &expected) {
                    return Verdict::new(true, Stage::Difference);
                }
            }
        }

        if literal_form(submitted) == literal_form(reference) {
            Verdict::new(true, Stage::Literal)
        } else {
            Verdict::new(false, Stage::None)
        }
    }
}

/// Strip a formula down to a comparable literal form.
fn literal_form(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            c if c.is_whitespace() => {}
            '\\' | '{' | '}' => {}
            '^' => out.push_str("**"),
            '²' => out.push_str("**2"),
            '×' => out.push('*'),
            '÷' => out.push('/'),
            other => out.extend(other.to_lowercase()),
        }
    }
    out
}

/// Check an answer with the default settings.
pub fn check_answer(question: &Question, submitted: &str) -> bool {
    check_answer_detailed(question, submitted).correct
}

/// Check an answer with the default settings, reporting the deciding stage.
pub fn check_answer_detailed(question: &Question, submitted: &str) -> Verdict {
    AnswerChecker::default().check_question(question, submitted)
}
