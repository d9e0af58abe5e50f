//! Per-learner progress state.
//!
//! `LearnerState` is plain data: the recommender and the BKT engine mutate
//! it, and the caller decides when to persist it.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// One answered question in a learner's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(alias = "qid")]
    pub question_id: String,
    /// The submitted answer, trimmed.
    #[serde(alias = "user_answer")]
    pub answer: String,
    pub correct: bool,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
}

/// Accept RFC 3339 timestamps as well as naive ISO timestamps, read as UTC.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}

/// The complete progress record of one learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerState {
    /// Opaque learner identifier.
    #[serde(alias = "user_id")]
    pub id: String,
    /// Mastery probability per knowledge component.
    #[serde(default, alias = "knowledge_state")]
    pub mastery: BTreeMap<String, f64>,
    /// Every question answered since the last round reset, across subjects.
    #[serde(default, alias = "answered_questions")]
    pub answered: BTreeSet<String>,
    /// Questions answered correctly since the last round reset.
    #[serde(default, alias = "correct_in_round")]
    pub correct_this_round: BTreeSet<String>,
    /// Append-only answer log.
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl LearnerState {
    /// Create an empty state for a learner seen for the first time.
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            mastery: BTreeMap::new(),
            answered: BTreeSet::new(),
            correct_this_round: BTreeSet::new(),
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Record an answered question.
    pub fn record(&mut self, question_id: &str, answer: &str, correct: bool) {
        let now = Utc::now();
        self.history.push(HistoryEntry {
            question_id: question_id.to_string(),
            answer: answer.to_string(),
            correct,
            timestamp: now,
        });
        self.answered.insert(question_id.to_string());
        if correct {
            self.correct_this_round.insert(question_id.to_string());
        }
        self.updated_at = now;
    }

    /// Start a new round: forget which questions were answered, keep mastery and history.
    pub fn restart_round(&mut self) {
        self.answered.clear();
        self.correct_this_round.clear();
        self.updated_at = Utc::now();
    }

    /// Mastery of `kc`, or `default` if it has never been seen.
    pub fn mastery_of(&self, kc: &str, default: f64) -> f64 {
        self.mastery.get(kc).copied().unwrap_or(default)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
