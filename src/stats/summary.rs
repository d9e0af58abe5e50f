//! Aggregate statistics over the interaction log.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::tracker::InteractionEvent;

/// System-wide answer statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    /// Distinct learners with at least one interaction.
    pub total_learners: usize,
    pub total_interactions: usize,
    /// Fraction of correct interactions, 0 when there are none.
    pub correct_rate: f64,
}

impl Statistics {
    pub fn from_events(events: &[InteractionEvent]) -> Self {
        let learners: HashSet<&str> = events.iter().map(|e| e.learner_id.as_str()).collect();
        let correct = events.iter().filter(|e| e.correct).count();
        let correct_rate = if events.is_empty() {
            0.0
        } else {
            correct as f64 / events.len() as f64
        };

        Self {
            total_learners: learners.len(),
            total_interactions: events.len(),
            correct_rate,
        }
    }
}

/// Answer statistics of a single learner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearnerSummary {
    pub learner_id: String,
    pub interactions: usize,
    pub correct: usize,
    pub correct_rate: f64,
    /// Distinct questions answered incorrectly at least once.
    pub wrong_questions: Vec<String>,
}

impl LearnerSummary {
    /// Summarize the events of `learner_id`, ignoring everyone else's.
    pub fn from_events(learner_id: &str, events: &[InteractionEvent]) -> Self {
        let mut seen = HashSet::new();
        let mut wrong_questions = Vec::new();
        let mut interactions = 0;
        let mut correct = 0;

        for event in events.iter().filter(|e| e.learner_id == learner_id) {
            interactions += 1;
            if event.correct {
                correct += 1;
            } else if seen.insert(event.question_id.as_str()) {
                wrong_questions.push(event.question_id.clone());
            }
        }

        let correct_rate = if interactions == 0 {
            0.0
        } else {
            correct as f64 / interactions as f64
        };

        Self {
            learner_id: learner_id.to_string(),
            interactions,
            correct,
            correct_rate,
            wrong_questions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(learner: &str, question: &str, correct: bool) -> InteractionEvent {
        InteractionEvent::new(learner, question, correct)
    }

    #[test]
    fn test_statistics_empty() {
        let stats = Statistics::from_events(&[]);
        assert_eq!(stats, Statistics::default());
    }

    #[test]
    fn test_statistics_counts() {
        let events = vec![
            event("a", "q1", true),
            event("a", "q2", false),
            event("b", "q1", false),
            event("c", "q1", true),
        ];
        let stats = Statistics::from_events(&events);
        assert_eq!(stats.total_learners, 3);
        assert_eq!(stats.total_interactions, 4);
        assert!((stats.correct_rate - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_learner_summary() {
        let events = vec![
            event("a", "q1", false),
            event("a", "q1", true),
            event("b", "q2", false),
            event("a", "q3", false),
            event("a", "q1", false),
        ];
        let summary = LearnerSummary::from_events("a", &events);
        assert_eq!(summary.interactions, 4);
        assert_eq!(summary.correct, 1);
        assert!((summary.correct_rate - 0.25).abs() < 1e-12);
        assert_eq!(summary.wrong_questions, vec!["q1", "q3"]);
    }

    #[test]
    fn test_learner_summary_unknown_learner() {
        let summary = LearnerSummary::from_events("nobody", &[event("a", "q1", true)]);
        assert_eq!(summary.interactions, 0);
        assert_eq!(summary.correct_rate, 0.0);
        assert!(summary.wrong_questions.is_empty());
    }
}
