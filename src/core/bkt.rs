//! Bayesian Knowledge Tracing mastery updates.
//!
//! Mastery of a knowledge component is the probability that the learner
//! knows it. After each observed answer the probability is conditioned on
//! the outcome (accounting for slips and guesses) and then nudged toward
//! mastery by the learning rate.

use serde::{Deserialize, Serialize};

use super::learner::LearnerState;
use super::question::Question;
use crate::error::{DrillError, Result};

/// Upper bound for any updated mastery value.
pub const MAX_MASTERY: f64 = 0.99;

/// BKT model parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BktParams {
    /// Probability of learning the component after an attempt.
    pub learn_rate: f64,
    /// Probability of answering wrong despite knowing the component.
    pub slip_rate: f64,
    /// Probability of answering right without knowing the component.
    pub guess_rate: f64,
    /// Prior mastery for components the learner has never seen.
    pub default_mastery: f64,
}

impl Default for BktParams {
    fn default() -> Self {
        Self {
            learn_rate: 0.3,
            slip_rate: 0.1,
            guess_rate: 0.2,
            default_mastery: 0.3,
        }
    }
}

impl BktParams {
    /// Check that every parameter is a probability.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("learn_rate", self.learn_rate),
            ("slip_rate", self.slip_rate),
            ("guess_rate", self.guess_rate),
            ("default_mastery", self.default_mastery),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(DrillError::config(format!(
                    "bkt.{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Update mastery `p` after one observed answer.
///
/// A zero denominator leaves the posterior at `p`. The result never exceeds
/// [`MAX_MASTERY`].
pub fn update_mastery(p: f64, correct: bool, params: &BktParams) -> f64 {
    let (numerator, denominator) = if correct {
        let known = p * (1.0 - params.slip_rate);
        (known, known + (1.0 - p) * params.guess_rate)
    } else {
        let known = p * params.slip_rate;
        (known, known + (1.0 - p) * (1.0 - params.guess_rate))
    };

    let posterior = if denominator > 0.0 {
        numerator / denominator
    } else {
        p
    };

    let learned = posterior + (1.0 - posterior) * params.learn_rate;
    learned.min(MAX_MASTERY)
}

/// Mastery change of one knowledge component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasteryChange {
    pub kc: String,
    pub before: f64,
    pub after: f64,
}

impl MasteryChange {
    pub fn delta(&self) -> f64 {
        self.after - self.before
    }
}

/// Applies BKT updates to learner state.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BktEngine {
    params: BktParams,
}

impl BktEngine {
    pub fn new(params: BktParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &BktParams {
        &self.params
    }

    pub fn default_mastery(&self) -> f64 {
        self.params.default_mastery
    }

    pub fn update(&self, p: f64, correct: bool) -> f64 {
        update_mastery(p, correct, &self.params)
    }

    /// Update every knowledge component of `question` after an answer.
    ///
    /// Components the learner has never seen start from the default mastery.
    pub fn apply(
        &self,
        state: &mut LearnerState,
        question: &Question,
        correct: bool,
    ) -> Vec<MasteryChange> {
        let mut changes = Vec::new();
        for kc in question.knowledge_components() {
            let before = state.mastery_of(kc, self.params.default_mastery);
            let after = self.update(before, correct);
            state.mastery.insert(kc.to_string(), after);
            changes.push(MasteryChange {
                kc: kc.to_string(),
                before,
                after,
            });
        }
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> BktParams {
        BktParams::default()
    }

    fn question(tags: &[&str]) -> Question {
        Question {
            id: "q1".to_string(),
            subject: "s".to_string(),
            chapter: "c".to_string(),
            question_text: "?".to_string(),
            knowledge_tags: tags.iter().map(|t| t.to_string()).collect(),
            difficulty: 0.5,
            answer: "1".to_string(),
            answer_type: Default::default(),
        }
    }

    #[test]
    fn test_correct_answer_known_value() {
        // posterior = 0.27 / (0.27 + 0.14) = 0.658536..., then + 0.341463 * 0.3
        let p = update_mastery(0.3, true, &params());
        assert!((p - 0.760_975_609_756).abs() < 1e-9, "got {}", p);
    }

    #[test]
    fn test_incorrect_answer_known_value() {
        // posterior = 0.03 / (0.03 + 0.56) = 0.050847..., then + 0.949152 * 0.3
        let p = update_mastery(0.3, false, &params());
        assert!((p - 0.335_593_220_339).abs() < 1e-9, "got {}", p);
    }

    #[test]
    fn test_clamped_at_max() {
        assert_eq!(update_mastery(0.99, true, &params()), MAX_MASTERY);
        assert_eq!(update_mastery(1.0, true, &params()), MAX_MASTERY);
    }

    #[test]
    fn test_zero_denominator_keeps_prior() {
        let degenerate = BktParams {
            learn_rate: 0.0,
            slip_rate: 0.0,
            guess_rate: 1.0,
            default_mastery: 0.3,
        };
        // p = 0 and incorrect: numerator 0, denominator (1 - 0) * (1 - 1) = 0
        assert_eq!(update_mastery(0.0, false, &degenerate), 0.0);
    }

    #[test]
    fn test_validate() {
        assert!(params().validate().is_ok());

        let bad = BktParams {
            slip_rate: 1.5,
            ..params()
        };
        let err = bad.validate().unwrap_err();
        assert!(err.to_string().contains("bkt.slip_rate"));

        let negative = BktParams {
            default_mastery: -0.1,
            ..params()
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_apply_updates_every_tag() {
        let engine = BktEngine::default();
        let mut state = LearnerState::new("alice");
        state.mastery.insert("A".to_string(), 0.5);

        let changes = engine.apply(&mut state, &question(&["A", "B"]), true);

        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].kc, "A");
        assert_eq!(changes[0].before, 0.5);
        assert_eq!(changes[1].kc, "B");
        assert_eq!(changes[1].before, 0.3);
        assert!(changes.iter().all(|c| c.delta() > 0.0));
        assert_eq!(state.mastery["A"], changes[0].after);
        assert_eq!(state.mastery["B"], changes[1].after);
    }

    #[test]
    fn test_apply_untagged_uses_default_kc() {
        let engine = BktEngine::default();
        let mut state = LearnerState::new("alice");

        let changes = engine.apply(&mut state, &question(&[]), false);

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kc, "default");
        assert!(state.mastery.contains_key("default"));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_params() -> impl Strategy<Value = BktParams> {
            (0.0f64..=1.0, 0.01f64..0.5, 0.01f64..0.5).prop_map(|(learn, slip, guess)| BktParams {
                learn_rate: learn,
                slip_rate: slip,
                guess_rate: guess,
                default_mastery: 0.3,
            })
        }

        proptest! {
            // Property: a correct answer never lands below the learning-free posterior
            #[test]
            fn prop_correct_at_least_posterior(p in 0.0f64..1.0, params in arb_params()) {
                let known = p * (1.0 - params.slip_rate);
                let posterior = known / (known + (1.0 - p) * params.guess_rate);
                let updated = update_mastery(p, true, &params);
                prop_assert!(updated >= posterior.min(MAX_MASTERY) - 1e-12);
                prop_assert!(updated <= MAX_MASTERY);
            }

            // Property: every update stays within [0, 0.99]
            #[test]
            fn prop_update_bounded(p in 0.0f64..=1.0, correct in any::<bool>(), params in arb_params()) {
                let updated = update_mastery(p, correct, &params);
                prop_assert!((0.0..=MAX_MASTERY).contains(&updated));
            }

            // Property: with default parameters a wrong answer lowers reasonable mastery
            #[test]
            fn prop_incorrect_decreases_under_defaults(p in 0.5f64..=1.0) {
                let updated = update_mastery(p, false, &BktParams::default());
                prop_assert!(updated < p);
            }

            // Property: with default parameters a right answer raises mastery below the cap
            #[test]
            fn prop_correct_increases_under_defaults(p in 0.0f64..0.98) {
                let updated = update_mastery(p, true, &BktParams::default());
                prop_assert!(updated > p);
            }
        }
    }
}
