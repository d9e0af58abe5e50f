//! Practice session context.
//!
//! A session owns the active subject and its question pool together with
//! the engines that act on a learner's state. Exactly one pool is active per
//! session; switching subjects replaces it. The learner state itself is
//! passed in by the caller for every call and never retained.

use std::collections::{BTreeMap, HashSet};

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::bkt::{BktEngine, MasteryChange};
use super::learner::LearnerState;
use super::question::{Question, QuestionBank};
use super::recommend::Recommender;
use crate::checker::{AnswerChecker, Stage};
use crate::config::Config;
use crate::error::{DrillError, Result};

/// What to serve next.
#[derive(Debug, Clone, PartialEq)]
pub enum NextQuestion {
    /// A recommended question.
    Question(Question),
    /// Unanswered questions remain, but all of them are mastered.
    AllMastered,
    /// Every question of the subject has been answered this round.
    Exhausted,
}

/// Result of submitting an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerOutcome {
    pub question_id: String,
    pub correct: bool,
    /// Which check decided the verdict.
    pub stage: Stage,
    pub reference_answer: String,
    pub changes: Vec<MasteryChange>,
}

/// Progress of a learner within the active subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub subject: String,
    /// Questions of this subject answered this round.
    pub answered: usize,
    /// Questions of this subject answered correctly this round.
    pub correct: usize,
    pub total: usize,
    /// `correct / answered`, or 0 when nothing was answered.
    pub accuracy: f64,
    pub mastery: BTreeMap<String, f64>,
}

/// Active subject, pool and engines for one learner session.
#[derive(Debug, Clone)]
pub struct PracticeSession<R: Rng = ChaCha8Rng> {
    bank: QuestionBank,
    engine: BktEngine,
    checker: AnswerChecker,
    recommender: Recommender<R>,
}

impl PracticeSession<ChaCha8Rng> {
    /// Build a session on the configured default subject.
    pub fn from_config(config: &Config) -> Result<Self> {
        let bank = load_subject(&config.default_subject, config)?;
        Ok(Self::new(
            bank,
            BktEngine::new(config.bkt),
            AnswerChecker::new(config.checker.clone()),
            Recommender::from_config(config.recommender.clone(), config.bkt.default_mastery),
        ))
    }
}

impl<R: Rng> PracticeSession<R> {
    pub fn new(
        bank: QuestionBank,
        engine: BktEngine,
        checker: AnswerChecker,
        recommender: Recommender<R>,
    ) -> Self {
        Self {
            bank,
            engine,
            checker,
            recommender,
        }
    }

    pub fn subject(&self) -> &str {
        &self.bank.subject
    }

    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    /// Make `subject` the active pool.
    ///
    /// Fails with `UnknownSubject` if the subject has no configured bank;
    /// the current pool stays active in that case.
    pub fn switch_subject(&mut self, subject: &str, config: &Config) -> Result<()> {
        self.bank = load_subject(subject, config)?;
        tracing::info!(
            "switched to subject '{}' ({} questions)",
            subject,
            self.bank.len()
        );
        Ok(())
    }

    /// Recommend the next question of the active subject.
    ///
    /// May materialize knowledge components in `state.mastery`.
    pub fn next_question(&mut self, state: &mut LearnerState) -> NextQuestion {
        let subject_ids = self.bank.ids();
        let available: HashSet<String> = subject_ids
            .iter()
            .filter(|id| !state.answered.contains(*id))
            .cloned()
            .collect();

        if let Some(question) =
            self.recommender
                .recommend(state, &self.bank.questions, Some(&available))
        {
            return NextQuestion::Question(question.clone());
        }

        let answered_here = subject_ids.len() - available.len();
        if answered_here < self.bank.len() {
            NextQuestion::AllMastered
        } else {
            NextQuestion::Exhausted
        }
    }

    /// Judge an answer and apply it to the learner's state.
    ///
    /// Records the answer in the history, marks the question answered and
    /// updates mastery of every knowledge component of the question.
    pub fn submit(
        &self,
        state: &mut LearnerState,
        question_id: &str,
        answer: &str,
    ) -> Result<AnswerOutcome> {
        let question = self
            .bank
            .get(question_id)
            .ok_or_else(|| DrillError::question_not_found(question_id))?;

        let answer = answer.trim();
        let verdict = self.checker.check_question(question, answer);

        state.record(question_id, answer, verdict.correct);
        let changes = self.engine.apply(state, question, verdict.correct);

        tracing::info!(
            "learner '{}' answered '{}': correct={} stage={}",
            state.id,
            question_id,
            verdict.correct,
            verdict.stage
        );

        Ok(AnswerOutcome {
            question_id: question_id.to_string(),
            correct: verdict.correct,
            stage: verdict.stage,
            reference_answer: question.answer.clone(),
            changes,
        })
    }

    /// Start a new round, keeping mastery.
    pub fn restart_round(&self, state: &mut LearnerState) {
        state.restart_round();
        tracing::info!("learner '{}' restarted the round", state.id);
    }

    /// Progress of `state` within the active subject.
    pub fn progress(&self, state: &LearnerState) -> Progress {
        let ids = self.bank.ids();
        let answered = ids.iter().filter(|id| state.answered.contains(*id)).count();
        let correct = ids
            .iter()
            .filter(|id| state.correct_this_round.contains(*id))
            .count();
        let accuracy = if answered == 0 {
            0.0
        } else {
            correct as f64 / answered as f64
        };

        Progress {
            subject: self.bank.subject.clone(),
            answered,
            correct,
            total: self.bank.len(),
            accuracy,
            mastery: state.mastery.clone(),
        }
    }
}

/// Load the question bank of a configured subject.
fn load_subject(subject: &str, config: &Config) -> Result<QuestionBank> {
    let path = config
        .question_bank_path(subject)
        .ok_or_else(|| DrillError::unknown_subject(subject))?;
    QuestionBank::load(subject, &path)
}
