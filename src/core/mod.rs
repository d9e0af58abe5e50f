//! Core types and logic for drillbit.
//!
//! This module contains the mastery model, learner state, questions, the
//! recommender and the practice session that ties them together.

pub mod bkt;
pub mod learner;
pub mod question;
pub mod recommend;
pub mod session;

pub use bkt::{update_mastery, BktEngine, BktParams, MasteryChange, MAX_MASTERY};
pub use learner::{HistoryEntry, LearnerState};
pub use question::{AnswerType, Question, QuestionBank, DEFAULT_KC};
pub use recommend::{Recommendation, Recommender, RecommenderConfig, ScoredQuestion};
pub use session::{AnswerOutcome, NextQuestion, PracticeSession, Progress};
