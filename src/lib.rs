//! drillbit - adaptive math practice engine
//!
//! drillbit tracks per-knowledge-component mastery with Bayesian Knowledge
//! Tracing, recommends the unanswered question that targets a learner's
//! weakest components, and judges numeric, textual and algebraic answers
//! including LaTeX-flavoured input.

pub mod checker;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod stats;
pub mod storage;
pub mod util;

pub use checker::{check_answer, check_answer_detailed, normalize, AnswerChecker, Stage, Verdict};
pub use config::Config;
pub use crate::core::{
    update_mastery, AnswerOutcome, AnswerType, BktEngine, BktParams, LearnerState, MasteryChange,
    NextQuestion, PracticeSession, Progress, Question, QuestionBank, Recommender,
};
pub use error::{DrillError, Result};
pub use stats::{InteractionEvent, InteractionLog, LearnerSummary, Statistics};
pub use storage::{FileLearnerStore, LearnerStore, MemoryLearnerStore};

// CLI commands
pub use cli::{
    AnswerCommand, CheckCommand, HistoryCommand, NextCommand, ProgressCommand, ResetCommand,
    RestartCommand, StatsCommand, SubjectsCommand,
};
