//! Unified error types for drillbit with a fail-open philosophy.
//!
//! The practice core never fails: malformed answers are judged incorrect and
//! degenerate arithmetic falls back to the prior value. Errors only come from
//! the caller-side plumbing (stores, logs, config, question banks). Side
//! effects that are not needed to serve the next question, such as appending
//! to the interaction log, are handled fail-open: we log a warning and move
//! on rather than losing the learner's answer.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for drillbit operations.
#[derive(Error, Debug)]
pub enum DrillError {
    /// I/O errors from learner files, logs or question banks.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON or TOML parsing/serialization errors.
    #[error("serialization error: {message}")]
    Serde { message: String },

    /// Configuration loading errors.
    #[error("config error: {message}")]
    Config { message: String },

    /// The requested subject has no configured question bank.
    #[error("unknown subject: {subject}")]
    UnknownSubject { subject: String },

    /// The answered question is not part of the active pool.
    #[error("question not found: {question_id}")]
    QuestionNotFound { question_id: String },

    /// A learner id that cannot be used as a storage key.
    #[error("invalid learner id '{learner_id}': {reason}")]
    InvalidLearnerId { learner_id: String, reason: String },

    /// A question bank file exists but cannot be used.
    #[error("question bank error: {message}")]
    QuestionBank { message: String },
}

/// A specialized Result type for drillbit operations.
pub type Result<T> = std::result::Result<T, DrillError>;

impl DrillError {
    /// Create a storage error from an I/O error.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create a serialization error.
    pub fn serde(message: impl Into<String>) -> Self {
        Self::Serde {
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an unknown subject error.
    pub fn unknown_subject(subject: impl Into<String>) -> Self {
        Self::UnknownSubject {
            subject: subject.into(),
        }
    }

    /// Create a question not found error.
    pub fn question_not_found(question_id: impl Into<String>) -> Self {
        Self::QuestionNotFound {
            question_id: question_id.into(),
        }
    }

    /// Create an invalid learner id error.
    pub fn invalid_learner_id(learner_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidLearnerId {
            learner_id: learner_id.into(),
            reason: reason.into(),
        }
    }

    /// Create a question bank error.
    pub fn question_bank(message: impl Into<String>) -> Self {
        Self::QuestionBank {
            message: message.into(),
        }
    }

    /// Whether the error was caused by user input rather than infrastructure.
    ///
    /// The CLI uses this to choose between a plain message and a warning.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownSubject { .. }
                | Self::QuestionNotFound { .. }
                | Self::InvalidLearnerId { .. }
        )
    }
}

impl From<io::Error> for DrillError {
    fn from(err: io::Error) -> Self {
        Self::Storage {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for DrillError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}

/// Trait for fail-open error handling.
///
/// Log the error and return a safe default instead of propagating it.
pub trait FailOpen<T> {
    /// Handle an error by logging a warning and returning the default value.
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default;

    /// Handle an error by logging a warning and returning the provided fallback.
    fn fail_open_with(self, context: &str, fallback: T) -> T;
}

impl<T> FailOpen<T> for Result<T> {
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default,
    {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using default)", context, err);
                T::default()
            }
        }
    }

    fn fail_open_with(self, context: &str, fallback: T) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using fallback)", context, err);
                fallback
            }
        }
    }
}

/// Exit codes for the drillbit CLI.
pub mod exit_codes {
    /// Command succeeded (and a submitted answer was correct).
    pub const OK: i32 = 0;

    /// A submitted answer was judged incorrect.
    pub const INCORRECT: i32 = 1;

    /// The command failed.
    pub const ERROR: i32 = 2;
}
