//! CLI commands for drillbit.
//!
//! This module provides CLI commands for drillbit, organized into:
//! - **Practice commands**: next, answer, progress, restart, reset
//! - **Inspection commands**: subjects, check, history, stats

// Practice commands
pub mod answer;
pub mod next;
pub mod progress;
pub mod reset;
pub mod restart;

// Inspection commands
pub mod check;
pub mod history;
pub mod stats;
pub mod subjects;

pub use answer::AnswerCommand;
pub use check::CheckCommand;
pub use history::HistoryCommand;
pub use next::NextCommand;
pub use progress::ProgressCommand;
pub use reset::ResetCommand;
pub use restart::RestartCommand;
pub use stats::StatsCommand;
pub use subjects::SubjectsCommand;

use crate::config::Config;
use crate::core::PracticeSession;
use crate::error::Result;

/// Open a practice session on `subject`, or on the configured default.
pub fn open_session(config: &Config, subject: Option<&str>) -> Result<PracticeSession> {
    match subject {
        Some(subject) => {
            let mut config = config.clone();
            config.default_subject = subject.to_string();
            PracticeSession::from_config(&config)
        }
        None => PracticeSession::from_config(config),
    }
}

/// Render a command output as pretty JSON.
pub(crate) fn to_json<T: serde::Serialize>(output: &T) -> String {
    serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
}
