//! Interaction events and the JSONL log writer.
//!
//! Every judged answer is appended to an append-only JSONL file
//! (`~/.drillbit/interactions.log`). The log is independent of learner
//! state: resetting a learner does not erase their interactions.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::summary::Statistics;
use crate::error::{DrillError, Result};

/// Schema version for interaction events.
///
/// Increment when the event schema changes in a breaking way.
pub const INTERACTION_SCHEMA_VERSION: u8 = 1;

/// One judged answer, as written to the log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InteractionEvent {
    /// Schema version for forward compatibility.
    pub v: u8,
    pub ts: DateTime<Utc>,
    pub learner_id: String,
    pub question_id: String,
    pub correct: bool,
}

impl InteractionEvent {
    /// Create an event with the current timestamp.
    pub fn new(learner_id: impl Into<String>, question_id: impl Into<String>, correct: bool) -> Self {
        Self::with_timestamp(learner_id, question_id, correct, Utc::now())
    }

    /// Create an event with a specific timestamp (for testing).
    pub fn with_timestamp(
        learner_id: impl Into<String>,
        question_id: impl Into<String>,
        correct: bool,
        ts: DateTime<Utc>,
    ) -> Self {
        Self {
            v: INTERACTION_SCHEMA_VERSION,
            ts,
            learner_id: learner_id.into(),
            question_id: question_id.into(),
            correct,
        }
    }
}

/// Append-only interaction log.
#[derive(Debug, Clone)]
pub struct InteractionLog {
    path: PathBuf,
}

impl InteractionLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Append an event to the log.
    pub fn append(&self, event: &InteractionEvent) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| DrillError::storage(parent, e))?;
            }
        }

        let json = serde_json::to_string(event)
            .map_err(|e| DrillError::serde(format!("failed to serialize interaction: {}", e)))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| DrillError::storage(&self.path, e))?;

        writeln!(file, "{}", json).map_err(|e| DrillError::storage(&self.path, e))?;

        Ok(())
    }

    /// Record a judged answer now.
    pub fn record(&self, learner_id: &str, question_id: &str, correct: bool) -> Result<()> {
        self.append(&InteractionEvent::new(learner_id, question_id, correct))
    }

    /// Stream the non-empty lines of the log with their 1-based line numbers.
    ///
    /// The log grows without bound, so it is never read into memory whole.
    fn for_each_line(&self, mut f: impl FnMut(usize, &str) -> Result<()>) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }

        let file = File::open(&self.path).map_err(|e| DrillError::storage(&self.path, e))?;
        for (line_num, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| DrillError::storage(&self.path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            f(line_num + 1, &line)?;
        }
        Ok(())
    }

    /// Read all events in log order.
    pub fn read_all(&self) -> Result<Vec<InteractionEvent>> {
        let mut events = Vec::new();
        self.for_each_line(|line_num, line| {

            let event: InteractionEvent = serde_json::from_str(line).map_err(|e| {
                DrillError::serde(format!(
                    "failed to parse interaction on line {}: {}",
                    line_num, e
                ))
            })?;
            events.push(event);
            Ok(())
        })?;

        Ok(events)
    }

    /// Interactions of one learner, most recent first.
    pub fn for_learner(&self, learner_id: &str, limit: Option<usize>) -> Result<Vec<InteractionEvent>> {
        let mut events: Vec<InteractionEvent> = self
            .read_all()?
            .into_iter()
            .filter(|e| e.learner_id == learner_id)
            .collect();

        // Equal timestamps end up in reverse log order.
        events.sort_by(|a, b| a.ts.cmp(&b.ts));
        events.reverse();

        if let Some(limit) = limit {
            events.truncate(limit);
        }
        Ok(events)
    }

    /// Distinct questions a learner ever answered incorrectly, in first-seen order.
    pub fn wrong_questions(&self, learner_id: &str) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|e| e.learner_id == learner_id && !e.correct)
            .filter(|e| seen.insert(e.question_id.clone()))
            .map(|e| e.question_id)
            .collect())
    }

    /// Aggregate statistics over every learner.
    pub fn statistics(&self) -> Result<Statistics> {
        Ok(Statistics::from_events(&self.read_all()?))
    }

    /// Count the number of events in the log.
    pub fn count(&self) -> Result<usize> {
        let mut count = 0;
        self.for_each_line(|_, _| {
            count += 1;
            Ok(())
        })?;
        Ok(count)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn log_in(dir: &TempDir) -> InteractionLog {
        InteractionLog::new(dir.path().join("interactions.log"))
    }

    #[test]
    fn test_event_serialization() {
        let ts = DateTime::parse_from_rfc3339("2024-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let event = InteractionEvent::with_timestamp("alice", "q1", true, ts);

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""v":1"#));
        assert!(json.contains(r#""learner_id":"alice""#));
        assert!(json.contains(r#""question_id":"q1""#));
        assert!(json.contains(r#""correct":true"#));

        let parsed: InteractionEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_append_and_read() {
        let dir = TempDir::new().unwrap();
        let log = log_in(&dir);

        log.record("alice", "q1", true).unwrap();
        log.record("bob", "q2", false).unwrap();

        let events = log.read_all().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].learner_id, "alice");
        assert_eq!(events[1].question_id, "q2");
        assert_eq!(log.count().unwrap(), 2);
    }

    #[test]
    fn test_read_missing_log_is_empty() {
        let dir = TempDir::new().unwrap();
        let log = log_in(&dir);
        assert!(log.read_all().unwrap().is_empty());
        assert_eq!(log.count().unwrap(), 0);
    }

    #[test]
    fn test_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let log = InteractionLog::new(dir.path().join("nested").join("interactions.log"));
        log.record("alice", "q1", true).unwrap();
        assert!(log.path().exists());
    }

    #[test]
    fn test_malformed_line_errors() {
        let dir = TempDir::new().unwrap();
        let log = log_in(&dir);
        log.record("alice", "q1", true).unwrap();
        fs::write(
            log.path(),
            format!("{}\nnot json\n", fs::read_to_string(log.path()).unwrap().trim()),
        )
        .unwrap();

        let err = log.read_all().unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_for_learner_most_recent_first() {
        let dir = TempDir::new().unwrap();
        let log = log_in(&dir);
        let base = Utc::now();

        for (i, qid) in ["q1", "q2", "q3"].iter().enumerate() {
            log.append(&InteractionEvent::with_timestamp(
                "alice",
                *qid,
                true,
                base + Duration::seconds(i as i64),
            ))
            .unwrap();
        }
        log.record("bob", "q9", true).unwrap();

        let events = log.for_learner("alice", None).unwrap();
        let ids: Vec<&str> = events.iter().map(|e| e.question_id.as_str()).collect();
        assert_eq!(ids, vec!["q3", "q2", "q1"]);

        let limited = log.for_learner("alice", Some(2)).unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].question_id, "q3");
    }

    #[test]
    fn test_wrong_questions_distinct() {
        let dir = TempDir::new().unwrap();
        let log = log_in(&dir);

        log.record("alice", "q2", false).unwrap();
        log.record("alice", "q1", true).unwrap();
        log.record("alice", "q3", false).unwrap();
        log.record("alice", "q2", false).unwrap();
        log.record("bob", "q4", false).unwrap();

        assert_eq!(log.wrong_questions("alice").unwrap(), vec!["q2", "q3"]);
        assert!(log.wrong_questions("carol").unwrap().is_empty());
    }

    #[test]
    fn test_statistics() {
        let dir = TempDir::new().unwrap();
        let log = log_in(&dir);

        log.record("alice", "q1", true).unwrap();
        log.record("alice", "q2", false).unwrap();
        log.record("bob", "q1", true).unwrap();
        log.record("bob", "q3", true).unwrap();

        let stats = log.statistics().unwrap();
        assert_eq!(stats.total_learners, 2);
        assert_eq!(stats.total_interactions, 4);
        assert!((stats.correct_rate - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_log_larger_than_file_limit_still_reads() {
        use crate::util::MAX_FILE_SIZE;

        let dir = TempDir::new().unwrap();
        let log = log_in(&dir);

        let line = serde_json::to_string(&InteractionEvent::new("alice", "q1", true)).unwrap();
        let repeats = (MAX_FILE_SIZE as usize / (line.len() + 1)) + 10;
        let mut content = String::with_capacity(repeats * (line.len() + 1));
        for _ in 0..repeats {
            content.push_str(&line);
            content.push('\n');
        }
        fs::write(log.path(), content).unwrap();
        log.record("alice", "q2", false).unwrap();
        assert!(fs::metadata(log.path()).unwrap().len() > MAX_FILE_SIZE);

        assert_eq!(log.count().unwrap(), repeats + 1);
        assert_eq!(log.wrong_questions("alice").unwrap(), vec!["q2"]);
        assert_eq!(log.for_learner("alice", Some(1)).unwrap()[0].question_id, "q2");
        assert_eq!(log.statistics().unwrap().total_interactions, repeats + 1);
    }
}
