//! Interaction tracking for drillbit.
//!
//! Every judged answer is appended to a JSONL event log, which is the source
//! for per-learner history, wrong-question lists and system statistics.

pub mod summary;
pub mod tracker;

pub use summary::{LearnerSummary, Statistics};
pub use tracker::{InteractionEvent, InteractionLog, INTERACTION_SCHEMA_VERSION};
