//! The Pulse query/aggregation engine.
//!
//! Answers "what did member M do in window [T0, T1]?" over any
//! [`pulse_core::store::IndexStore`], with no source-specific knowledge
//! beyond `activity_type` string conventions. Everything here is read-only
//! and derived — snapshots are pure functions of the activity log at query
//! time and are never persisted.

pub mod engine;
pub mod error;
pub mod stats;

pub use engine::QueryEngine;
pub use error::{Error, Result};
pub use stats::{
  MemberReport, NotFoundReport, Snapshot, TeamSummary, Window,
  contribution_score, top_files, top_repositories,
};

#[cfg(test)]
mod tests;
