//! Error type for `pulse-query`.
//!
//! Expected absences (unknown member, empty window) are structured results,
//! not errors — see [`crate::stats::MemberReport`]. Only backend failures
//! surface here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn store<E: std::error::Error + Send + Sync + 'static>(e: E) -> Self {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
