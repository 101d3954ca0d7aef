//! Error type for `pulse-sync`.
//!
//! Partial failures (one member failing to register, one activity failing to
//! resolve) never surface here — they are counted in
//! [`crate::SyncStats::errors`] and the pass continues. The only error a
//! sync propagates is systemic: the store was unreachable before any work
//! started.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The store failed its connectivity probe at sync start. Retrying the
  /// whole sync is safe — all writes are idempotent.
  #[error("store unavailable: {0}")]
  StoreUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
