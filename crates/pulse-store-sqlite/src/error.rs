//! Error type for `pulse-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// Attempted to update a member that was not found.
  #[error("member not found: {0}")]
  MemberNotFound(uuid::Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
