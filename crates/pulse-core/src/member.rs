//! Member — the canonical person identity, and the source identifiers
//! bound to it.
//!
//! A member is a thin envelope: a stable surrogate key, a unique display
//! name, and an optional email. Everything a member *did* lives in the
//! activity log and is attributed via identifiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Canonical identity for one person across all sources.
///
/// `name` is the primary display key and is unique store-wide. Members are
/// never deleted by the core; the only mutation after creation is the email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
  pub member_id:  Uuid,
  pub name:       String,
  pub email:      Option<String>,
  pub created_at: DateTime<Utc>,
}

/// A source-specific user ID bound to exactly one member.
///
/// `(source, source_user_id)` is globally unique. Identifiers are never
/// updated in place — rebinding requires deleting and reinserting, which the
/// core never does.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identifier {
  pub member_id:      Uuid,
  pub source:         String,
  pub source_user_id: String,
  pub recorded_at:    DateTime<Utc>,
}

/// Result of [`crate::store::IndexStore::register_member`].
#[derive(Debug, Clone)]
pub enum RegisterOutcome {
  /// No member with this exact name existed; a new row was inserted.
  Created(Member),
  /// A member with this exact name already existed; returned unchanged.
  Existing(Member),
}

impl RegisterOutcome {
  pub fn member(&self) -> &Member {
    match self {
      Self::Created(m) | Self::Existing(m) => m,
    }
  }

  pub fn into_member(self) -> Member {
    match self {
      Self::Created(m) | Self::Existing(m) => m,
    }
  }

  pub fn was_created(&self) -> bool { matches!(self, Self::Created(_)) }
}

/// Result of [`crate::store::IndexStore::bind_identifier`].
///
/// First binding wins: a conflicting bind for a `(source, source_user_id)`
/// already held by a *different* member is ignored, not raised. Callers that
/// care (the sync engine) log the conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindOutcome {
  /// The triple was inserted.
  Bound,
  /// The identical triple already existed — idempotent no-op.
  AlreadyBound,
  /// `(source, source_user_id)` is already bound to another member; the
  /// existing binding is kept.
  ConflictIgnored { bound_to: Uuid },
}
