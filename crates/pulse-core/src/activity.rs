//! Activity — the fundamental unit of the Pulse index.
//!
//! An activity is one immutable event attributed to a member: a commit, a
//! pull request, a chat message. Activities are append-only; a full resync
//! re-inserts with the same natural key and is ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Well-known `activity_type` discriminants.
///
/// The column is free-form — adapters may invent new types at any time — but
/// scoring and statistics only recognise the names below. Conventions for
/// the metadata payload per type:
///
/// | type           | metadata fields                                          |
/// |----------------|----------------------------------------------------------|
/// | `commit`       | `repository`, `sha`, `message`, `additions`, `deletions`, `files[]` |
/// | `pull_request` | `repository`, `number`, `title`, `state` (`open`\|`merged`\|`closed`), `merged` |
/// | `issue`        | `repository`, `number`, `title`, `state` (`open`\|`closed`) |
/// | `message`      | `channel`, `text`                                        |
/// | `reaction`     | `channel`, `emoji`                                       |
/// | `document_edit`| `document`, `title`                                      |
/// | `meeting`      | `title`, `duration_minutes`                              |
///
/// `files[]` entries are either plain filename strings or objects with a
/// `filename` field (plus optional `additions`/`deletions`).
pub mod activity_type {
  pub const COMMIT: &str = "commit";
  pub const PULL_REQUEST: &str = "pull_request";
  pub const ISSUE: &str = "issue";
  pub const MESSAGE: &str = "message";
  pub const REACTION: &str = "reaction";
  pub const DOCUMENT_EDIT: &str = "document_edit";
  pub const MEETING: &str = "meeting";
}

/// An immutable event record. Once written, no field is ever updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
  pub activity_uuid: Uuid,
  /// The member this event is attributed to.
  pub member_id:     Uuid,
  pub source:        String,
  pub activity_type: String,
  /// Event time — when it happened at the source, not when it was ingested.
  pub timestamp:     DateTime<Utc>,
  /// Open structured payload; which fields are meaningful is determined by
  /// `activity_type`.
  pub metadata:      serde_json::Value,
  /// Source-derived natural key (e.g. `github:commit:<sha>`), unique when
  /// present. Absent means the adapter opted out of deduplication.
  pub activity_id:   Option<String>,
  /// Server-assigned ingestion timestamp; never changes after creation.
  pub recorded_at:   DateTime<Utc>,
}

/// Input to [`crate::store::IndexStore::append_activity`].
/// `activity_uuid` and `recorded_at` are always set by the store.
#[derive(Debug, Clone)]
pub struct NewActivity {
  pub member_id:     Uuid,
  pub source:        String,
  pub activity_type: String,
  pub timestamp:     DateTime<Utc>,
  pub metadata:      serde_json::Value,
  pub activity_id:   Option<String>,
}

impl NewActivity {
  /// Convenience constructor with an empty metadata object and no natural
  /// key.
  pub fn new(
    member_id: Uuid,
    source: impl Into<String>,
    activity_type: impl Into<String>,
    timestamp: DateTime<Utc>,
  ) -> Self {
    Self {
      member_id,
      source: source.into(),
      activity_type: activity_type.into(),
      timestamp,
      metadata: serde_json::Value::Object(Default::default()),
      activity_id: None,
    }
  }
}

/// Result of [`crate::store::IndexStore::append_activity`].
#[derive(Debug, Clone)]
pub enum AppendOutcome {
  /// The event was inserted.
  Inserted(Activity),
  /// An activity with the same `activity_id` already exists — idempotent
  /// no-op.
  Duplicate,
}

impl AppendOutcome {
  pub fn was_inserted(&self) -> bool { matches!(self, Self::Inserted(_)) }
}

/// Parameters for [`crate::store::IndexStore::query_activities`].
///
/// All filters are optional and compose with AND semantics. Results are
/// ordered descending by event timestamp.
#[derive(Debug, Clone, Default)]
pub struct ActivityQuery {
  pub member_id: Option<Uuid>,
  pub source:    Option<String>,
  /// Inclusive lower bound on event time.
  pub since:     Option<DateTime<Utc>>,
  /// Inclusive upper bound on event time.
  pub until:     Option<DateTime<Utc>>,
  pub limit:     Option<usize>,
}
