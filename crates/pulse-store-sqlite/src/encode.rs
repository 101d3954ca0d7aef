//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings in UTC, which makes
//! lexicographic comparison agree with chronological order. Metadata is
//! stored as compact JSON. UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, Utc};
use pulse_core::{activity::Activity, member::Member};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc>
// ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Metadata ────────────────────────────────────────────────────────────────

pub fn encode_metadata(value: &serde_json::Value) -> String { value.to_string() }

pub fn decode_metadata(s: &str) -> Result<serde_json::Value> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `members` row.
pub struct RawMember {
  pub member_id:  String,
  pub name:       String,
  pub email:      Option<String>,
  pub created_at: String,
}

impl RawMember {
  pub fn into_member(self) -> Result<Member> {
    Ok(Member {
      member_id:  decode_uuid(&self.member_id)?,
      name:       self.name,
      email:      self.email,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `member_activities` row.
pub struct RawActivity {
  pub activity_uuid: String,
  pub member_id:     String,
  pub source:        String,
  pub activity_type: String,
  pub timestamp:     String,
  pub metadata:      String,
  pub activity_id:   Option<String>,
  pub recorded_at:   String,
}

impl RawActivity {
  pub fn into_activity(self) -> Result<Activity> {
    Ok(Activity {
      activity_uuid: decode_uuid(&self.activity_uuid)?,
      member_id:     decode_uuid(&self.member_id)?,
      source:        self.source,
      activity_type: self.activity_type,
      timestamp:     decode_dt(&self.timestamp)?,
      metadata:      decode_metadata(&self.metadata)?,
      activity_id:   self.activity_id,
      recorded_at:   decode_dt(&self.recorded_at)?,
    })
  }
}
