//! [`SqliteStore`] — the SQLite implementation of [`IndexStore`].

use std::collections::BTreeMap;
use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use pulse_core::{
  activity::{Activity, ActivityQuery, AppendOutcome, NewActivity},
  member::{BindOutcome, Member, RegisterOutcome},
  store::IndexStore,
};

use crate::{
  Error, Result,
  encode::{RawActivity, RawMember, decode_uuid, encode_dt, encode_metadata, encode_uuid},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Pulse index store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

fn member_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawMember> {
  Ok(RawMember {
    member_id:  row.get(0)?,
    name:       row.get(1)?,
    email:      row.get(2)?,
    created_at: row.get(3)?,
  })
}

fn activity_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawActivity> {
  Ok(RawActivity {
    activity_uuid: row.get(0)?,
    member_id:     row.get(1)?,
    source:        row.get(2)?,
    activity_type: row.get(3)?,
    timestamp:     row.get(4)?,
    metadata:      row.get(5)?,
    activity_id:   row.get(6)?,
    recorded_at:   row.get(7)?,
  })
}

const MEMBER_COLUMNS: &str = "member_id, name, email, created_at";
const ACTIVITY_COLUMNS: &str = "activity_uuid, member_id, source, \
                                activity_type, timestamp, metadata, \
                                activity_id, recorded_at";

// ─── IndexStore impl ─────────────────────────────────────────────────────────

impl IndexStore for SqliteStore {
  type Error = Error;

  // ── Members ───────────────────────────────────────────────────────────────

  async fn register_member(
    &self,
    name: &str,
    email: Option<String>,
  ) -> Result<RegisterOutcome> {
    let candidate = Member {
      member_id: Uuid::new_v4(),
      name: name.to_owned(),
      email,
      created_at: Utc::now(),
    };

    let name_owned = candidate.name.clone();
    let id_str     = encode_uuid(candidate.member_id);
    let at_str     = encode_dt(candidate.created_at);
    let email_col  = candidate.email.clone();

    let (raw, created): (RawMember, bool) = self
      .conn
      .call(move |conn| {
        let existing = conn
          .query_row(
            &format!("SELECT {MEMBER_COLUMNS} FROM members WHERE name = ?1"),
            rusqlite::params![name_owned],
            member_from_row,
          )
          .optional()?;

        if let Some(raw) = existing {
          return Ok((raw, false));
        }

        conn.execute(
          "INSERT INTO members (member_id, name, email, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, name_owned, email_col, at_str],
        )?;

        Ok((
          RawMember {
            member_id:  id_str,
            name:       name_owned,
            email:      email_col,
            created_at: at_str,
          },
          true,
        ))
      })
      .await?;

    let member = raw.into_member()?;
    Ok(if created {
      RegisterOutcome::Created(member)
    } else {
      RegisterOutcome::Existing(member)
    })
  }

  async fn get_member(&self, id: Uuid) -> Result<Option<Member>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawMember> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {MEMBER_COLUMNS} FROM members WHERE member_id = ?1"),
              rusqlite::params![id_str],
              member_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawMember::into_member).transpose()
  }

  async fn find_member_by_name(&self, name: &str) -> Result<Option<Member>> {
    let name_owned = name.to_owned();

    let raw: Option<RawMember> = self
      .conn
      .call(move |conn| {
        // Exact match first.
        let exact = conn
          .query_row(
            &format!("SELECT {MEMBER_COLUMNS} FROM members WHERE name = ?1"),
            rusqlite::params![name_owned],
            member_from_row,
          )
          .optional()?;

        if exact.is_some() {
          return Ok(exact);
        }

        // Case-insensitive fallback on name or email. On ambiguity the
        // earliest-registered member wins.
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {MEMBER_COLUMNS} FROM members
                 WHERE lower(name) = lower(?1) OR lower(email) = lower(?1)
                 ORDER BY rowid
                 LIMIT 1"
              ),
              rusqlite::params![name_owned],
              member_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawMember::into_member).transpose()
  }

  async fn list_members(&self) -> Result<Vec<Member>> {
    let raws: Vec<RawMember> = self
      .conn
      .call(|conn| {
        let mut stmt = conn
          .prepare(&format!("SELECT {MEMBER_COLUMNS} FROM members ORDER BY rowid"))?;
        let rows = stmt
          .query_map([], member_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMember::into_member).collect()
  }

  async fn set_member_email(&self, id: Uuid, email: &str) -> Result<()> {
    let id_str      = encode_uuid(id);
    let email_owned = email.to_owned();

    let changed: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE members SET email = ?1 WHERE member_id = ?2",
          rusqlite::params![email_owned, id_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::MemberNotFound(id));
    }
    Ok(())
  }

  // ── Identifiers ───────────────────────────────────────────────────────────

  async fn bind_identifier(
    &self,
    member_id: Uuid,
    source: &str,
    source_user_id: &str,
  ) -> Result<BindOutcome> {
    let member_id_str = encode_uuid(member_id);
    let source_owned  = source.to_owned();
    let user_id_owned = source_user_id.to_owned();
    let at_str        = encode_dt(Utc::now());

    // First binding wins: an existing row for (source, source_user_id) is
    // never touched, whoever it points to.
    let existing: Option<String> = self
      .conn
      .call(move |conn| {
        let bound: Option<String> = conn
          .query_row(
            "SELECT member_id FROM member_identifiers
             WHERE source = ?1 AND source_user_id = ?2",
            rusqlite::params![source_owned, user_id_owned],
            |r| r.get(0),
          )
          .optional()?;

        if bound.is_none() {
          conn.execute(
            "INSERT INTO member_identifiers (member_id, source, source_user_id, recorded_at)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![member_id_str, source_owned, user_id_owned, at_str],
          )?;
        }

        Ok(bound)
      })
      .await?;

    match existing {
      None => Ok(BindOutcome::Bound),
      Some(bound_str) => {
        let bound_to = decode_uuid(&bound_str)?;
        if bound_to == member_id {
          Ok(BindOutcome::AlreadyBound)
        } else {
          Ok(BindOutcome::ConflictIgnored { bound_to })
        }
      }
    }
  }

  async fn resolve_identifier(
    &self,
    source: &str,
    source_user_id: &str,
  ) -> Result<Option<Uuid>> {
    let source_owned  = source.to_owned();
    let user_id_owned = source_user_id.to_owned();

    let raw: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT member_id FROM member_identifiers
               WHERE source = ?1 AND source_user_id = ?2",
              rusqlite::params![source_owned, user_id_owned],
              |r| r.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    raw.as_deref().map(decode_uuid).transpose()
  }

  async fn identifiers_for(
    &self,
    member_id: Uuid,
  ) -> Result<BTreeMap<String, String>> {
    let id_str = encode_uuid(member_id);

    let rows: Vec<(String, String)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT source, source_user_id FROM member_identifiers
           WHERE member_id = ?1
           ORDER BY rowid",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |r| Ok((r.get(0)?, r.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    // The model permits two identifiers in the same source; the earliest
    // binding is the one reported.
    let mut map = BTreeMap::new();
    for (source, user_id) in rows {
      map.entry(source).or_insert(user_id);
    }
    Ok(map)
  }

  // ── Activities — append-only writes ───────────────────────────────────────

  async fn append_activity(&self, input: NewActivity) -> Result<AppendOutcome> {
    let activity = Activity {
      activity_uuid: Uuid::new_v4(),
      member_id:     input.member_id,
      source:        input.source,
      activity_type: input.activity_type,
      timestamp:     input.timestamp,
      metadata:      input.metadata,
      activity_id:   input.activity_id,
      recorded_at:   Utc::now(),
    };

    let uuid_str      = encode_uuid(activity.activity_uuid);
    let member_id_str = encode_uuid(activity.member_id);
    let source        = activity.source.clone();
    let activity_type = activity.activity_type.clone();
    let timestamp_str = encode_dt(activity.timestamp);
    let metadata_str  = encode_metadata(&activity.metadata);
    let natural_key   = activity.activity_id.clone();
    let recorded_str  = encode_dt(activity.recorded_at);

    let inserted: bool = self
      .conn
      .call(move |conn| {
        if let Some(key) = natural_key.as_deref() {
          let seen: bool = conn
            .query_row(
              "SELECT 1 FROM member_activities WHERE activity_id = ?1",
              rusqlite::params![key],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);

          if seen {
            return Ok(false);
          }
        }

        conn.execute(
          "INSERT INTO member_activities (
             activity_uuid, member_id, source, activity_type,
             timestamp, metadata, activity_id, recorded_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            uuid_str,
            member_id_str,
            source,
            activity_type,
            timestamp_str,
            metadata_str,
            natural_key,
            recorded_str,
          ],
        )?;
        Ok(true)
      })
      .await?;

    Ok(if inserted {
      AppendOutcome::Inserted(activity)
    } else {
      AppendOutcome::Duplicate
    })
  }

  async fn query_activities(&self, query: &ActivityQuery) -> Result<Vec<Activity>> {
    let member_id_str = query.member_id.map(encode_uuid);
    let source_owned  = query.source.clone();
    let since_str     = query.since.map(encode_dt);
    let until_str     = query.until.map(encode_dt);
    // LIMIT -1 means "no limit" to SQLite.
    let limit_val     = query.limit.map(|l| l as i64).unwrap_or(-1);

    let raws: Vec<RawActivity> = self
      .conn
      .call(move |conn| {
        // Build WHERE clause dynamically; placeholders keep fixed positions.
        let mut conds: Vec<&'static str> = vec![];
        if member_id_str.is_some() {
          conds.push("member_id = ?1");
        }
        if source_owned.is_some() {
          conds.push("source = ?2");
        }
        if since_str.is_some() {
          conds.push("timestamp >= ?3");
        }
        if until_str.is_some() {
          conds.push("timestamp <= ?4");
        }

        let where_clause = if conds.is_empty() {
          String::new()
        } else {
          format!("WHERE {}", conds.join(" AND "))
        };

        let sql = format!(
          "SELECT {ACTIVITY_COLUMNS}
           FROM member_activities
           {where_clause}
           ORDER BY timestamp DESC
           LIMIT ?5"
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![
              member_id_str.as_deref(),
              source_owned.as_deref(),
              since_str.as_deref(),
              until_str.as_deref(),
              limit_val,
            ],
            activity_from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawActivity::into_activity).collect()
  }

  // ── Health ────────────────────────────────────────────────────────────────

  async fn ping(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
