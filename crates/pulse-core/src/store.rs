//! The `IndexStore` trait.
//!
//! Implemented by storage backends (e.g. `pulse-store-sqlite`). The sync
//! engine, query engine, and API depend on this abstraction, not on any
//! concrete backend.
//!
//! Ownership: the sync engine is the sole writer of members, identifiers,
//! and activities. The query engine is read-only over all three.

use std::collections::BTreeMap;
use std::future::Future;

use uuid::Uuid;

use crate::{
  activity::{Activity, ActivityQuery, AppendOutcome, NewActivity},
  member::{BindOutcome, Member, RegisterOutcome},
};

/// Abstraction over a Pulse index backend.
///
/// Writes are idempotent by construction: registering an existing name,
/// binding an existing identifier, or appending an already-seen
/// `activity_id` are all reported no-ops, never errors. Re-running a whole
/// sync against the same store is therefore safe and convergent.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait IndexStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Members ───────────────────────────────────────────────────────────

  /// Register a member by exact display name.
  ///
  /// If a member with this exact name exists it is returned unchanged
  /// ([`RegisterOutcome::Existing`]); otherwise a new row is inserted with
  /// the given email.
  fn register_member<'a>(
    &'a self,
    name: &'a str,
    email: Option<String>,
  ) -> impl Future<Output = Result<RegisterOutcome, Self::Error>> + Send + 'a;

  /// Retrieve a member by surrogate key. Returns `None` if not found.
  fn get_member(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Member>, Self::Error>> + Send + '_;

  /// Look a member up by name: exact match first, falling back to a
  /// case-insensitive match on name or email. When the fallback is
  /// ambiguous the earliest-registered member wins.
  fn find_member_by_name<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Option<Member>, Self::Error>> + Send + 'a;

  /// All members, ordered by registration time.
  fn list_members(
    &self,
  ) -> impl Future<Output = Result<Vec<Member>, Self::Error>> + Send + '_;

  /// Add or update a member's email — the only member mutation the core
  /// performs.
  fn set_member_email<'a>(
    &'a self,
    id: Uuid,
    email: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── Identifiers ───────────────────────────────────────────────────────

  /// Bind `(source, source_user_id)` to a member. First binding wins;
  /// see [`BindOutcome`].
  fn bind_identifier<'a>(
    &'a self,
    member_id: Uuid,
    source: &'a str,
    source_user_id: &'a str,
  ) -> impl Future<Output = Result<BindOutcome, Self::Error>> + Send + 'a;

  /// Point lookup of the member bound to `(source, source_user_id)`.
  fn resolve_identifier<'a>(
    &'a self,
    source: &'a str,
    source_user_id: &'a str,
  ) -> impl Future<Output = Result<Option<Uuid>, Self::Error>> + Send + 'a;

  /// All identifiers held by a member, as `source -> source_user_id`.
  fn identifiers_for(
    &self,
    member_id: Uuid,
  ) -> impl Future<Output = Result<BTreeMap<String, String>, Self::Error>> + Send + '_;

  // ── Activities — append-only writes ───────────────────────────────────

  /// Append one event. An `activity_id` collision is a silent no-op,
  /// reported as [`AppendOutcome::Duplicate`]. No update-in-place.
  fn append_activity(
    &self,
    input: NewActivity,
  ) -> impl Future<Output = Result<AppendOutcome, Self::Error>> + Send + '_;

  /// Filtered read over the activity log, descending by event timestamp.
  fn query_activities<'a>(
    &'a self,
    query: &'a ActivityQuery,
  ) -> impl Future<Output = Result<Vec<Activity>, Self::Error>> + Send + 'a;

  // ── Health ────────────────────────────────────────────────────────────

  /// Cheap connectivity probe. The sync engine calls this once at pass
  /// start so an unreachable store fails the whole sync up front instead
  /// of inflating per-record error counts.
  fn ping(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
