//! [`SyncEngine`] — one idempotent reconciliation pass per adapter batch.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use pulse_core::{
  activity::NewActivity,
  adapter::{MemberDetails, SourceAdapter},
  member::BindOutcome,
  store::IndexStore,
};

use crate::{Error, Result};

/// Observability summary returned by every sync pass.
///
/// Partial failures are counted here, never raised; see [`crate::error`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
  /// Members newly created by the member resolution pass.
  pub members_registered: usize,
  /// Activities actually inserted (duplicates are not counted).
  pub activities_added:   usize,
  /// Members that failed to register plus activities that were dropped.
  pub errors:             usize,
}

/// Reconciles adapter output into an [`IndexStore`].
///
/// Stateless beyond idempotent convergence: the engine is a function of
/// (adapter output, current store state) → (updated store state, stats).
/// One pass per source at a time; concurrent syncs of the *same* source are
/// the scheduler's problem, not the engine's.
pub struct SyncEngine<S> {
  store: S,
}

impl<S: IndexStore> SyncEngine<S> {
  pub fn new(store: S) -> Self { Self { store } }

  pub fn store(&self) -> &S { &self.store }

  /// Run one full reconciliation pass for `adapter`'s source.
  ///
  /// Member resolution first (so the activity pass can attribute events to
  /// members registered moments ago), then activity resolution. Both passes
  /// tolerate per-record failures; only an unreachable store aborts.
  pub async fn sync(
    &self,
    adapter: &(dyn SourceAdapter + Send + Sync),
  ) -> Result<SyncStats> {
    let source = adapter.source_name().to_owned();

    self
      .store
      .ping()
      .await
      .map_err(|e| Error::StoreUnavailable(Box::new(e)))?;

    let mapping = adapter.member_mapping();
    let details = adapter.member_details();

    let mut stats = SyncStats::default();

    // ── Member resolution pass ────────────────────────────────────────────
    // Maps lower-cased source user IDs to member IDs for the activity pass.
    let mut local: HashMap<String, Uuid> = HashMap::with_capacity(mapping.len());

    for (source_user_id, display_name) in &mapping {
      match self
        .reconcile_member(&source, source_user_id, display_name, details.get(display_name))
        .await
      {
        Ok((member_id, created)) => {
          if created {
            stats.members_registered += 1;
          }
          local.insert(source_user_id.to_lowercase(), member_id);
        }
        Err(e) => {
          stats.errors += 1;
          tracing::warn!(
            source = %source,
            source_user_id = %source_user_id,
            display_name = %display_name,
            error = %e,
            "member reconciliation failed; continuing"
          );
        }
      }
    }

    // ── Activity resolution pass ──────────────────────────────────────────
    for raw in adapter.extract_activities() {
      let member_id =
        match self.resolve_member(&source, &local, &raw.member_identifier).await {
          Ok(Some(id)) => id,
          Ok(None) => {
            stats.errors += 1;
            tracing::warn!(
              source = %source,
              member_identifier = %raw.member_identifier,
              activity_type = %raw.activity_type,
              "dropping activity with unresolvable member"
            );
            continue;
          }
          Err(e) => {
            stats.errors += 1;
            tracing::warn!(
              source = %source,
              member_identifier = %raw.member_identifier,
              error = %e,
              "dropping activity after store lookup failure"
            );
            continue;
          }
        };

      let input = NewActivity {
        member_id,
        source: source.clone(),
        activity_type: raw.activity_type,
        timestamp: raw.timestamp,
        metadata: raw.metadata,
        activity_id: raw.activity_id,
      };

      match self.store.append_activity(input).await {
        Ok(outcome) if outcome.was_inserted() => stats.activities_added += 1,
        Ok(_) => {} // already seen; idempotent no-op
        Err(e) => {
          stats.errors += 1;
          tracing::warn!(source = %source, error = %e, "activity append failed");
        }
      }
    }

    tracing::info!(
      source = %source,
      members_registered = stats.members_registered,
      activities_added = stats.activities_added,
      errors = stats.errors,
      "sync pass complete"
    );

    Ok(stats)
  }

  /// Ensure one mapping entry has a member and a bound identifier.
  ///
  /// Returns the member ID and whether a new member was created. The
  /// identifier bound is the case-preserved original from the details map,
  /// falling back to the (possibly lower-cased) mapping key.
  async fn reconcile_member(
    &self,
    source: &str,
    source_user_id: &str,
    display_name: &str,
    details: Option<&MemberDetails>,
  ) -> Result<(Uuid, bool), S::Error> {
    let (member, created) = match self.store.find_member_by_name(display_name).await? {
      Some(m) => (m, false),
      None => {
        let email = details.and_then(|d| d.email.clone());
        let outcome = self.store.register_member(display_name, email).await?;
        let created = outcome.was_created();
        (outcome.into_member(), created)
      }
    };

    let bind_id = details
      .and_then(|d| d.source_id.as_deref())
      .unwrap_or(source_user_id);

    if let BindOutcome::ConflictIgnored { bound_to } = self
      .store
      .bind_identifier(member.member_id, source, bind_id)
      .await?
    {
      tracing::warn!(
        source = %source,
        source_user_id = %bind_id,
        member = %member.name,
        bound_to = %bound_to,
        "identifier already bound to another member; keeping first binding"
      );
    }

    Ok((member.member_id, created))
  }

  /// Resolve a raw activity's member, trying in order: the in-memory map
  /// from the mapping pass (lower-cased key), a store identifier lookup,
  /// and finally a display-name lookup.
  async fn resolve_member(
    &self,
    source: &str,
    local: &HashMap<String, Uuid>,
    identifier: &str,
  ) -> Result<Option<Uuid>, S::Error> {
    if let Some(id) = local.get(&identifier.to_lowercase()) {
      return Ok(Some(*id));
    }

    if let Some(id) = self.store.resolve_identifier(source, identifier).await? {
      return Ok(Some(id));
    }

    Ok(
      self
        .store
        .find_member_by_name(identifier)
        .await?
        .map(|m| m.member_id),
    )
  }
}
