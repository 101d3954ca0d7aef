//! The contract every source connector must satisfy to feed the index.
//!
//! An adapter authenticates against its SaaS API elsewhere, collects raw
//! records for a date window, and then exposes the three pure accessors
//! below over the collected data. The sync engine consumes exactly this
//! surface and nothing else — it never touches a network.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-member details keyed by display name in
/// [`SourceAdapter::member_details`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemberDetails {
  pub email:     Option<String>,
  /// The source-specific user ID with its original casing preserved (member
  /// mapping keys are commonly lower-cased by adapters).
  pub source_id: Option<String>,
}

/// One raw event as produced by an adapter, not yet attributed to a member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawActivity {
  /// Matches a key of the member mapping, case-insensitively.
  pub member_identifier: String,
  pub activity_type:     String,
  pub timestamp:         DateTime<Utc>,
  #[serde(default)]
  pub metadata:          serde_json::Value,
  /// Source-derived natural key used for deduplication.
  #[serde(default)]
  pub activity_id:       Option<String>,
}

/// A source connector's output, ready for one sync pass.
///
/// Implementations are pure accessors over already-collected data; any
/// network or pagination work happens before this trait is handed to the
/// sync engine.
pub trait SourceAdapter {
  /// The source this adapter feeds, e.g. `"github"` or `"slack"`.
  fn source_name(&self) -> &str;

  /// `source_user_id -> member display name`. Lower-cased keys are
  /// recommended so case-insensitive source IDs normalise consistently.
  fn member_mapping(&self) -> BTreeMap<String, String>;

  /// `member display name -> details`, including the case-preserved
  /// original source ID.
  fn member_details(&self) -> BTreeMap<String, MemberDetails>;

  /// The raw events collected for the sync window.
  fn extract_activities(&self) -> Vec<RawActivity>;
}

// ─── Batch form ──────────────────────────────────────────────────────────────

/// The serialized form of one adapter's output — the canonical in-memory
/// shape of the contract, and the wire format connectors dump for replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceBatch {
  pub source:         String,
  #[serde(default)]
  pub member_mapping: BTreeMap<String, String>,
  #[serde(default)]
  pub member_details: BTreeMap<String, MemberDetails>,
  #[serde(default)]
  pub activities:     Vec<RawActivity>,
}

impl SourceBatch {
  /// Parse a batch from its JSON document form.
  pub fn from_json(raw: &str) -> crate::Result<Self> {
    Ok(serde_json::from_str(raw)?)
  }
}

impl SourceAdapter for SourceBatch {
  fn source_name(&self) -> &str { &self.source }

  fn member_mapping(&self) -> BTreeMap<String, String> {
    self.member_mapping.clone()
  }

  fn member_details(&self) -> BTreeMap<String, MemberDetails> {
    self.member_details.clone()
  }

  fn extract_activities(&self) -> Vec<RawActivity> { self.activities.clone() }
}

// ─── Registry ────────────────────────────────────────────────────────────────

/// Constructor for one adapter instance.
pub type AdapterFactory =
  Box<dyn Fn() -> Box<dyn SourceAdapter + Send + Sync> + Send + Sync>;

/// Explicit static registry of source adapters, assembled once at startup.
///
/// Pluggable sources without runtime discovery: callers register a factory
/// per source name and look adapters up by name when a sync is scheduled.
#[derive(Default)]
pub struct AdapterRegistry {
  factories: BTreeMap<String, AdapterFactory>,
}

impl AdapterRegistry {
  pub fn new() -> Self { Self::default() }

  /// Register a factory under `source`. A later registration for the same
  /// name replaces the earlier one.
  pub fn register(&mut self, source: impl Into<String>, factory: AdapterFactory) {
    self.factories.insert(source.into(), factory);
  }

  /// Construct the adapter registered under `source`, if any.
  pub fn build(&self, source: &str) -> Option<Box<dyn SourceAdapter + Send + Sync>> {
    self.factories.get(source).map(|f| f())
  }

  /// Registered source names, in lexical order.
  pub fn names(&self) -> Vec<&str> {
    self.factories.keys().map(String::as_str).collect()
  }

  pub fn is_empty(&self) -> bool { self.factories.is_empty() }
}
