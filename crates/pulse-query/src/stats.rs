//! Statistics snapshots — the derived, never-persisted read model.
//!
//! All field names here are part of the presentation contract: any output
//! formatter (prose generator, markdown report, API response) must be able
//! to round-trip them losslessly, so they never change casually.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use pulse_core::activity::{Activity, activity_type};
use serde::{Deserialize, Serialize};

// ─── Score weights ───────────────────────────────────────────────────────────

/// Contribution-score weights per activity type. A deliberate
/// simplicity/interpretability tradeoff: a plain weighted linear sum, no
/// normalization by team size, no recency decay.
const COMMIT_WEIGHT: f64 = 1.0;
const PULL_REQUEST_WEIGHT: f64 = 2.0;
const ISSUE_WEIGHT: f64 = 0.5;
const MESSAGE_WEIGHT: f64 = 0.3;
const REACTION_WEIGHT: f64 = 0.1;

/// Default ranking depths.
const TOP_REPOSITORIES: usize = 10;
const TOP_FILES: usize = 20;

// ─── Window ──────────────────────────────────────────────────────────────────

/// The inclusive time window a snapshot was computed over. Open bounds mean
/// "since the beginning" / "until now".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
  pub start: Option<DateTime<Utc>>,
  pub end:   Option<DateTime<Utc>>,
}

impl Window {
  pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
    Self { start, end }
  }
}

// ─── Per-type statistics ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitStats {
  pub total:     u64,
  pub additions: u64,
  pub deletions: u64,
  /// `additions - deletions`; negative when a window mostly removed code.
  pub net_lines: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestStats {
  pub total:  u64,
  pub open:   u64,
  pub merged: u64,
  pub closed: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueStats {
  pub total:  u64,
  pub open:   u64,
  pub closed: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageStats {
  pub total: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionStats {
  pub total: u64,
}

/// Per-type aggregates over one member's activities in a window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
  pub commits:        CommitStats,
  pub pull_requests:  PullRequestStats,
  pub issues:         IssueStats,
  pub messages:       MessageStats,
  pub reactions:      ReactionStats,
  /// Raw partition counts for every `activity_type` seen, including ones
  /// the named aggregates above don't know about.
  pub totals_by_type: BTreeMap<String, u64>,
}

// ─── Rollups ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryActivity {
  pub repository:    String,
  pub commits:       u64,
  pub pull_requests: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileActivity {
  pub filename: String,
  pub changes:  u64,
}

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// A member's aggregate view over a window — a pure function of the
/// activity log at query time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
  pub member:             String,
  pub window:             Window,
  pub statistics:         Statistics,
  pub top_repositories:   Vec<RepositoryActivity>,
  pub top_files:          Vec<FileActivity>,
  pub contribution_score: f64,
}

impl Snapshot {
  /// Aggregate `activities` (already filtered to one member and window)
  /// into a snapshot.
  pub fn compute(member: impl Into<String>, window: Window, activities: &[Activity]) -> Self {
    let mut statistics = Statistics::default();

    for activity in activities {
      *statistics
        .totals_by_type
        .entry(activity.activity_type.clone())
        .or_insert(0) += 1;

      match activity.activity_type.as_str() {
        activity_type::COMMIT => {
          statistics.commits.total += 1;
          statistics.commits.additions += metadata_u64(activity, "additions");
          statistics.commits.deletions += metadata_u64(activity, "deletions");
        }
        activity_type::PULL_REQUEST => {
          statistics.pull_requests.total += 1;
          if is_merged(activity) {
            statistics.pull_requests.merged += 1;
          } else {
            match activity.metadata["state"].as_str() {
              Some("open") => statistics.pull_requests.open += 1,
              Some("closed") => statistics.pull_requests.closed += 1,
              _ => {}
            }
          }
        }
        activity_type::ISSUE => {
          statistics.issues.total += 1;
          match activity.metadata["state"].as_str() {
            Some("open") => statistics.issues.open += 1,
            Some("closed") => statistics.issues.closed += 1,
            _ => {}
          }
        }
        activity_type::MESSAGE => statistics.messages.total += 1,
        activity_type::REACTION => statistics.reactions.total += 1,
        _ => {}
      }
    }

    statistics.commits.net_lines =
      statistics.commits.additions as i64 - statistics.commits.deletions as i64;

    let contribution_score = contribution_score(&statistics);

    Self {
      member: member.into(),
      window,
      top_repositories: top_repositories(activities, TOP_REPOSITORIES),
      top_files: top_files(activities, TOP_FILES),
      statistics,
      contribution_score,
    }
  }
}

fn metadata_u64(activity: &Activity, field: &str) -> u64 {
  activity.metadata[field].as_u64().unwrap_or(0)
}

/// A PR counts as merged on `state == "merged"` or a truthy `merged` flag
/// (GitHub reports merged PRs as closed + `merged: true`).
fn is_merged(activity: &Activity) -> bool {
  activity.metadata["state"].as_str() == Some("merged")
    || activity.metadata["merged"].as_bool() == Some(true)
}

// ─── Contribution score ──────────────────────────────────────────────────────

/// Weighted linear sum over per-type counts, rounded to 2 decimal places:
/// commits ×1.0, pull requests ×2.0, issues ×0.5, messages ×0.3,
/// reactions ×0.1.
pub fn contribution_score(statistics: &Statistics) -> f64 {
  let raw = statistics.commits.total as f64 * COMMIT_WEIGHT
    + statistics.pull_requests.total as f64 * PULL_REQUEST_WEIGHT
    + statistics.issues.total as f64 * ISSUE_WEIGHT
    + statistics.messages.total as f64 * MESSAGE_WEIGHT
    + statistics.reactions.total as f64 * REACTION_WEIGHT;
  (raw * 100.0).round() / 100.0
}

// ─── Rankings ────────────────────────────────────────────────────────────────

/// Group commit and pull-request activities by `metadata.repository`, ranked
/// by `commits + pull_requests` descending. Ties keep first-seen order.
pub fn top_repositories(activities: &[Activity], limit: usize) -> Vec<RepositoryActivity> {
  let mut rollup: Vec<RepositoryActivity> = Vec::new();
  let mut index: HashMap<String, usize> = HashMap::new();

  for activity in activities {
    let counts_commits = activity.activity_type == activity_type::COMMIT;
    let counts_prs = activity.activity_type == activity_type::PULL_REQUEST;
    if !counts_commits && !counts_prs {
      continue;
    }
    let Some(repository) = activity.metadata["repository"].as_str() else {
      continue;
    };

    let slot = *index.entry(repository.to_owned()).or_insert_with(|| {
      rollup.push(RepositoryActivity {
        repository:    repository.to_owned(),
        commits:       0,
        pull_requests: 0,
      });
      rollup.len() - 1
    });

    if counts_commits {
      rollup[slot].commits += 1;
    } else {
      rollup[slot].pull_requests += 1;
    }
  }

  // Vec::sort_by is stable, so equal totals keep first-seen order.
  rollup.sort_by(|a, b| {
    (b.commits + b.pull_requests).cmp(&(a.commits + a.pull_requests))
  });
  rollup.truncate(limit);
  rollup
}

/// Group `metadata.files[]` entries of commit activities by filename, ranked
/// by modification count descending. Entries are either plain filename
/// strings or objects with a `filename` field. Ties keep first-seen order.
pub fn top_files(activities: &[Activity], limit: usize) -> Vec<FileActivity> {
  let mut rollup: Vec<FileActivity> = Vec::new();
  let mut index: HashMap<String, usize> = HashMap::new();

  for activity in activities {
    if activity.activity_type != activity_type::COMMIT {
      continue;
    }
    let Some(files) = activity.metadata["files"].as_array() else {
      continue;
    };

    for entry in files {
      let Some(filename) = entry.as_str().or_else(|| entry["filename"].as_str())
      else {
        continue;
      };

      let slot = *index.entry(filename.to_owned()).or_insert_with(|| {
        rollup.push(FileActivity {
          filename: filename.to_owned(),
          changes:  0,
        });
        rollup.len() - 1
      });
      rollup[slot].changes += 1;
    }
  }

  rollup.sort_by(|a, b| b.changes.cmp(&a.changes));
  rollup.truncate(limit);
  rollup
}

// ─── Query results ───────────────────────────────────────────────────────────

/// Structured "member not found" result, so batch consumers can skip
/// gracefully instead of catching errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotFoundReport {
  pub member: String,
  pub error:  String,
}

impl NotFoundReport {
  pub fn new(member: impl Into<String>) -> Self {
    Self {
      member: member.into(),
      error:  "member not found".into(),
    }
  }
}

/// Either a snapshot or a structured absence — never an error for a member
/// that simply isn't there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MemberReport {
  Stats(Snapshot),
  NotFound(NotFoundReport),
}

impl MemberReport {
  pub fn snapshot(&self) -> Option<&Snapshot> {
    match self {
      Self::Stats(s) => Some(s),
      Self::NotFound(_) => None,
    }
  }
}

/// A member's raw activity feed, or a structured absence.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ActivityFeed {
  Activities(MemberActivities),
  NotFound(NotFoundReport),
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberActivities {
  pub member:     String,
  pub activities: Vec<Activity>,
}

// ─── Team views ──────────────────────────────────────────────────────────────

/// Per-member snapshots for a whole team, sorted descending by total commit
/// count; ties preserve the input member ordering. Members that could not
/// be resolved are collected in `skipped`, never aborting the batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamSummary {
  pub window:  Window,
  pub members: Vec<Snapshot>,
  pub skipped: Vec<NotFoundReport>,
}

/// One row of a contribution ranking; `rank` starts at 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedContributor {
  pub rank:               usize,
  pub member:             String,
  pub contribution_score: f64,
}
