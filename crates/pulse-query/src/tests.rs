//! Aggregation tests: pure snapshot math plus engine tests against an
//! in-memory store.

use chrono::{DateTime, TimeZone, Utc};
use pulse_core::{
  activity::{Activity, NewActivity, activity_type},
  store::IndexStore,
};
use pulse_store_sqlite::SqliteStore;
use serde_json::json;
use uuid::Uuid;

use crate::{
  QueryEngine, Snapshot, Window, contribution_score,
  stats::{ActivityFeed, Statistics},
  top_files, top_repositories,
};

fn ts(day: u32) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap()
}

fn act(activity_type: &str, metadata: serde_json::Value) -> Activity {
  Activity {
    activity_uuid: Uuid::new_v4(),
    member_id: Uuid::new_v4(),
    source: "github".into(),
    activity_type: activity_type.into(),
    timestamp: ts(14),
    metadata,
    activity_id: None,
    recorded_at: ts(14),
  }
}

// ─── Contribution score ──────────────────────────────────────────────────────

#[test]
fn score_is_deterministic() {
  let mut statistics = Statistics::default();
  statistics.commits.total = 2;
  statistics.pull_requests.total = 1;
  statistics.issues.total = 0;
  statistics.messages.total = 10;
  statistics.reactions.total = 5;

  // 2*1.0 + 1*2.0 + 0*0.5 + 10*0.3 + 5*0.1
  assert_eq!(contribution_score(&statistics), 7.5);
}

#[test]
fn score_rounds_to_two_decimals() {
  let mut statistics = Statistics::default();
  statistics.reactions.total = 7; // 0.7000000000000001 without rounding
  assert_eq!(contribution_score(&statistics), 0.7);
}

// ─── Snapshot math ───────────────────────────────────────────────────────────

#[test]
fn snapshot_partitions_by_type_and_sums_line_deltas() {
  let activities = vec![
    act(
      activity_type::COMMIT,
      json!({ "repository": "acme/app", "additions": 120, "deletions": 30 }),
    ),
    act(
      activity_type::COMMIT,
      json!({ "repository": "acme/app", "additions": 5, "deletions": 50 }),
    ),
    act(activity_type::MESSAGE, json!({ "channel": "#eng" })),
    act("deploy", json!({ "environment": "prod" })),
  ];

  let snapshot = Snapshot::compute("Kevin", Window::default(), &activities);

  assert_eq!(snapshot.statistics.commits.total, 2);
  assert_eq!(snapshot.statistics.commits.additions, 125);
  assert_eq!(snapshot.statistics.commits.deletions, 80);
  assert_eq!(snapshot.statistics.commits.net_lines, 45);
  assert_eq!(snapshot.statistics.messages.total, 1);
  // Unknown types still show up in the raw partition.
  assert_eq!(snapshot.statistics.totals_by_type.get("deploy"), Some(&1));
  assert_eq!(snapshot.statistics.totals_by_type.get("commit"), Some(&2));
}

#[test]
fn pull_request_state_breakdown() {
  let activities = vec![
    act(activity_type::PULL_REQUEST, json!({ "state": "open" })),
    act(activity_type::PULL_REQUEST, json!({ "state": "merged" })),
    // GitHub reports merged PRs as closed with a merged flag.
    act(
      activity_type::PULL_REQUEST,
      json!({ "state": "closed", "merged": true }),
    ),
    act(
      activity_type::PULL_REQUEST,
      json!({ "state": "closed", "merged": false }),
    ),
  ];

  let snapshot = Snapshot::compute("Kevin", Window::default(), &activities);

  let prs = &snapshot.statistics.pull_requests;
  assert_eq!(prs.total, 4);
  assert_eq!(prs.open, 1);
  assert_eq!(prs.merged, 2);
  assert_eq!(prs.closed, 1);
}

#[test]
fn issue_state_breakdown() {
  let activities = vec![
    act(activity_type::ISSUE, json!({ "state": "open" })),
    act(activity_type::ISSUE, json!({ "state": "closed" })),
    act(activity_type::ISSUE, json!({ "state": "closed" })),
  ];

  let snapshot = Snapshot::compute("Kevin", Window::default(), &activities);

  assert_eq!(snapshot.statistics.issues.total, 3);
  assert_eq!(snapshot.statistics.issues.open, 1);
  assert_eq!(snapshot.statistics.issues.closed, 2);
}

// ─── Rankings ────────────────────────────────────────────────────────────────

#[test]
fn top_repositories_ranks_by_commits_plus_prs() {
  let activities = vec![
    act(activity_type::COMMIT, json!({ "repository": "acme/app" })),
    act(activity_type::COMMIT, json!({ "repository": "acme/infra" })),
    act(activity_type::COMMIT, json!({ "repository": "acme/infra" })),
    act(activity_type::PULL_REQUEST, json!({ "repository": "acme/infra" })),
    act(activity_type::MESSAGE, json!({ "channel": "#eng" })),
  ];

  let top = top_repositories(&activities, 10);

  assert_eq!(top.len(), 2);
  assert_eq!(top[0].repository, "acme/infra");
  assert_eq!(top[0].commits, 2);
  assert_eq!(top[0].pull_requests, 1);
  assert_eq!(top[1].repository, "acme/app");
}

#[test]
fn top_repositories_ties_keep_first_seen_order() {
  let activities = vec![
    act(activity_type::COMMIT, json!({ "repository": "acme/zeta" })),
    act(activity_type::COMMIT, json!({ "repository": "acme/alpha" })),
  ];

  let top = top_repositories(&activities, 10);
  assert_eq!(top[0].repository, "acme/zeta");
  assert_eq!(top[1].repository, "acme/alpha");
}

#[test]
fn top_repositories_respects_limit() {
  let activities: Vec<_> = (0..5)
    .map(|i| {
      act(
        activity_type::COMMIT,
        json!({ "repository": format!("acme/repo{i}") }),
      )
    })
    .collect();

  assert_eq!(top_repositories(&activities, 3).len(), 3);
}

#[test]
fn top_files_counts_string_and_object_entries() {
  let activities = vec![
    act(
      activity_type::COMMIT,
      json!({ "files": ["src/lib.rs", { "filename": "src/main.rs" }] }),
    ),
    act(
      activity_type::COMMIT,
      json!({ "files": [{ "filename": "src/lib.rs", "additions": 3 }] }),
    ),
  ];

  let top = top_files(&activities, 20);

  assert_eq!(top.len(), 2);
  assert_eq!(top[0].filename, "src/lib.rs");
  assert_eq!(top[0].changes, 2);
  assert_eq!(top[1].filename, "src/main.rs");
  assert_eq!(top[1].changes, 1);
}

// ─── Engine over a live store ────────────────────────────────────────────────

async fn seeded_store() -> (SqliteStore, Uuid) {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let kevin = store
    .register_member("Kevin", Some("k@x.com".into()))
    .await
    .unwrap()
    .into_member();

  for (day, sha) in [(10, "aaa"), (12, "bbb")] {
    store
      .append_activity(NewActivity {
        member_id: kevin.member_id,
        source: "github".into(),
        activity_type: activity_type::COMMIT.into(),
        timestamp: ts(day),
        metadata: json!({
          "repository": "acme/app",
          "sha": sha,
          "additions": 10,
          "deletions": 4,
        }),
        activity_id: Some(format!("github:commit:{sha}")),
      })
      .await
      .unwrap();
  }

  let mut pr = NewActivity::new(
    kevin.member_id,
    "github",
    activity_type::PULL_REQUEST,
    ts(11),
  );
  pr.metadata = json!({ "repository": "acme/app", "state": "merged" });
  pr.activity_id = Some("github:pr:1".into());
  store.append_activity(pr).await.unwrap();

  (store, kevin.member_id)
}

#[tokio::test]
async fn statistics_for_builds_a_snapshot() {
  let (store, _) = seeded_store().await;
  let engine = QueryEngine::new(&store);

  let report = engine.statistics_for("Kevin", None, None).await.unwrap();
  let snapshot = report.snapshot().expect("snapshot");

  assert_eq!(snapshot.member, "Kevin");
  assert_eq!(snapshot.statistics.commits.total, 2);
  assert_eq!(snapshot.statistics.commits.net_lines, 12);
  assert_eq!(snapshot.statistics.pull_requests.merged, 1);
  assert_eq!(snapshot.top_repositories[0].repository, "acme/app");
  // 2*1.0 + 1*2.0
  assert_eq!(snapshot.contribution_score, 4.0);
}

#[tokio::test]
async fn statistics_window_excludes_outside_events() {
  let (store, _) = seeded_store().await;
  let engine = QueryEngine::new(&store);

  let report = engine
    .statistics_for("Kevin", Some(ts(11)), Some(ts(12)))
    .await
    .unwrap();
  let snapshot = report.snapshot().unwrap();

  assert_eq!(snapshot.statistics.commits.total, 1);
  assert_eq!(snapshot.statistics.pull_requests.total, 1);
}

#[tokio::test]
async fn unknown_member_yields_structured_not_found() {
  let (store, _) = seeded_store().await;
  let engine = QueryEngine::new(&store);

  let report = engine.statistics_for("Nobody", None, None).await.unwrap();
  assert!(report.snapshot().is_none());

  let value = serde_json::to_value(&report).unwrap();
  assert_eq!(value["member"], "Nobody");
  assert_eq!(value["error"], "member not found");
}

#[tokio::test]
async fn snapshot_serializes_with_contract_field_names() {
  let (store, _) = seeded_store().await;
  let engine = QueryEngine::new(&store);

  let report = engine.statistics_for("Kevin", None, None).await.unwrap();
  let value = serde_json::to_value(&report).unwrap();

  assert_eq!(value["statistics"]["commits"]["total"], 2);
  assert_eq!(value["statistics"]["pull_requests"]["merged"], 1);
  assert_eq!(value["top_repositories"][0]["repository"], "acme/app");
  assert_eq!(value["contribution_score"], 4.0);
}

#[tokio::test]
async fn activities_for_filters_by_source() {
  let (store, kevin_id) = seeded_store().await;

  let mut message =
    NewActivity::new(kevin_id, "slack", activity_type::MESSAGE, ts(13));
  message.metadata = json!({ "channel": "#eng" });
  store.append_activity(message).await.unwrap();

  let engine = QueryEngine::new(&store);
  let feed = engine
    .activities_for("Kevin", Some("slack"), Window::default(), None)
    .await
    .unwrap();

  match feed {
    ActivityFeed::Activities(found) => {
      assert_eq!(found.activities.len(), 1);
      assert_eq!(found.activities[0].source, "slack");
    }
    ActivityFeed::NotFound(_) => panic!("expected activities"),
  }
}

#[tokio::test]
async fn team_summary_ranks_by_commits_with_stable_ties() {
  let store = SqliteStore::open_in_memory().await.unwrap();

  // Mara and Kevin tie on commit count; Priya leads.
  for (name, commits) in [("Mara", 2u32), ("Kevin", 2), ("Priya", 3)] {
    let member = store
      .register_member(name, None)
      .await
      .unwrap()
      .into_member();
    for i in 0..commits {
      store
        .append_activity(NewActivity {
          member_id: member.member_id,
          source: "github".into(),
          activity_type: activity_type::COMMIT.into(),
          timestamp: ts(10 + i),
          metadata: json!({ "repository": "acme/app" }),
          activity_id: Some(format!("github:commit:{name}:{i}")),
        })
        .await
        .unwrap();
    }
  }

  let engine = QueryEngine::new(&store);
  let names: Vec<String> =
    ["Mara", "Kevin", "Priya"].map(String::from).into();
  let summary = engine.team_summary(&names, None, None).await.unwrap();

  let order: Vec<_> = summary.members.iter().map(|s| s.member.as_str()).collect();
  // Priya first; the tie keeps input order (Mara before Kevin).
  assert_eq!(order, ["Priya", "Mara", "Kevin"]);
  assert!(summary.skipped.is_empty());
}

#[tokio::test]
async fn team_summary_skips_unknown_members() {
  let (store, _) = seeded_store().await;
  let engine = QueryEngine::new(&store);

  let names: Vec<String> = ["Kevin", "Ghost"].map(String::from).into();
  let summary = engine.team_summary(&names, None, None).await.unwrap();

  assert_eq!(summary.members.len(), 1);
  assert_eq!(summary.skipped.len(), 1);
  assert_eq!(summary.skipped[0].member, "Ghost");
}

#[tokio::test]
async fn top_contributors_ranks_by_score() {
  let store = SqliteStore::open_in_memory().await.unwrap();

  // Kevin: 1 commit + 1 PR = 3.0; Mara: 2 commits = 2.0.
  let kevin = store
    .register_member("Kevin", None)
    .await
    .unwrap()
    .into_member();
  store
    .append_activity(NewActivity::new(
      kevin.member_id,
      "github",
      activity_type::COMMIT,
      ts(10),
    ))
    .await
    .unwrap();
  store
    .append_activity(NewActivity::new(
      kevin.member_id,
      "github",
      activity_type::PULL_REQUEST,
      ts(11),
    ))
    .await
    .unwrap();

  let mara = store
    .register_member("Mara", None)
    .await
    .unwrap()
    .into_member();
  for day in [10, 11] {
    store
      .append_activity(NewActivity::new(
        mara.member_id,
        "github",
        activity_type::COMMIT,
        ts(day),
      ))
      .await
      .unwrap();
  }

  let engine = QueryEngine::new(&store);
  let names: Vec<String> = ["Mara", "Kevin"].map(String::from).into();
  let top = engine.top_contributors(&names, None, None, 10).await.unwrap();

  assert_eq!(top.len(), 2);
  assert_eq!(top[0].member, "Kevin");
  assert_eq!(top[0].rank, 1);
  assert_eq!(top[0].contribution_score, 3.0);
  assert_eq!(top[1].member, "Mara");
  assert_eq!(top[1].rank, 2);
}
