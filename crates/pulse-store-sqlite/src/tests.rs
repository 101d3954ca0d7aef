//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{TimeZone, Utc};
use pulse_core::{
  activity::{ActivityQuery, NewActivity, activity_type},
  member::BindOutcome,
  store::IndexStore,
};
use serde_json::json;
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn commit(member_id: Uuid, sha: &str) -> NewActivity {
  NewActivity {
    member_id,
    source: "github".into(),
    activity_type: activity_type::COMMIT.into(),
    timestamp: Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap(),
    metadata: json!({ "repository": "acme/app", "sha": sha }),
    activity_id: Some(format!("github:commit:{sha}")),
  }
}

// ─── Members ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn register_and_get_member() {
  let s = store().await;

  let outcome = s
    .register_member("Kevin", Some("k@x.com".into()))
    .await
    .unwrap();
  assert!(outcome.was_created());

  let member = outcome.into_member();
  let fetched = s.get_member(member.member_id).await.unwrap().unwrap();
  assert_eq!(fetched.name, "Kevin");
  assert_eq!(fetched.email.as_deref(), Some("k@x.com"));
}

#[tokio::test]
async fn register_is_idempotent_by_exact_name() {
  let s = store().await;

  let first = s.register_member("Kevin", None).await.unwrap();
  let second = s
    .register_member("Kevin", Some("ignored@x.com".into()))
    .await
    .unwrap();

  assert!(first.was_created());
  assert!(!second.was_created());
  assert_eq!(first.member().member_id, second.member().member_id);
  // The existing row is returned unchanged.
  assert!(second.member().email.is_none());

  let all = s.list_members().await.unwrap();
  assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn get_member_missing_returns_none() {
  let s = store().await;
  let result = s.get_member(Uuid::new_v4()).await.unwrap();
  assert!(result.is_none());
}

#[tokio::test]
async fn find_member_exact_match_beats_case_insensitive() {
  let s = store().await;
  s.register_member("kevin", None).await.unwrap();
  let exact = s.register_member("Kevin", None).await.unwrap().into_member();

  let found = s.find_member_by_name("Kevin").await.unwrap().unwrap();
  assert_eq!(found.member_id, exact.member_id);
}

#[tokio::test]
async fn find_member_falls_back_to_case_insensitive_name() {
  let s = store().await;
  let kevin = s.register_member("Kevin", None).await.unwrap().into_member();

  let found = s.find_member_by_name("KEVIN").await.unwrap().unwrap();
  assert_eq!(found.member_id, kevin.member_id);
}

#[tokio::test]
async fn find_member_matches_email_case_insensitively() {
  let s = store().await;
  let kevin = s
    .register_member("Kevin", Some("K.Doe@X.com".into()))
    .await
    .unwrap()
    .into_member();

  let found = s.find_member_by_name("k.doe@x.com").await.unwrap().unwrap();
  assert_eq!(found.member_id, kevin.member_id);
}

#[tokio::test]
async fn find_member_ambiguous_fallback_prefers_earliest() {
  let s = store().await;
  let first = s.register_member("ALICE", None).await.unwrap().into_member();
  s.register_member("Alice", None).await.unwrap();

  // "alice" matches neither exactly; the earliest-registered row wins.
  let found = s.find_member_by_name("alice").await.unwrap().unwrap();
  assert_eq!(found.member_id, first.member_id);
}

#[tokio::test]
async fn find_member_unknown_returns_none() {
  let s = store().await;
  assert!(s.find_member_by_name("nobody").await.unwrap().is_none());
}

#[tokio::test]
async fn set_member_email_updates_in_place() {
  let s = store().await;
  let kevin = s.register_member("Kevin", None).await.unwrap().into_member();

  s.set_member_email(kevin.member_id, "kevin@acme.dev")
    .await
    .unwrap();

  let fetched = s.get_member(kevin.member_id).await.unwrap().unwrap();
  assert_eq!(fetched.email.as_deref(), Some("kevin@acme.dev"));
}

#[tokio::test]
async fn set_member_email_unknown_member_errors() {
  let s = store().await;
  let err = s
    .set_member_email(Uuid::new_v4(), "x@x.com")
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::MemberNotFound(_)));
}

// ─── Identifiers ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn bind_and_resolve_identifier() {
  let s = store().await;
  let kevin = s.register_member("Kevin", None).await.unwrap().into_member();

  let outcome = s
    .bind_identifier(kevin.member_id, "github", "KDoe")
    .await
    .unwrap();
  assert_eq!(outcome, BindOutcome::Bound);

  let resolved = s.resolve_identifier("github", "KDoe").await.unwrap();
  assert_eq!(resolved, Some(kevin.member_id));
}

#[tokio::test]
async fn rebinding_same_triple_is_a_noop() {
  let s = store().await;
  let kevin = s.register_member("Kevin", None).await.unwrap().into_member();

  s.bind_identifier(kevin.member_id, "github", "KDoe")
    .await
    .unwrap();
  let second = s
    .bind_identifier(kevin.member_id, "github", "KDoe")
    .await
    .unwrap();
  assert_eq!(second, BindOutcome::AlreadyBound);

  // Exactly one row survives.
  let ids = s.identifiers_for(kevin.member_id).await.unwrap();
  assert_eq!(ids.len(), 1);
  assert_eq!(ids.get("github").map(String::as_str), Some("KDoe"));
}

#[tokio::test]
async fn conflicting_bind_keeps_first_binding() {
  let s = store().await;
  let kevin = s.register_member("Kevin", None).await.unwrap().into_member();
  let mara = s.register_member("Mara", None).await.unwrap().into_member();

  s.bind_identifier(kevin.member_id, "slack", "U123")
    .await
    .unwrap();
  let outcome = s
    .bind_identifier(mara.member_id, "slack", "U123")
    .await
    .unwrap();

  assert_eq!(
    outcome,
    BindOutcome::ConflictIgnored {
      bound_to: kevin.member_id
    }
  );
  let resolved = s.resolve_identifier("slack", "U123").await.unwrap();
  assert_eq!(resolved, Some(kevin.member_id));
}

#[tokio::test]
async fn resolve_unknown_identifier_returns_none() {
  let s = store().await;
  assert!(
    s.resolve_identifier("github", "ghost")
      .await
      .unwrap()
      .is_none()
  );
}

#[tokio::test]
async fn identifiers_for_spans_sources() {
  let s = store().await;
  let kevin = s.register_member("Kevin", None).await.unwrap().into_member();

  s.bind_identifier(kevin.member_id, "github", "KDoe")
    .await
    .unwrap();
  s.bind_identifier(kevin.member_id, "slack", "U123")
    .await
    .unwrap();

  let ids = s.identifiers_for(kevin.member_id).await.unwrap();
  assert_eq!(ids.len(), 2);
  assert_eq!(ids.get("github").map(String::as_str), Some("KDoe"));
  assert_eq!(ids.get("slack").map(String::as_str), Some("U123"));
}

// ─── Activities ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn append_and_query_activity() {
  let s = store().await;
  let kevin = s.register_member("Kevin", None).await.unwrap().into_member();

  let outcome = s.append_activity(commit(kevin.member_id, "abc123")).await.unwrap();
  assert!(outcome.was_inserted());

  let activities = s
    .query_activities(&ActivityQuery {
      member_id: Some(kevin.member_id),
      ..Default::default()
    })
    .await
    .unwrap();

  assert_eq!(activities.len(), 1);
  assert_eq!(activities[0].activity_type, activity_type::COMMIT);
  assert_eq!(
    activities[0].activity_id.as_deref(),
    Some("github:commit:abc123")
  );
  assert_eq!(activities[0].metadata["repository"], "acme/app");
}

#[tokio::test]
async fn append_with_seen_natural_key_is_a_noop() {
  let s = store().await;
  let kevin = s.register_member("Kevin", None).await.unwrap().into_member();

  let first = s.append_activity(commit(kevin.member_id, "abc123")).await.unwrap();
  let second = s.append_activity(commit(kevin.member_id, "abc123")).await.unwrap();

  assert!(first.was_inserted());
  assert!(!second.was_inserted());

  let activities = s
    .query_activities(&ActivityQuery::default())
    .await
    .unwrap();
  assert_eq!(activities.len(), 1);
}

#[tokio::test]
async fn append_without_natural_key_never_dedups() {
  let s = store().await;
  let kevin = s.register_member("Kevin", None).await.unwrap().into_member();

  let mut input = commit(kevin.member_id, "abc123");
  input.activity_id = None;

  s.append_activity(input.clone()).await.unwrap();
  s.append_activity(input).await.unwrap();

  let activities = s
    .query_activities(&ActivityQuery::default())
    .await
    .unwrap();
  assert_eq!(activities.len(), 2);
}

#[tokio::test]
async fn query_orders_descending_by_event_time() {
  let s = store().await;
  let kevin = s.register_member("Kevin", None).await.unwrap().into_member();

  for (day, sha) in [(1, "aaa"), (3, "ccc"), (2, "bbb")] {
    let mut input = commit(kevin.member_id, sha);
    input.timestamp = Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap();
    s.append_activity(input).await.unwrap();
  }

  let activities = s
    .query_activities(&ActivityQuery::default())
    .await
    .unwrap();
  let shas: Vec<_> = activities
    .iter()
    .map(|a| a.metadata["sha"].as_str().unwrap().to_owned())
    .collect();
  assert_eq!(shas, ["ccc", "bbb", "aaa"]);
}

#[tokio::test]
async fn query_filters_compose_with_and_semantics() {
  let s = store().await;
  let kevin = s.register_member("Kevin", None).await.unwrap().into_member();
  let mara = s.register_member("Mara", None).await.unwrap().into_member();

  s.append_activity(commit(kevin.member_id, "aaa")).await.unwrap();
  s.append_activity(commit(mara.member_id, "bbb")).await.unwrap();

  let mut message = NewActivity::new(
    kevin.member_id,
    "slack",
    activity_type::MESSAGE,
    Utc.with_ymd_and_hms(2026, 3, 14, 10, 0, 0).unwrap(),
  );
  message.metadata = json!({ "channel": "#eng" });
  s.append_activity(message).await.unwrap();

  let kevin_github = s
    .query_activities(&ActivityQuery {
      member_id: Some(kevin.member_id),
      source: Some("github".into()),
      ..Default::default()
    })
    .await
    .unwrap();

  assert_eq!(kevin_github.len(), 1);
  assert_eq!(kevin_github[0].metadata["sha"], "aaa");
}

#[tokio::test]
async fn query_time_range_bounds_are_inclusive() {
  let s = store().await;
  let kevin = s.register_member("Kevin", None).await.unwrap().into_member();

  for day in [1, 2, 3, 4] {
    let mut input = commit(kevin.member_id, &format!("sha{day}"));
    input.timestamp = Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap();
    s.append_activity(input).await.unwrap();
  }

  let window = s
    .query_activities(&ActivityQuery {
      since: Some(Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap()),
      until: Some(Utc.with_ymd_and_hms(2026, 3, 3, 12, 0, 0).unwrap()),
      ..Default::default()
    })
    .await
    .unwrap();

  assert_eq!(window.len(), 2);
}

#[tokio::test]
async fn query_limit_truncates() {
  let s = store().await;
  let kevin = s.register_member("Kevin", None).await.unwrap().into_member();

  for i in 0..5 {
    s.append_activity(commit(kevin.member_id, &format!("sha{i}")))
      .await
      .unwrap();
  }

  let limited = s
    .query_activities(&ActivityQuery {
      limit: Some(3),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(limited.len(), 3);
}

// ─── Health ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn ping_succeeds_on_open_store() {
  let s = store().await;
  s.ping().await.unwrap();
}
