//! [`QueryEngine`] — read-only aggregation over any [`IndexStore`].

use chrono::{DateTime, Utc};
use pulse_core::{activity::ActivityQuery, store::IndexStore};

use crate::{
  Result,
  error::Error,
  stats::{
    ActivityFeed, MemberActivities, MemberReport, NotFoundReport,
    RankedContributor, Snapshot, TeamSummary, Window,
  },
};

/// Read-only view over a store. Construct per call site — it borrows the
/// store and holds no state of its own.
pub struct QueryEngine<'a, S> {
  store: &'a S,
}

impl<'a, S: IndexStore> QueryEngine<'a, S> {
  pub fn new(store: &'a S) -> Self { Self { store } }

  /// A member's raw activities, newest first, optionally filtered by source
  /// and window.
  pub async fn activities_for(
    &self,
    member_name: &str,
    source: Option<&str>,
    window: Window,
    limit: Option<usize>,
  ) -> Result<ActivityFeed> {
    let Some(member) = self
      .store
      .find_member_by_name(member_name)
      .await
      .map_err(Error::store)?
    else {
      return Ok(ActivityFeed::NotFound(NotFoundReport::new(member_name)));
    };

    let activities = self
      .store
      .query_activities(&ActivityQuery {
        member_id: Some(member.member_id),
        source: source.map(str::to_owned),
        since: window.start,
        until: window.end,
        limit,
      })
      .await
      .map_err(Error::store)?;

    Ok(ActivityFeed::Activities(MemberActivities {
      member: member.name,
      activities,
    }))
  }

  /// A member's statistics snapshot for a window, or a structured absence.
  pub async fn statistics_for(
    &self,
    member_name: &str,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
  ) -> Result<MemberReport> {
    let Some(member) = self
      .store
      .find_member_by_name(member_name)
      .await
      .map_err(Error::store)?
    else {
      return Ok(MemberReport::NotFound(NotFoundReport::new(member_name)));
    };

    let window = Window::new(start, end);
    let activities = self
      .store
      .query_activities(&ActivityQuery {
        member_id: Some(member.member_id),
        since: window.start,
        until: window.end,
        ..Default::default()
      })
      .await
      .map_err(Error::store)?;

    Ok(MemberReport::Stats(Snapshot::compute(
      member.name,
      window,
      &activities,
    )))
  }

  /// Snapshots for every named member, sorted descending by total commit
  /// count. A tie preserves the order of `member_names` (stable sort).
  /// Unresolvable members land in `skipped`.
  pub async fn team_summary(
    &self,
    member_names: &[String],
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
  ) -> Result<TeamSummary> {
    let window = Window::new(start, end);
    let mut members = Vec::with_capacity(member_names.len());
    let mut skipped = Vec::new();

    for name in member_names {
      match self.statistics_for(name, start, end).await? {
        MemberReport::Stats(snapshot) => members.push(snapshot),
        MemberReport::NotFound(report) => skipped.push(report),
      }
    }

    members.sort_by(|a, b| b.statistics.commits.total.cmp(&a.statistics.commits.total));

    Ok(TeamSummary {
      window,
      members,
      skipped,
    })
  }

  /// The top `limit` members by contribution score, descending; ties keep
  /// the order of `member_names`.
  pub async fn top_contributors(
    &self,
    member_names: &[String],
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    limit: usize,
  ) -> Result<Vec<RankedContributor>> {
    let mut snapshots = Vec::with_capacity(member_names.len());
    for name in member_names {
      if let MemberReport::Stats(snapshot) = self.statistics_for(name, start, end).await? {
        snapshots.push(snapshot);
      }
    }
    snapshots.sort_by(|a, b| {
      b.contribution_score
        .partial_cmp(&a.contribution_score)
        .unwrap_or(std::cmp::Ordering::Equal)
    });
    snapshots.truncate(limit);

    Ok(
      snapshots
        .into_iter()
        .enumerate()
        .map(|(i, s)| RankedContributor {
          rank:               i + 1,
          member:             s.member,
          contribution_score: s.contribution_score,
        })
        .collect(),
    )
  }
}
