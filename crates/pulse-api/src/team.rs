//! Handlers for team-wide views.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET` | `/team/summary` | `?start=&end=` — all members, commit-ranked |
//! | `GET` | `/team/top` | `?start=&end=&limit=` — contribution-score ranking |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use chrono::{DateTime, Utc};
use pulse_core::store::IndexStore;
use pulse_query::{
  QueryEngine, TeamSummary,
  stats::RankedContributor,
};
use serde::Deserialize;

use crate::error::ApiError;

const DEFAULT_TOP_LIMIT: usize = 10;

#[derive(Debug, Deserialize)]
pub struct WindowParams {
  pub start: Option<DateTime<Utc>>,
  pub end:   Option<DateTime<Utc>>,
}

/// `GET /team/summary`
pub async fn summary<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<WindowParams>,
) -> Result<Json<TeamSummary>, ApiError>
where
  S: IndexStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let names = member_names(&*store).await?;
  let engine = QueryEngine::new(&*store);
  let summary = engine
    .team_summary(&names, params.start, params.end)
    .await?;
  Ok(Json(summary))
}

#[derive(Debug, Deserialize)]
pub struct TopParams {
  pub start: Option<DateTime<Utc>>,
  pub end:   Option<DateTime<Utc>>,
  pub limit: Option<usize>,
}

/// `GET /team/top`
pub async fn top<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<TopParams>,
) -> Result<Json<Vec<RankedContributor>>, ApiError>
where
  S: IndexStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let names = member_names(&*store).await?;
  let engine = QueryEngine::new(&*store);
  let top = engine
    .top_contributors(
      &names,
      params.start,
      params.end,
      params.limit.unwrap_or(DEFAULT_TOP_LIMIT),
    )
    .await?;
  Ok(Json(top))
}

async fn member_names<S>(store: &S) -> Result<Vec<String>, ApiError>
where
  S: IndexStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  Ok(
    store
      .list_members()
      .await
      .map_err(|e| ApiError::Store(Box::new(e)))?
      .into_iter()
      .map(|m| m.name)
      .collect(),
  )
}
