//! Handlers for per-member activity feeds and statistics.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET` | `/members/:name/activities` | `?source=&start=&end=&limit=` |
//! | `GET` | `/members/:name/statistics` | `?start=&end=` |
//!
//! Absence is structured, not an error: an unknown member yields a
//! `{"member": ..., "error": "member not found"}` body with `200`, so batch
//! consumers can skip without special-casing status codes.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use chrono::{DateTime, Utc};
use pulse_core::store::IndexStore;
use pulse_query::{
  QueryEngine, Window,
  stats::{ActivityFeed, MemberReport},
};
use serde::Deserialize;

use crate::error::ApiError;

// ─── Feed ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct FeedParams {
  pub source: Option<String>,
  pub start:  Option<DateTime<Utc>>,
  pub end:    Option<DateTime<Utc>>,
  pub limit:  Option<usize>,
}

/// `GET /members/:name/activities`
pub async fn feed<S>(
  State(store): State<Arc<S>>,
  Path(name): Path<String>,
  Query(params): Query<FeedParams>,
) -> Result<Json<ActivityFeed>, ApiError>
where
  S: IndexStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let engine = QueryEngine::new(&*store);
  let feed = engine
    .activities_for(
      &name,
      params.source.as_deref(),
      Window::new(params.start, params.end),
      params.limit,
    )
    .await?;
  Ok(Json(feed))
}

// ─── Statistics ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatisticsParams {
  pub start: Option<DateTime<Utc>>,
  pub end:   Option<DateTime<Utc>>,
}

/// `GET /members/:name/statistics`
pub async fn statistics<S>(
  State(store): State<Arc<S>>,
  Path(name): Path<String>,
  Query(params): Query<StatisticsParams>,
) -> Result<Json<MemberReport>, ApiError>
where
  S: IndexStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let engine = QueryEngine::new(&*store);
  let report = engine
    .statistics_for(&name, params.start, params.end)
    .await?;
  Ok(Json(report))
}
