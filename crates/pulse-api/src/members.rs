//! Handlers for `/members` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/members` | All members, registration order |
//! | `POST` | `/members` | Body: `{"name":"Kevin","email":"k@x.com"}`; idempotent |
//! | `GET`  | `/members/:name` | Exact then case-insensitive lookup; 404 if absent |
//! | `PUT`  | `/members/:name/email` | Body: `{"email":"..."}` |
//! | `GET`  | `/members/:name/identifiers` | `source -> source_user_id` |

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use pulse_core::{member::Member, store::IndexStore};
use serde::Deserialize;

use crate::error::ApiError;

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /members`
pub async fn list<S>(State(store): State<Arc<S>>) -> Result<Json<Vec<Member>>, ApiError>
where
  S: IndexStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let members = store
    .list_members()
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(members))
}

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub name:  String,
  pub email: Option<String>,
}

/// `POST /members` — registration is idempotent by exact name; re-posting an
/// existing name returns the existing member with `200` instead of `201`.
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: IndexStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  if body.name.trim().is_empty() {
    return Err(ApiError::BadRequest("member name must not be empty".into()));
  }

  let outcome = store
    .register_member(&body.name, body.email)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  let status = if outcome.was_created() {
    StatusCode::CREATED
  } else {
    StatusCode::OK
  };
  Ok((status, Json(outcome.into_member())))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /members/:name`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(name): Path<String>,
) -> Result<Json<Member>, ApiError>
where
  S: IndexStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let member = find_member(&*store, &name).await?;
  Ok(Json(member))
}

// ─── Email ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct EmailBody {
  pub email: String,
}

/// `PUT /members/:name/email` — the only member mutation the core performs.
pub async fn set_email<S>(
  State(store): State<Arc<S>>,
  Path(name): Path<String>,
  Json(body): Json<EmailBody>,
) -> Result<Json<Member>, ApiError>
where
  S: IndexStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  if body.email.trim().is_empty() {
    return Err(ApiError::BadRequest("email must not be empty".into()));
  }

  let member = find_member(&*store, &name).await?;
  store
    .set_member_email(member.member_id, &body.email)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  let refreshed = store
    .get_member(member.member_id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("member {name:?} not found")))?;
  Ok(Json(refreshed))
}

// ─── Identifiers ──────────────────────────────────────────────────────────────

/// `GET /members/:name/identifiers`
pub async fn identifiers<S>(
  State(store): State<Arc<S>>,
  Path(name): Path<String>,
) -> Result<Json<BTreeMap<String, String>>, ApiError>
where
  S: IndexStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let member = find_member(&*store, &name).await?;
  let identifiers = store
    .identifiers_for(member.member_id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(identifiers))
}

pub(crate) async fn find_member<S>(store: &S, name: &str) -> Result<Member, ApiError>
where
  S: IndexStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  store
    .find_member_by_name(name)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("member {name:?} not found")))
}
