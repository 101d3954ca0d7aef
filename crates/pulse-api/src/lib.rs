//! JSON REST API for Pulse.
//!
//! Exposes an axum [`Router`] backed by any [`pulse_core::store::IndexStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", pulse_api::api_router(store.clone()))
//! ```

pub mod activities;
pub mod error;
pub mod members;
pub mod team;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, put},
};
use pulse_core::store::IndexStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: IndexStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  Router::new()
    // Members
    .route("/members", get(members::list::<S>).post(members::create::<S>))
    .route("/members/{name}", get(members::get_one::<S>))
    .route("/members/{name}/email", put(members::set_email::<S>))
    .route("/members/{name}/identifiers", get(members::identifiers::<S>))
    // Activity feeds and statistics
    .route("/members/{name}/activities", get(activities::feed::<S>))
    .route("/members/{name}/statistics", get(activities::statistics::<S>))
    // Team views
    .route("/team/summary", get(team::summary::<S>))
    .route("/team/top", get(team::top::<S>))
    .with_state(store)
}
