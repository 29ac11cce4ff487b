//! JSON REST API for cmdb.
//!
//! Exposes an axum [`Router`] backed by any [`cmdb_core::store::CatalogStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", cmdb_api::api_router(store.clone()))
//! ```

pub mod entities;
pub mod error;
pub mod fields;
pub mod relationships;
pub mod schemas;

use std::sync::Arc;

use axum::{
  Router,
  routing::{delete, get, post},
};
use cmdb_core::store::CatalogStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: CatalogStore + Send + Sync + 'static,
{
  Router::new()
    // Schemas
    .route("/schemas", get(schemas::list::<S>).post(schemas::create::<S>))
    .route("/schemas/{id}", get(schemas::get_one::<S>).delete(schemas::remove::<S>))
    .route(
      "/schemas/{id}/fields",
      get(fields::list::<S>).post(fields::add::<S>),
    )
    .route("/schemas/{id}/entities", get(entities::list::<S>))
    // Fields
    .route(
      "/fields/{id}",
      get(fields::get_one::<S>)
        .put(fields::change::<S>)
        .delete(fields::remove::<S>),
    )
    .route("/fields/{id}/history", get(fields::history::<S>))
    // Entities and values
    .route("/entities", post(entities::create::<S>))
    .route(
      "/entities/{id}/values",
      get(entities::values::<S>).put(entities::set_value::<S>),
    )
    .route("/entities/{id}/history", get(entities::history::<S>))
    .route("/values/{id}", delete(entities::remove_value::<S>))
    // Relationships
    .route(
      "/relationships",
      get(relationships::list::<S>)
        .post(relationships::create::<S>)
        .delete(relationships::remove::<S>),
    )
    .with_state(store)
}

#[cfg(test)]
mod tests;
