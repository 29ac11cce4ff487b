//! SQLite backend for the cmdb store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every mutation is a single
//! `BEGIN IMMEDIATE` transaction: the constraint checks and the writes they
//! guard run under one write lock and commit or roll back together.

mod census;
mod encode;
mod evolve;
mod rows;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
