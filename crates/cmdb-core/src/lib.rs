//! Core types and trait definitions for the cmdb configuration store.
//!
//! Schemas describe record types, fields describe their typed attributes, and
//! entities hold attribute values stored generically. This crate owns the pure
//! parts of schema evolution: coercing raw input to a field's type, deciding
//! whether a field mutation is safe for the current population, and the
//! relationship registry. It is deliberately free of HTTP and database
//! dependencies.

pub mod coerce;
pub mod constraint;
pub mod datum;
pub mod entity;
pub mod error;
pub mod field;
pub mod relationship;
pub mod schema;
pub mod store;

pub use error::{Classify, Error, ErrorKind, Resource, Result, Violation};
