//! Error type for `cmdb-store-sqlite`.

use cmdb_core::{Classify, ErrorKind, Violation};
use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] cmdb_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored row could not be decoded into a domain type.
  #[error("corrupt row: {0}")]
  Corrupt(String),
}

impl From<Violation> for Error {
  fn from(v: Violation) -> Self { Self::Core(v.into()) }
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::Core(e) => e.kind(),
      Self::Sqlite(e) => sqlite_kind(e),
      Self::Database(tokio_rusqlite::Error::Rusqlite(e)) => sqlite_kind(e),
      Self::Database(_) => ErrorKind::Transient,
      Self::Uuid(_) | Self::DateParse(_) | Self::Corrupt(_) => ErrorKind::Internal,
    }
  }
}

// A constraint failure that slipped past the explicit checks is still a
// conflict, not a transient fault.
fn sqlite_kind(e: &rusqlite::Error) -> ErrorKind {
  match e.sqlite_error_code() {
    Some(ErrorCode::ConstraintViolation) => ErrorKind::Conflict,
    _ => ErrorKind::Transient,
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
