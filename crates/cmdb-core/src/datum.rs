//! [`Datum`]: a type-tagged attribute value.
//!
//! The same type carries raw caller input (before coercion) and normalised
//! values (after coercion). Normalised values are only ever `Int`, `Float` or
//! `Text`; `Timestamp` exists so callers holding a typed instant can pass it
//! straight to a `datetime` field.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;

/// A single attribute value.
///
/// Serialises untagged, so JSON `5` is `Int`, `5.0` is `Float` and `"5"` is
/// `Text`. Strings never deserialise as `Timestamp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Datum {
  Int(i64),
  Float(f64),
  Text(String),
  Timestamp(DateTime<Utc>),
}

impl Datum {
  /// Canonical JSON text used for storage and equality in the database.
  pub fn encode(&self) -> Result<String> { Ok(serde_json::to_string(self)?) }

  pub fn decode(s: &str) -> Result<Self> { Ok(serde_json::from_str(s)?) }
}

impl fmt::Display for Datum {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Int(n) => write!(f, "{n}"),
      Self::Float(x) => write!(f, "{x}"),
      Self::Text(s) => write!(f, "{s:?}"),
      Self::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
    }
  }
}

impl From<i64> for Datum {
  fn from(n: i64) -> Self { Self::Int(n) }
}

impl From<f64> for Datum {
  fn from(x: f64) -> Self { Self::Float(x) }
}

impl From<&str> for Datum {
  fn from(s: &str) -> Self { Self::Text(s.to_owned()) }
}

impl From<String> for Datum {
  fn from(s: String) -> Self { Self::Text(s) }
}

impl From<DateTime<Utc>> for Datum {
  fn from(t: DateTime<Utc>) -> Self { Self::Timestamp(t) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn json_shapes_pick_the_right_variant() {
    assert_eq!(serde_json::from_str::<Datum>("5").unwrap(), Datum::Int(5));
    assert_eq!(serde_json::from_str::<Datum>("5.0").unwrap(), Datum::Float(5.0));
    assert_eq!(
      serde_json::from_str::<Datum>("\"2024-01-01\"").unwrap(),
      Datum::Text("2024-01-01".into())
    );
    assert!(serde_json::from_str::<Datum>("true").is_err());
    assert!(serde_json::from_str::<Datum>("null").is_err());
  }

  #[test]
  fn encoding_distinguishes_int_and_float() {
    assert_eq!(Datum::Int(5).encode().unwrap(), "5");
    assert_eq!(Datum::Float(5.0).encode().unwrap(), "5.0");
    assert_eq!(Datum::decode("5.0").unwrap(), Datum::Float(5.0));
  }
}
