//! Validation and normalisation of raw values against a [`FieldType`].
//!
//! | Type       | Accepts                                   | Normalised to         |
//! |------------|-------------------------------------------|-----------------------|
//! | `int`      | `Int`                                     | unchanged             |
//! | `float`    | finite `Float`                            | unchanged             |
//! | `string`   | `Text`                                    | unchanged             |
//! | `datetime` | `Timestamp`, date/time `Text`, epoch `Int`/`Float` | epoch seconds (`Int`) |
//! | `ip`       | dotted-decimal IPv4 `Text`, `Int` in `0..=u32::MAX` | `u32` as `Int`  |
//!
//! Normalised values re-validate to themselves.

use std::net::Ipv4Addr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::{Error, Result, datum::Datum, field::FieldType};

/// Naive layouts tried after RFC 3339. Naive times are read as UTC.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
  "%Y-%m-%d %H:%M:%S%.f",
  "%Y-%m-%dT%H:%M:%S%.f",
  "%Y-%m-%d %H:%M",
  "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Validate `raw` against `field_type`, returning the normalised value or
/// `None` when the value is not acceptable.
pub fn validate(field_type: FieldType, raw: &Datum) -> Option<Datum> {
  match field_type {
    FieldType::Int => match raw {
      Datum::Int(_) => Some(raw.clone()),
      _ => None,
    },
    FieldType::Float => match raw {
      Datum::Float(x) if x.is_finite() => Some(raw.clone()),
      _ => None,
    },
    FieldType::String => match raw {
      Datum::Text(_) => Some(raw.clone()),
      _ => None,
    },
    FieldType::Datetime => datetime(raw).map(|t| Datum::Int(t.timestamp())),
    FieldType::Ip => ip(raw).map(|addr| Datum::Int(i64::from(u32::from(addr)))),
  }
}

/// Like [`validate`], but reports a rejected value as [`Error::TypeMismatch`].
pub fn coerce(field_type: FieldType, raw: &Datum) -> Result<Datum> {
  validate(field_type, raw).ok_or_else(|| Error::TypeMismatch {
    field_type,
    value: raw.to_string(),
  })
}

fn datetime(raw: &Datum) -> Option<DateTime<Utc>> {
  match raw {
    Datum::Timestamp(t) => Some(*t),
    Datum::Text(s) => parse_datetime(s.trim()),
    Datum::Int(secs) => DateTime::from_timestamp(*secs, 0),
    Datum::Float(x) if x.is_finite() => {
      let secs = x.floor();
      if secs < i64::MIN as f64 || secs > i64::MAX as f64 {
        return None;
      }
      DateTime::from_timestamp(secs as i64, 0)
    }
    Datum::Float(_) => None,
  }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
  if let Ok(t) = DateTime::parse_from_rfc3339(s) {
    return Some(t.with_timezone(&Utc));
  }
  for fmt in NAIVE_DATETIME_FORMATS {
    if let Ok(t) = NaiveDateTime::parse_from_str(s, fmt) {
      return Some(t.and_utc());
    }
  }
  DATE_FORMATS
    .iter()
    .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
    .and_then(|d| d.and_hms_opt(0, 0, 0))
    .map(|t| t.and_utc())
}

fn ip(raw: &Datum) -> Option<Ipv4Addr> {
  match raw {
    Datum::Text(s) => s.trim().parse().ok(),
    Datum::Int(n) => u32::try_from(*n).ok().map(Ipv4Addr::from),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn idempotent(field_type: FieldType, raw: Datum) -> Datum {
    let once = validate(field_type, &raw).expect("valid literal");
    let twice = validate(field_type, &once).expect("normalised value re-validates");
    assert_eq!(once, twice);
    once
  }

  #[test]
  fn scalar_types_pass_through() {
    assert_eq!(idempotent(FieldType::Int, Datum::Int(-7)), Datum::Int(-7));
    assert_eq!(idempotent(FieldType::Float, Datum::Float(2.5)), Datum::Float(2.5));
    assert_eq!(
      idempotent(FieldType::String, "ops".into()),
      Datum::Text("ops".into())
    );
  }

  #[test]
  fn scalar_types_reject_other_shapes() {
    assert_eq!(validate(FieldType::Int, &Datum::Float(1.0)), None);
    assert_eq!(validate(FieldType::Int, &"1".into()), None);
    assert_eq!(validate(FieldType::Float, &Datum::Int(1)), None);
    assert_eq!(validate(FieldType::Float, &Datum::Float(f64::NAN)), None);
    assert_eq!(validate(FieldType::String, &Datum::Int(1)), None);
  }

  #[test]
  fn datetime_forms_normalise_to_epoch_seconds() {
    let expected = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap().timestamp();

    for raw in [
      Datum::Text("2024-03-01T12:30:00Z".into()),
      Datum::Text("2024-03-01T14:30:00+02:00".into()),
      Datum::Text("2024-03-01 12:30:00".into()),
      Datum::Int(expected),
      Datum::Float(expected as f64 + 0.75),
      Datum::Timestamp(Utc.timestamp_opt(expected, 0).unwrap()),
    ] {
      assert_eq!(idempotent(FieldType::Datetime, raw), Datum::Int(expected));
    }
  }

  #[test]
  fn date_only_is_midnight_utc() {
    let midnight = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap().timestamp();
    assert_eq!(
      validate(FieldType::Datetime, &"2024-03-01".into()),
      Some(Datum::Int(midnight))
    );
  }

  #[test]
  fn datetime_rejects_garbage() {
    assert_eq!(validate(FieldType::Datetime, &"next tuesday".into()), None);
    assert_eq!(validate(FieldType::Datetime, &Datum::Int(i64::MAX)), None);
    assert_eq!(validate(FieldType::Datetime, &Datum::Float(f64::INFINITY)), None);
  }

  #[test]
  fn ip_text_normalises_to_u32() {
    assert_eq!(
      idempotent(FieldType::Ip, "192.168.1.10".into()),
      Datum::Int(0xC0A8_010A)
    );
    assert_eq!(idempotent(FieldType::Ip, Datum::Int(0)), Datum::Int(0));
    assert_eq!(
      idempotent(FieldType::Ip, Datum::Int(u32::MAX as i64)),
      Datum::Int(u32::MAX as i64)
    );
  }

  #[test]
  fn ip_rejects_malformed_input() {
    assert_eq!(validate(FieldType::Ip, &"256.0.0.1".into()), None);
    assert_eq!(validate(FieldType::Ip, &"10.0.0".into()), None);
    assert_eq!(validate(FieldType::Ip, &Datum::Int(-1)), None);
    assert_eq!(validate(FieldType::Ip, &Datum::Int(1 << 32)), None);
    assert_eq!(validate(FieldType::Ip, &Datum::Float(1.0)), None);
  }

  #[test]
  fn coerce_reports_type_and_value() {
    let err = coerce(FieldType::Ip, &"nope".into()).unwrap_err();
    assert_eq!(err.to_string(), "\"nope\" is not a valid ip value");
  }
}
