//! Column values and declared column types
//!
//! Values are owned and fully materialized; a SQL NULL is represented by the
//! absence of a `Datum` (`Option<Datum>` in a `RowImage`), never by a variant.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::temporal::{INFINITE_DATE, INFINITE_TIMESTAMP, INFINITE_TIMESTAMPTZ};

/// Declared type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Bool,
    Int,
    Float,
    Text,
    Bytes,
    Date,
    Timestamp,
    TimestampTz,
}

impl ColumnType {
    /// Returns the SQL type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            ColumnType::Bool => "boolean",
            ColumnType::Int => "bigint",
            ColumnType::Float => "double precision",
            ColumnType::Text => "text",
            ColumnType::Bytes => "bytea",
            ColumnType::Date => "date",
            ColumnType::Timestamp => "timestamp without time zone",
            ColumnType::TimestampTz => "timestamp with time zone",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// A non-null column value
#[derive(Debug, Clone)]
pub enum Datum {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
}

impl Datum {
    /// Returns the column type this value belongs to
    pub fn column_type(&self) -> ColumnType {
        match self {
            Datum::Bool(_) => ColumnType::Bool,
            Datum::Int(_) => ColumnType::Int,
            Datum::Float(_) => ColumnType::Float,
            Datum::Text(_) => ColumnType::Text,
            Datum::Bytes(_) => ColumnType::Bytes,
            Datum::Date(_) => ColumnType::Date,
            Datum::Timestamp(_) => ColumnType::Timestamp,
            Datum::TimestampTz(_) => ColumnType::TimestampTz,
        }
    }

    /// Canonical equality for the value's type.
    ///
    /// Floats follow SQL `float8` equality: all NaNs are equal to each other
    /// and `-0.0` equals `0.0`. Values of different types are never equal.
    pub fn canonical_eq(&self, other: &Datum) -> bool {
        match (self, other) {
            (Datum::Bool(a), Datum::Bool(b)) => a == b,
            (Datum::Int(a), Datum::Int(b)) => a == b,
            (Datum::Float(a), Datum::Float(b)) => (a.is_nan() && b.is_nan()) || a == b,
            (Datum::Text(a), Datum::Text(b)) => a == b,
            (Datum::Bytes(a), Datum::Bytes(b)) => a == b,
            (Datum::Date(a), Datum::Date(b)) => a == b,
            (Datum::Timestamp(a), Datum::Timestamp(b)) => a == b,
            (Datum::TimestampTz(a), Datum::TimestampTz(b)) => a == b,
            _ => false,
        }
    }

    /// True for the open-ended temporal sentinel
    pub fn is_infinite(&self) -> bool {
        match self {
            Datum::Date(d) => *d == INFINITE_DATE,
            Datum::Timestamp(ts) => *ts == INFINITE_TIMESTAMP,
            Datum::TimestampTz(ts) => *ts == INFINITE_TIMESTAMPTZ,
            _ => false,
        }
    }

    /// Renders a nullable value as JSON for workload output.
    pub fn to_json(value: Option<&Datum>) -> Value {
        let datum = match value {
            Some(d) => d,
            None => return Value::Null,
        };
        if datum.is_infinite() {
            return Value::String("infinity".into());
        }
        match datum {
            Datum::Bool(b) => Value::Bool(*b),
            Datum::Int(i) => Value::from(*i),
            Datum::Float(x) => serde_json::Number::from_f64(*x)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(x.to_string())),
            _ => Value::String(datum.to_string()),
        }
    }

    /// Coerces a JSON value into a datum of the declared column type.
    ///
    /// Temporal columns accept the string `"infinity"`.
    pub fn from_json(value: &Value, column_type: ColumnType) -> Result<Option<Datum>, String> {
        if value.is_null() {
            return Ok(None);
        }

        let mismatch = || format!("expected {}, got {}", column_type.type_name(), value);

        let datum = match column_type {
            ColumnType::Bool => Datum::Bool(value.as_bool().ok_or_else(mismatch)?),
            ColumnType::Int => Datum::Int(value.as_i64().ok_or_else(mismatch)?),
            ColumnType::Float => Datum::Float(value.as_f64().ok_or_else(mismatch)?),
            ColumnType::Text => Datum::Text(value.as_str().ok_or_else(mismatch)?.to_string()),
            ColumnType::Bytes => {
                let text = value.as_str().ok_or_else(mismatch)?;
                Datum::Bytes(decode_hex(text).ok_or_else(mismatch)?)
            }
            ColumnType::Date => {
                let text = value.as_str().ok_or_else(mismatch)?;
                if text == "infinity" {
                    Datum::Date(INFINITE_DATE)
                } else {
                    Datum::Date(NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|e| e.to_string())?)
                }
            }
            ColumnType::Timestamp => {
                let text = value.as_str().ok_or_else(mismatch)?;
                if text == "infinity" {
                    Datum::Timestamp(INFINITE_TIMESTAMP)
                } else {
                    let parsed = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
                        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f"))
                        .map_err(|e| e.to_string())?;
                    Datum::Timestamp(parsed)
                }
            }
            ColumnType::TimestampTz => {
                let text = value.as_str().ok_or_else(mismatch)?;
                if text == "infinity" {
                    Datum::TimestampTz(INFINITE_TIMESTAMPTZ)
                } else {
                    let parsed = DateTime::parse_from_rfc3339(text).map_err(|e| e.to_string())?;
                    Datum::TimestampTz(parsed.with_timezone(&Utc))
                }
            }
        };

        Ok(Some(datum))
    }
}

impl PartialEq for Datum {
    fn eq(&self, other: &Self) -> bool {
        self.canonical_eq(other)
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_infinite() {
            return write!(f, "infinity");
        }
        match self {
            Datum::Bool(b) => write!(f, "{}", b),
            Datum::Int(i) => write!(f, "{}", i),
            Datum::Float(x) => write!(f, "{}", x),
            Datum::Text(s) => write!(f, "{}", s),
            Datum::Bytes(bytes) => {
                write!(f, "\\x")?;
                for b in bytes {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
            Datum::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Datum::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S%.f")),
            Datum::TimestampTz(ts) => write!(f, "{}", ts.to_rfc3339()),
        }
    }
}

/// Decodes `\x`-prefixed (or bare) hex text
fn decode_hex(text: &str) -> Option<Vec<u8>> {
    let digits = text.strip_prefix("\\x").unwrap_or(text);
    if digits.len() % 2 != 0 {
        return None;
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_null_is_sql_null() {
        assert_eq!(Datum::from_json(&Value::Null, ColumnType::Int).unwrap(), None);
    }

    #[test]
    fn test_float_equality_is_canonical() {
        assert!(Datum::Float(f64::NAN).canonical_eq(&Datum::Float(f64::NAN)));
        assert!(Datum::Float(-0.0).canonical_eq(&Datum::Float(0.0)));
        assert!(!Datum::Float(1.0).canonical_eq(&Datum::Float(1.5)));
    }

    #[test]
    fn test_different_types_never_equal() {
        assert_ne!(Datum::Int(1), Datum::Float(1.0));
        assert_ne!(Datum::Text("1".into()), Datum::Int(1));
    }

    #[test]
    fn test_infinity_json() {
        let inf = Datum::from_json(&json!("infinity"), ColumnType::TimestampTz)
            .unwrap()
            .unwrap();
        assert!(inf.is_infinite());
        assert_eq!(Datum::to_json(Some(&inf)), json!("infinity"));
        assert_eq!(inf.to_string(), "infinity");
    }

    #[test]
    fn test_timestamp_accepts_both_separators() {
        let a = Datum::from_json(&json!("2024-01-02T03:04:05"), ColumnType::Timestamp).unwrap();
        let b = Datum::from_json(&json!("2024-01-02 03:04:05"), ColumnType::Timestamp).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_type_mismatch_reports_expected_type() {
        let err = Datum::from_json(&json!("abc"), ColumnType::Int).unwrap_err();
        assert!(err.contains("bigint"));
    }

    #[test]
    fn test_bytes_hex() {
        let d = Datum::from_json(&json!("\\xdeadbeef"), ColumnType::Bytes).unwrap().unwrap();
        assert_eq!(d, Datum::Bytes(vec![0xde, 0xad, 0xbe, 0xef]));
        assert_eq!(d.to_string(), "\\xdeadbeef");
        assert!(Datum::from_json(&json!("\\xabc"), ColumnType::Bytes).is_err());
    }
}
