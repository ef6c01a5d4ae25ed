//! TemporalType - closed set of period column types

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;

use super::TransactionClock;
use crate::row::{ColumnType, Datum};

/// Open-ended end marker for `date` periods
pub const INFINITE_DATE: NaiveDate = NaiveDate::MAX;
/// Open-ended end marker for `timestamp` periods
pub const INFINITE_TIMESTAMP: NaiveDateTime = NaiveDateTime::MAX;
/// Open-ended end marker for `timestamptz` periods
pub const INFINITE_TIMESTAMPTZ: DateTime<Utc> = DateTime::<Utc>::MAX_UTC;

/// Contract violations raised by temporal operations.
///
/// These indicate a mis-configured period or a caller bug, never bad user
/// input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemporalError {
    #[error("unexpected type: {0}")]
    UnsupportedType(ColumnType),

    #[error("cannot compare {found} with {expected} period value")]
    TypeMismatch {
        expected: TemporalType,
        found: ColumnType,
    },
}

pub type TemporalResult<T> = Result<T, TemporalError>;

/// Type of a system-time period's start and end columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemporalType {
    /// Time-zone aware instant (`timestamptz`)
    TimestampTz,
    /// Naive local instant (`timestamp`)
    Timestamp,
    /// Calendar date (`date`)
    Date,
}

impl TemporalType {
    /// Resolves the period type from a column's declared type.
    ///
    /// This is the only place unknown types are rejected.
    pub fn from_column_type(column_type: ColumnType) -> TemporalResult<Self> {
        match column_type {
            ColumnType::TimestampTz => Ok(TemporalType::TimestampTz),
            ColumnType::Timestamp => Ok(TemporalType::Timestamp),
            ColumnType::Date => Ok(TemporalType::Date),
            other => Err(TemporalError::UnsupportedType(other)),
        }
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            TemporalType::TimestampTz => ColumnType::TimestampTz,
            TemporalType::Timestamp => ColumnType::Timestamp,
            TemporalType::Date => ColumnType::Date,
        }
    }

    /// The transaction's logical start projected into this type
    pub fn now(&self, clock: &TransactionClock) -> Datum {
        match self {
            TemporalType::TimestampTz => Datum::TimestampTz(clock.instant()),
            TemporalType::Timestamp => Datum::Timestamp(clock.local_timestamp()),
            TemporalType::Date => Datum::Date(clock.local_date()),
        }
    }

    /// The open-ended end marker
    pub fn infinity(&self) -> Datum {
        match self {
            TemporalType::TimestampTz => Datum::TimestampTz(INFINITE_TIMESTAMPTZ),
            TemporalType::Timestamp => Datum::Timestamp(INFINITE_TIMESTAMP),
            TemporalType::Date => Datum::Date(INFINITE_DATE),
        }
    }

    /// Three-way comparison of two values of this type
    pub fn compare(&self, a: &Datum, b: &Datum) -> TemporalResult<Ordering> {
        match (self, a, b) {
            (TemporalType::TimestampTz, Datum::TimestampTz(x), Datum::TimestampTz(y)) => Ok(x.cmp(y)),
            (TemporalType::Timestamp, Datum::Timestamp(x), Datum::Timestamp(y)) => Ok(x.cmp(y)),
            (TemporalType::Date, Datum::Date(x), Datum::Date(y)) => Ok(x.cmp(y)),
            _ => {
                let found = if a.column_type() != self.column_type() { a } else { b };
                Err(TemporalError::TypeMismatch {
                    expected: *self,
                    found: found.column_type(),
                })
            }
        }
    }
}

impl fmt::Display for TemporalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column_type().type_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    fn clock() -> TransactionClock {
        let offset = FixedOffset::west_opt(5 * 3600).unwrap();
        TransactionClock::new(offset.with_ymd_and_hms(2024, 6, 1, 8, 15, 0).unwrap())
    }

    #[test]
    fn test_resolves_only_temporal_columns() {
        assert_eq!(TemporalType::from_column_type(ColumnType::Date), Ok(TemporalType::Date));
        assert_eq!(
            TemporalType::from_column_type(ColumnType::Int),
            Err(TemporalError::UnsupportedType(ColumnType::Int))
        );
    }

    #[test]
    fn test_now_is_stable_within_a_transaction() {
        let clock = clock();
        for ty in [TemporalType::TimestampTz, TemporalType::Timestamp, TemporalType::Date] {
            assert_eq!(ty.now(&clock), ty.now(&clock));
            assert_eq!(ty.now(&clock).column_type(), ty.column_type());
        }
    }

    #[test]
    fn test_now_projections() {
        let clock = clock();
        assert_eq!(
            TemporalType::TimestampTz.now(&clock),
            Datum::TimestampTz(Utc.with_ymd_and_hms(2024, 6, 1, 13, 15, 0).unwrap())
        );
        assert_eq!(
            TemporalType::Timestamp.now(&clock),
            Datum::Timestamp(
                NaiveDate::from_ymd_opt(2024, 6, 1).unwrap().and_hms_opt(8, 15, 0).unwrap()
            )
        );
        assert_eq!(
            TemporalType::Date.now(&clock),
            Datum::Date(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
        );
    }

    #[test]
    fn test_infinity_is_greater_than_now() {
        let clock = clock();
        for ty in [TemporalType::TimestampTz, TemporalType::Timestamp, TemporalType::Date] {
            let ord = ty.compare(&ty.now(&clock), &ty.infinity()).unwrap();
            assert_eq!(ord, Ordering::Less);
            assert!(ty.infinity().is_infinite());
        }
    }

    #[test]
    fn test_compare_rejects_mixed_types() {
        let clock = clock();
        let err = TemporalType::Date
            .compare(&TemporalType::Timestamp.now(&clock), &TemporalType::Date.now(&clock))
            .unwrap_err();
        assert_eq!(
            err,
            TemporalError::TypeMismatch {
                expected: TemporalType::Date,
                found: ColumnType::Timestamp,
            }
        );
    }
}
