//! TransactionClock - the logical start instant of a transaction
//!
//! Sourced once per transaction by the host write pipeline. The fixed
//! offset is the session time zone used to project the instant into
//! naive timestamps and calendar dates.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};

/// Logical start of the enclosing transaction.
///
/// Immutable after construction; there is no way to advance it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TransactionClock {
    started_at: DateTime<FixedOffset>,
}

impl TransactionClock {
    /// Clock for a transaction started at `started_at` in the session zone
    /// carried by its offset.
    pub fn new(started_at: DateTime<FixedOffset>) -> Self {
        Self { started_at }
    }

    /// Clock for a session running in UTC
    pub fn utc(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at: started_at.fixed_offset(),
        }
    }

    pub fn started_at(&self) -> DateTime<FixedOffset> {
        self.started_at
    }

    /// The start instant as an absolute point in time
    pub fn instant(&self) -> DateTime<Utc> {
        self.started_at.with_timezone(&Utc)
    }

    /// Wall-clock time of the start instant in the session zone
    pub fn local_timestamp(&self) -> NaiveDateTime {
        self.started_at.naive_local()
    }

    /// Calendar date of the start instant in the session zone
    pub fn local_date(&self) -> NaiveDate {
        self.started_at.date_naive()
    }
}
