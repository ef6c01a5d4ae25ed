//! AnomalyDetector - post-write validation of row versions
//!
//! Two checks run after the row has been written:
//!
//! 1. The new image still carries `[now, infinity)`. A later BEFORE trigger
//!    may have rewritten the period after it was stamped.
//! 2. The old image was opened before the current transaction. A row opened
//!    by the current transaction has no history to write; a row opened by a
//!    later transaction is a serialization anomaly.

use std::cmp::Ordering;

use crate::row::RowImage;
use crate::temporal::TransactionClock;

use super::{Period, VersioningError, VersioningResult};

/// What to do with the pre-image of an UPDATE or DELETE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OldVersion {
    /// Opened by this transaction; nothing to archive
    SameTransaction,
    /// Opened earlier; close it and archive
    Archive,
}

pub struct AnomalyDetector<'a> {
    period: &'a Period,
}

impl<'a> AnomalyDetector<'a> {
    pub fn new(period: &'a Period) -> Self {
        Self { period }
    }

    /// Rejects a new image whose period is not `[now, infinity)`.
    ///
    /// The start column is checked first.
    pub fn verify_generated(&self, clock: &TransactionClock, new: &RowImage) -> VersioningResult<()> {
        let ty = self.period.temporal_type;

        let start_ok = match new.get(self.period.start) {
            Some(start) => ty.compare(start, &ty.now(clock))? == Ordering::Equal,
            None => false,
        };
        if !start_ok {
            return Err(VersioningError::generated_always_row_start(&self.period.start_name));
        }

        let end_ok = match new.get(self.period.end) {
            Some(end) => ty.compare(end, &ty.infinity())? == Ordering::Equal,
            None => false,
        };
        if !end_ok {
            return Err(VersioningError::generated_always_row_end(&self.period.end_name));
        }

        Ok(())
    }

    /// Classifies the pre-image by its start relative to the transaction
    /// start.
    pub fn check_old_version(&self, clock: &TransactionClock, old: &RowImage) -> VersioningResult<OldVersion> {
        let ty = self.period.temporal_type;
        let start = self.period.start_of(old)?;

        match ty.compare(start, &ty.now(clock))? {
            Ordering::Equal => Ok(OldVersion::SameTransaction),
            Ordering::Greater => Err(VersioningError::invalid_row_version()),
            Ordering::Less => Ok(OldVersion::Archive),
        }
    }
}
