//! RowStamper - writes the generated-always period values

use crate::row::RowImage;
use crate::temporal::TransactionClock;

use super::Period;

/// Sets a new row image's period to `[now, infinity)`
pub struct RowStamper<'a> {
    period: &'a Period,
}

impl<'a> RowStamper<'a> {
    pub fn new(period: &'a Period) -> Self {
        Self { period }
    }

    /// Overwrites the start and end columns, discarding whatever the writer
    /// supplied.
    pub fn stamp(&self, clock: &TransactionClock, mut row: RowImage) -> RowImage {
        let ty = self.period.temporal_type;
        row.set(self.period.start, Some(ty.now(clock)));
        row.set(self.period.end, Some(ty.infinity()));
        row
    }
}
