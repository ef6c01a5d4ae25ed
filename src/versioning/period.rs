//! Period resolution against a relation's layout

use crate::catalog::PeriodColumns;
use crate::row::{Datum, RowImage, TupleDescriptor};
use crate::temporal::{TemporalError, TemporalType};

use super::{VersioningError, VersioningResult};

/// A system-time period resolved to column positions.
///
/// Re-derived on every trigger invocation; never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Period {
    pub start_name: String,
    pub end_name: String,
    pub start: usize,
    pub end: usize,
    pub temporal_type: TemporalType,
}

impl Period {
    /// Resolves the catalog's column names in `descriptor`.
    ///
    /// The period type is the start column's declared type; the end column
    /// must share it.
    pub fn resolve(descriptor: &TupleDescriptor, columns: &PeriodColumns) -> VersioningResult<Self> {
        let start = descriptor
            .position_of(&columns.start)
            .ok_or_else(|| VersioningError::undefined_column(&columns.start))?;
        let end = descriptor
            .position_of(&columns.end)
            .ok_or_else(|| VersioningError::undefined_column(&columns.end))?;

        // Both positions were found among live columns above
        let start_type = descriptor.columns()[start].column_type;
        let end_type = descriptor.columns()[end].column_type;

        let temporal_type = TemporalType::from_column_type(start_type)?;
        if end_type != start_type {
            return Err(TemporalError::TypeMismatch {
                expected: temporal_type,
                found: end_type,
            }
            .into());
        }

        Ok(Self {
            start_name: columns.start.clone(),
            end_name: columns.end.clone(),
            start,
            end,
            temporal_type,
        })
    }

    /// Start value of `row`; NULL is a contract violation
    pub fn start_of<'a>(&self, row: &'a RowImage) -> VersioningResult<&'a Datum> {
        row.get(self.start)
            .ok_or_else(|| VersioningError::null_period_value(&self.start_name))
    }
}
