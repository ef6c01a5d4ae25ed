//! ChangeClassifier - is an update version-significant?
//!
//! An update that changes only excluded columns does not open a new row
//! version. Every other live column is compared with canonical equality:
//! NULL equals NULL, NULL never equals a value, and values compare per
//! type. Period columns are compared like any other column.

use std::collections::{BTreeSet, HashSet};

use crate::row::{RowImage, TupleDescriptor};

use super::{VersioningError, VersioningResult};

/// Column positions ignored when classifying an update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExcludedColumnSet {
    positions: HashSet<usize>,
}

impl ExcludedColumnSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Resolves catalog column names to positions in `descriptor`.
    ///
    /// A name the table does not have is an undefined-column error.
    pub fn resolve(descriptor: &TupleDescriptor, names: &BTreeSet<String>) -> VersioningResult<Self> {
        let positions = names
            .iter()
            .map(|name| {
                descriptor
                    .position_of(name)
                    .ok_or_else(|| VersioningError::undefined_column(name))
            })
            .collect::<VersioningResult<HashSet<_>>>()?;
        Ok(Self { positions })
    }

    pub fn contains(&self, position: usize) -> bool {
        self.positions.contains(&position)
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }
}

/// Classifies updates by the columns they change
pub struct ChangeClassifier;

impl ChangeClassifier {
    /// True iff at least one column is excluded and every non-excluded live
    /// column is equal between `old` and `new`.
    pub fn only_excluded_changed(
        descriptor: &TupleDescriptor,
        excluded: &ExcludedColumnSet,
        old: &RowImage,
        new: &RowImage,
    ) -> bool {
        if excluded.is_empty() {
            return false;
        }

        descriptor
            .live_columns()
            .filter(|(position, _)| !excluded.contains(*position))
            .all(|(position, _)| match (old.get(position), new.get(position)) {
                (None, None) => true,
                (Some(a), Some(b)) => a.canonical_eq(b),
                _ => false,
            })
    }
}
