//! RowImage - one version of a row
//!
//! A row image holds exactly one slot per descriptor column. `None` is SQL
//! NULL; dropped columns are always NULL.

use super::{Datum, TupleDescriptor};

/// One version of a row: an old pre-image or a new post-image.
#[derive(Debug, Clone, PartialEq)]
pub struct RowImage {
    values: Vec<Option<Datum>>,
}

impl RowImage {
    pub fn new(values: Vec<Option<Datum>>) -> Self {
        Self { values }
    }

    /// A row of `len` NULLs
    pub fn nulls(len: usize) -> Self {
        Self {
            values: vec![None; len],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at `position`; `None` for NULL or out-of-range positions
    pub fn get(&self, position: usize) -> Option<&Datum> {
        self.values.get(position).and_then(|v| v.as_ref())
    }

    pub fn is_null(&self, position: usize) -> bool {
        self.get(position).is_none()
    }

    /// Overwrites a slot, growing the row with NULLs if needed
    pub fn set(&mut self, position: usize, value: Option<Datum>) {
        if position >= self.values.len() {
            self.values.resize(position + 1, None);
        }
        self.values[position] = value;
    }

    /// Builder form of `set`
    pub fn with(mut self, position: usize, value: Option<Datum>) -> Self {
        self.set(position, value);
        self
    }

    pub fn values(&self) -> &[Option<Datum>] {
        &self.values
    }

    /// Resizes to exactly `len` slots; missing trailing slots become NULL
    pub fn widened(mut self, len: usize) -> Self {
        self.values.resize(len, None);
        self
    }

    /// True when the row has one slot per column, dropped columns are NULL
    /// and every value matches its column's declared type.
    pub fn conforms_to(&self, descriptor: &TupleDescriptor) -> bool {
        self.values.len() == descriptor.len()
            && descriptor
                .columns()
                .iter()
                .zip(&self.values)
                .all(|(column, value)| match value {
                    None => true,
                    Some(_) if column.dropped => false,
                    Some(datum) => datum.column_type() == column.column_type,
                })
    }
}
