//! Tuple descriptors: the ordered column layout of a relation
//!
//! Column positions are zero-based and stable for the lifetime of a
//! relation. Dropped columns keep their slot so positions never shift.

use serde::{Deserialize, Serialize};

use super::ColumnType;

/// A single column of a relation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name
    pub name: String,
    /// Declared type
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Dropped columns keep their position but hold no data
    #[serde(default)]
    pub dropped: bool,
}

impl ColumnDef {
    /// Create a live column
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            dropped: false,
        }
    }

    /// Create a dropped column placeholder
    pub fn dropped(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            dropped: true,
        }
    }
}

/// Ordered column layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TupleDescriptor {
    columns: Vec<ColumnDef>,
}

impl TupleDescriptor {
    pub fn new(columns: Vec<ColumnDef>) -> Self {
        Self { columns }
    }

    /// Number of column slots, dropped ones included
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn column(&self, position: usize) -> Option<&ColumnDef> {
        self.columns.get(position)
    }

    /// Position of the live column with the given name.
    ///
    /// Dropped columns are never found by name.
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| !c.dropped && c.name == name)
    }

    /// Iterates live columns with their positions
    pub fn live_columns(&self) -> impl Iterator<Item = (usize, &ColumnDef)> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.dropped)
    }

    /// True when both layouts have the same names, types and dropped slots
    /// at every position, so rows can be copied without conversion.
    pub fn same_shape(&self, other: &TupleDescriptor) -> bool {
        self.columns.len() == other.columns.len()
            && self.columns.iter().zip(&other.columns).all(|(a, b)| {
                a.dropped == b.dropped
                    && (a.dropped || (a.name == b.name && a.column_type == b.column_type))
            })
    }
}
