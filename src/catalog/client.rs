//! Catalog lookup interface

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::CatalogResult;
use crate::row::RelationId;

/// Start and end column names of a period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodColumns {
    pub start: String,
    pub end: String,
}

impl PeriodColumns {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }
}

/// Read-only view of period and versioning metadata.
///
/// Implementations must answer from the authoritative catalog state at the
/// time of the call; the engine does not cache answers across invocations.
pub trait PeriodCatalogClient {
    /// Start/end columns of `period_name` on `table`.
    ///
    /// A missing period is `CatalogError::PeriodNotFound`, never a default.
    fn lookup_period_columns(&self, table: RelationId, period_name: &str) -> CatalogResult<PeriodColumns>;

    /// Column names excluded from version comparison; empty if none.
    fn lookup_excluded_columns(&self, table: RelationId) -> CatalogResult<BTreeSet<String>>;

    /// History relation of `table`, or `None` when system versioning is off.
    fn lookup_history_table(&self, table: RelationId) -> CatalogResult<Option<RelationId>>;
}

impl<C: PeriodCatalogClient + ?Sized> PeriodCatalogClient for &C {
    fn lookup_period_columns(&self, table: RelationId, period_name: &str) -> CatalogResult<PeriodColumns> {
        (**self).lookup_period_columns(table, period_name)
    }

    fn lookup_excluded_columns(&self, table: RelationId) -> CatalogResult<BTreeSet<String>> {
        (**self).lookup_excluded_columns(table)
    }

    fn lookup_history_table(&self, table: RelationId) -> CatalogResult<Option<RelationId>> {
        (**self).lookup_history_table(table)
    }
}
