//! In-memory period catalog

use std::collections::{BTreeSet, HashMap};

use super::{CatalogError, CatalogResult, PeriodCatalogClient, PeriodColumns};
use crate::row::RelationId;

/// Period catalog held in memory.
///
/// Mirrors the three catalog tables of the extension: periods,
/// system-time excluded columns and system versioning.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCatalog {
    periods: HashMap<(RelationId, String), PeriodColumns>,
    excluded: HashMap<RelationId, BTreeSet<String>>,
    versioning: HashMap<RelationId, RelationId>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines a period on a table. Period names are unique per table.
    pub fn add_period(
        &mut self,
        table: RelationId,
        period_name: impl Into<String>,
        columns: PeriodColumns,
    ) -> CatalogResult<()> {
        let period = period_name.into();
        let key = (table, period.clone());
        if self.periods.contains_key(&key) {
            return Err(CatalogError::DuplicatePeriod { table, period });
        }
        self.periods.insert(key, columns);
        Ok(())
    }

    /// Removes a period, returning its columns if it existed
    pub fn drop_period(&mut self, table: RelationId, period_name: &str) -> Option<PeriodColumns> {
        self.periods.remove(&(table, period_name.to_string()))
    }

    /// Replaces the excluded column list of a table
    pub fn set_excluded_columns<I, S>(&mut self, table: RelationId, columns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = columns.into_iter().map(Into::into).collect();
        if set.is_empty() {
            self.excluded.remove(&table);
        } else {
            self.excluded.insert(table, set);
        }
    }

    pub fn enable_system_versioning(&mut self, table: RelationId, history: RelationId) {
        self.versioning.insert(table, history);
    }

    pub fn disable_system_versioning(&mut self, table: RelationId) -> Option<RelationId> {
        self.versioning.remove(&table)
    }
}

impl PeriodCatalogClient for InMemoryCatalog {
    fn lookup_period_columns(&self, table: RelationId, period_name: &str) -> CatalogResult<PeriodColumns> {
        self.periods
            .get(&(table, period_name.to_string()))
            .cloned()
            .ok_or_else(|| CatalogError::PeriodNotFound {
                table,
                period: period_name.to_string(),
            })
    }

    fn lookup_excluded_columns(&self, table: RelationId) -> CatalogResult<BTreeSet<String>> {
        Ok(self.excluded.get(&table).cloned().unwrap_or_default())
    }

    fn lookup_history_table(&self, table: RelationId) -> CatalogResult<Option<RelationId>> {
        Ok(self.versioning.get(&table).copied())
    }
}
