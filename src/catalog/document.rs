//! JSON form of the period catalog
//!
//! Tables are referenced by (optionally schema-qualified) name and resolved
//! to relation ids against whatever directory the host keeps.
//!
//! ```json
//! {
//!   "periods": [
//!     {"table_name": "employees", "period_name": "system_time",
//!      "start_column_name": "sys_start", "end_column_name": "sys_end"}
//!   ],
//!   "system_time_periods": [
//!     {"table_name": "employees", "excluded_column_names": ["last_login"]}
//!   ],
//!   "system_versioning": [
//!     {"table_name": "employees", "history_table_name": "employees_history"}
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};

use super::{CatalogError, CatalogResult, InMemoryCatalog, PeriodColumns};
use crate::row::{QualifiedName, RelationId};

/// A row of the periods catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodEntry {
    pub table_name: String,
    pub period_name: String,
    pub start_column_name: String,
    pub end_column_name: String,
}

/// A row of the system-time catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemTimeEntry {
    pub table_name: String,
    #[serde(default)]
    pub excluded_column_names: Vec<String>,
}

/// A row of the system-versioning catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersioningEntry {
    pub table_name: String,
    pub history_table_name: String,
}

/// Complete catalog as stored on disk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogDocument {
    #[serde(default)]
    pub periods: Vec<PeriodEntry>,
    #[serde(default)]
    pub system_time_periods: Vec<SystemTimeEntry>,
    #[serde(default)]
    pub system_versioning: Vec<VersioningEntry>,
}

impl CatalogDocument {
    /// Builds an in-memory catalog, resolving every table name through
    /// `resolve`. An unresolvable name fails the whole document.
    pub fn resolve<F>(&self, resolve: F) -> CatalogResult<InMemoryCatalog>
    where
        F: Fn(&QualifiedName) -> Option<RelationId>,
    {
        let lookup = |text: &str| {
            let name = QualifiedName::parse(text);
            resolve(&name).ok_or_else(|| CatalogError::UnknownRelation(name.to_string()))
        };

        let mut catalog = InMemoryCatalog::new();

        for entry in &self.periods {
            let table = lookup(&entry.table_name)?;
            catalog.add_period(
                table,
                entry.period_name.clone(),
                PeriodColumns::new(&entry.start_column_name, &entry.end_column_name),
            )?;
        }

        for entry in &self.system_time_periods {
            let table = lookup(&entry.table_name)?;
            catalog.set_excluded_columns(table, entry.excluded_column_names.iter().cloned());
        }

        for entry in &self.system_versioning {
            let table = lookup(&entry.table_name)?;
            let history = lookup(&entry.history_table_name)?;
            catalog.enable_system_versioning(table, history);
        }

        Ok(catalog)
    }
}
