//! Workload files
//!
//! A workload declares tables, the period catalog and a list of
//! transactions to run against them:
//!
//! ```json
//! {
//!   "tables": [
//!     {"name": "accounts", "columns": [{"name": "id", "type": "int"}, ...]}
//!   ],
//!   "catalog": {"periods": [...], "system_versioning": [...]},
//!   "transactions": [
//!     {"start": "2024-01-01T09:00:00+01:00",
//!      "statements": [
//!        {"op": "insert", "table": "accounts", "values": {"id": 1}},
//!        {"op": "update", "table": "accounts", "where": {"id": 1}, "set": {"balance": 5}},
//!        {"op": "delete", "table": "accounts", "where": {"id": 1}},
//!        {"op": "rename", "table": "accounts_history", "to": "archive.accounts_history"}
//!      ]}
//!   ]
//! }
//! ```
//!
//! The offset of `start` is the session time zone of the transaction.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::catalog::{CatalogDocument, InMemoryCatalog, PeriodCatalogClient};
use crate::row::{Datum, QualifiedName, RelationId, RowImage, TupleDescriptor};
use crate::storage::MemoryStorage;
use crate::temporal::TransactionClock;
use crate::versioning::TransactionContext;

use super::errors::{CliError, CliResult};

#[derive(Debug, Clone, Deserialize)]
pub struct TableSpec {
    /// Table name, optionally schema-qualified
    pub name: String,
    pub columns: TupleDescriptor,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionSpec {
    /// Logical start of the transaction in the session time zone
    pub start: DateTime<FixedOffset>,

    #[serde(default)]
    pub id: Option<Uuid>,

    #[serde(default)]
    pub statements: Vec<Statement>,

    /// Roll back instead of committing
    #[serde(default)]
    pub rollback: bool,
}

impl TransactionSpec {
    pub fn context(&self) -> TransactionContext {
        let clock = TransactionClock::new(self.start);
        match self.id {
            Some(id) => TransactionContext::with_id(id, clock),
            None => TransactionContext::new(clock),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Statement {
    Insert {
        table: String,
        #[serde(default)]
        values: Map<String, Value>,
    },
    Update {
        table: String,
        #[serde(default, rename = "where")]
        filter: Map<String, Value>,
        set: Map<String, Value>,
    },
    Delete {
        table: String,
        #[serde(default, rename = "where")]
        filter: Map<String, Value>,
    },
    Rename {
        table: String,
        to: String,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Workload {
    #[serde(default)]
    pub tables: Vec<TableSpec>,

    #[serde(default)]
    pub catalog: CatalogDocument,

    #[serde(default)]
    pub transactions: Vec<TransactionSpec>,
}

/// Storage and catalog built from a workload's declarations
pub struct Setup {
    pub storage: MemoryStorage,
    pub catalog: InMemoryCatalog,
    /// Tables that carry the configured period, in declaration order
    pub versioned: Vec<RelationId>,
}

impl Workload {
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::io_error(format!("failed to read '{}': {}", path.display(), e)))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> CliResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn statement_count(&self) -> usize {
        self.transactions.iter().map(|t| t.statements.len()).sum()
    }

    /// Creates the declared tables and resolves the catalog against them
    pub fn build(&self, period_name: &str) -> CliResult<Setup> {
        let mut storage = MemoryStorage::new();
        let mut declared = Vec::with_capacity(self.tables.len());
        for table in &self.tables {
            let id = storage
                .create_relation(QualifiedName::parse(&table.name), table.columns.clone())
                .map_err(|e| CliError::workload_error(e.message().to_string()))?;
            declared.push(id);
        }

        let catalog = self.catalog.resolve(|name| storage.resolve_name(name))?;
        let versioned = declared
            .into_iter()
            .filter(|id| catalog.lookup_period_columns(*id, period_name).is_ok())
            .collect();

        Ok(Setup {
            storage,
            catalog,
            versioned,
        })
    }
}

/// A statement bound to relation ids and typed values
#[derive(Debug, Clone, PartialEq)]
pub enum BoundStatement {
    Insert {
        table: RelationId,
        row: RowImage,
    },
    Update {
        table: RelationId,
        filter: Vec<(String, Option<Datum>)>,
        set: Vec<(String, Option<Datum>)>,
    },
    Delete {
        table: RelationId,
        filter: Vec<(String, Option<Datum>)>,
    },
    Rename {
        table: RelationId,
        to: QualifiedName,
    },
}

/// Name directory used to bind statements
#[derive(Debug, Clone)]
pub struct Schema {
    names: HashMap<QualifiedName, RelationId>,
    descriptors: HashMap<RelationId, TupleDescriptor>,
}

impl Schema {
    pub fn from_storage(storage: &MemoryStorage) -> Self {
        let mut names = HashMap::new();
        let mut descriptors = HashMap::new();
        for relation in storage.relations() {
            names.insert(relation.name.clone(), relation.id);
            descriptors.insert(relation.id, relation.descriptor.clone());
        }
        Self { names, descriptors }
    }

    pub fn bind(&self, statement: &Statement) -> CliResult<BoundStatement> {
        match statement {
            Statement::Insert { table, values } => {
                let (id, descriptor) = self.table(table)?;
                let mut row = RowImage::nulls(descriptor.len());
                for (name, value) in typed_values(descriptor, table, values)? {
                    if let Some(position) = descriptor.position_of(&name) {
                        row.set(position, value);
                    }
                }
                Ok(BoundStatement::Insert { table: id, row })
            }
            Statement::Update { table, filter, set } => {
                let (id, descriptor) = self.table(table)?;
                Ok(BoundStatement::Update {
                    table: id,
                    filter: typed_values(descriptor, table, filter)?,
                    set: typed_values(descriptor, table, set)?,
                })
            }
            Statement::Delete { table, filter } => {
                let (id, descriptor) = self.table(table)?;
                Ok(BoundStatement::Delete {
                    table: id,
                    filter: typed_values(descriptor, table, filter)?,
                })
            }
            Statement::Rename { table, to } => {
                let (id, _) = self.table(table)?;
                Ok(BoundStatement::Rename {
                    table: id,
                    to: QualifiedName::parse(to),
                })
            }
        }
    }

    /// Applies a rename to the directory
    pub fn rename(&mut self, table: RelationId, to: QualifiedName) -> CliResult<()> {
        if self.names.contains_key(&to) {
            return Err(CliError::workload_error(format!("relation \"{}\" already exists", to)));
        }
        self.names.retain(|_, id| *id != table);
        self.names.insert(to, table);
        Ok(())
    }

    pub fn descriptor(&self, table: RelationId) -> Option<&TupleDescriptor> {
        self.descriptors.get(&table)
    }

    fn table(&self, name: &str) -> CliResult<(RelationId, &TupleDescriptor)> {
        let qualified = QualifiedName::parse(name);
        self.names
            .get(&qualified)
            .and_then(|id| self.descriptors.get(id).map(|d| (*id, d)))
            .ok_or_else(|| CliError::workload_error(format!("relation \"{}\" does not exist", qualified)))
    }
}

fn typed_values(
    descriptor: &TupleDescriptor,
    table: &str,
    values: &Map<String, Value>,
) -> CliResult<Vec<(String, Option<Datum>)>> {
    values
        .iter()
        .map(|(name, value)| {
            let position = descriptor.position_of(name).ok_or_else(|| {
                CliError::workload_error(format!(
                    "column \"{}\" of relation \"{}\" does not exist",
                    name, table
                ))
            })?;
            let column_type = descriptor.columns()[position].column_type;
            let datum = Datum::from_json(value, column_type)
                .map_err(|e| CliError::workload_error(format!("column \"{}\": {}", name, e)))?;
            Ok((name.clone(), datum))
        })
        .collect()
}
