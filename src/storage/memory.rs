//! In-memory storage facility
//!
//! Reference host storage used by the write pipeline, the CLI and tests.
//!
//! - Relations keyed by id, with a separate name directory
//! - Rows keyed by a monotonically increasing `RowId`
//! - Prepared statements survive rollback; they resolve their target by
//!   name at execution time
//! - Changes made inside a transaction are recorded in an undo log;
//!   transaction and statement rollback replay it backwards
//! - Relation and row ids are never reused, even after rollback

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{LockMode, PreparedInsert, StorageError, StorageFacility, StorageResult};
use crate::row::{quote_identifier, QualifiedName, Relation, RelationId, RowImage, TupleDescriptor};

/// Identity of a stored row within its relation
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(u64);

impl RowId {
    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct TableData {
    relation: Relation,
    rows: BTreeMap<RowId, RowImage>,
}

/// Inverse of one change made inside a transaction
#[derive(Debug, Clone)]
enum UndoEntry {
    Created(RelationId),
    Renamed { id: RelationId, old_name: QualifiedName },
    Inserted { id: RelationId, row_id: RowId },
    Replaced { id: RelationId, row_id: RowId, old: RowImage },
    Removed { id: RelationId, row_id: RowId, old: RowImage },
}

/// Position in the transaction's undo log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Savepoint(usize);

/// In-memory relations, rows, prepared statements and locks
#[derive(Debug)]
pub struct MemoryStorage {
    tables: BTreeMap<RelationId, TableData>,
    names: HashMap<QualifiedName, RelationId>,
    next_relation: u32,
    next_row: u64,
    plans: HashMap<u64, QualifiedName>,
    next_plan: u64,
    locks: Vec<(RelationId, LockMode)>,
    in_transaction: bool,
    undo: Vec<UndoEntry>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            tables: BTreeMap::new(),
            names: HashMap::new(),
            next_relation: 16384,
            next_row: 1,
            plans: HashMap::new(),
            next_plan: 1,
            locks: Vec::new(),
            in_transaction: false,
            undo: Vec::new(),
        }
    }

    // Relations

    /// Creates a relation. Names are unique across schemas.
    pub fn create_relation(
        &mut self,
        name: QualifiedName,
        descriptor: TupleDescriptor,
    ) -> StorageResult<RelationId> {
        if self.names.contains_key(&name) {
            return Err(StorageError::duplicate_table(name.to_string()));
        }

        let id = RelationId::new(self.next_relation);
        self.next_relation += 1;

        self.names.insert(name.clone(), id);
        self.tables.insert(
            id,
            TableData {
                relation: Relation::new(id, name, descriptor),
                rows: BTreeMap::new(),
            },
        );
        self.record(UndoEntry::Created(id));
        Ok(id)
    }

    /// Renames a relation; its id is unchanged.
    pub fn rename_relation(&mut self, id: RelationId, new_name: QualifiedName) -> StorageResult<()> {
        if self.names.contains_key(&new_name) {
            return Err(StorageError::duplicate_table(new_name.to_string()));
        }
        let table = self
            .tables
            .get_mut(&id)
            .ok_or_else(|| StorageError::unknown_relation(id))?;

        self.names.remove(&table.relation.name);
        self.names.insert(new_name.clone(), id);
        let old_name = std::mem::replace(&mut table.relation.name, new_name);
        self.record(UndoEntry::Renamed { id, old_name });
        Ok(())
    }

    pub fn relation(&self, id: RelationId) -> StorageResult<&Relation> {
        self.table(id).map(|t| &t.relation)
    }

    pub fn resolve_name(&self, name: &QualifiedName) -> Option<RelationId> {
        self.names.get(name).copied()
    }

    /// All relations, ordered by id
    pub fn relations(&self) -> impl Iterator<Item = &Relation> {
        self.tables.values().map(|t| &t.relation)
    }

    // Rows

    pub fn rows(&self, id: RelationId) -> StorageResult<impl Iterator<Item = (RowId, &RowImage)>> {
        Ok(self.table(id)?.rows.iter().map(|(k, v)| (*k, v)))
    }

    pub fn row_count(&self, id: RelationId) -> StorageResult<usize> {
        Ok(self.table(id)?.rows.len())
    }

    pub fn row(&self, id: RelationId, row_id: RowId) -> StorageResult<&RowImage> {
        let table = self.table(id)?;
        table
            .rows
            .get(&row_id)
            .ok_or_else(|| StorageError::row_not_found(table.relation.name.to_string(), row_id))
    }

    /// Stores a new row after checking it against the relation's layout
    pub fn insert(&mut self, id: RelationId, row: RowImage) -> StorageResult<RowId> {
        let row_id = RowId(self.next_row);
        let table = self.table_mut(id)?;
        check_layout(&table.relation, &row)?;
        table.rows.insert(row_id, row);
        self.next_row += 1;
        self.record(UndoEntry::Inserted { id, row_id });
        Ok(row_id)
    }

    /// Replaces a row in place, returning the previous image
    pub fn replace(&mut self, id: RelationId, row_id: RowId, row: RowImage) -> StorageResult<RowImage> {
        let table = self.table_mut(id)?;
        check_layout(&table.relation, &row)?;
        let name = table.relation.name.to_string();
        let slot = table
            .rows
            .get_mut(&row_id)
            .ok_or_else(|| StorageError::row_not_found(name, row_id))?;
        let old = std::mem::replace(slot, row);
        self.record(UndoEntry::Replaced {
            id,
            row_id,
            old: old.clone(),
        });
        Ok(old)
    }

    /// Removes a row, returning its last image
    pub fn remove(&mut self, id: RelationId, row_id: RowId) -> StorageResult<RowImage> {
        let table = self.table_mut(id)?;
        let name = table.relation.name.to_string();
        let old = table
            .rows
            .remove(&row_id)
            .ok_or_else(|| StorageError::row_not_found(name, row_id))?;
        self.record(UndoEntry::Removed {
            id,
            row_id,
            old: old.clone(),
        });
        Ok(old)
    }

    // Transactions

    pub fn begin(&mut self) -> StorageResult<()> {
        if self.in_transaction {
            return Err(StorageError::invalid_transaction_state(
                "there is already a transaction in progress",
            ));
        }
        self.in_transaction = true;
        Ok(())
    }

    /// Makes all changes permanent and releases locks
    pub fn commit(&mut self) -> StorageResult<()> {
        self.end_transaction()?;
        self.undo.clear();
        Ok(())
    }

    /// Discards all changes since `begin` and releases locks
    pub fn rollback(&mut self) -> StorageResult<()> {
        self.end_transaction()?;
        self.undo_to(0);
        Ok(())
    }

    /// Marks the current position for statement-level rollback
    pub fn savepoint(&self) -> Savepoint {
        Savepoint(self.undo.len())
    }

    /// Undoes changes made since `savepoint`. Locks stay held.
    pub fn rollback_to(&mut self, savepoint: Savepoint) {
        self.undo_to(savepoint.0);
    }

    /// Locks held by the current transaction, in acquisition order
    pub fn held_locks(&self) -> &[(RelationId, LockMode)] {
        &self.locks
    }

    /// Number of prepared statements not yet released
    pub fn prepared_statements(&self) -> usize {
        self.plans.len()
    }

    fn end_transaction(&mut self) -> StorageResult<()> {
        if !self.in_transaction {
            return Err(StorageError::invalid_transaction_state(
                "there is no transaction in progress",
            ));
        }
        self.in_transaction = false;
        self.locks.clear();
        Ok(())
    }

    fn record(&mut self, entry: UndoEntry) {
        if self.in_transaction {
            self.undo.push(entry);
        }
    }

    fn undo_to(&mut self, position: usize) {
        if position >= self.undo.len() {
            return;
        }
        let undone = self.undo.split_off(position);
        for entry in undone.into_iter().rev() {
            match entry {
                UndoEntry::Created(id) => {
                    if let Some(table) = self.tables.remove(&id) {
                        self.names.remove(&table.relation.name);
                    }
                }
                UndoEntry::Renamed { id, old_name } => {
                    if let Some(table) = self.tables.get_mut(&id) {
                        self.names.remove(&table.relation.name);
                        self.names.insert(old_name.clone(), id);
                        table.relation.name = old_name;
                    }
                }
                UndoEntry::Inserted { id, row_id } => {
                    if let Some(table) = self.tables.get_mut(&id) {
                        table.rows.remove(&row_id);
                    }
                }
                UndoEntry::Replaced { id, row_id, old } | UndoEntry::Removed { id, row_id, old } => {
                    if let Some(table) = self.tables.get_mut(&id) {
                        table.rows.insert(row_id, old);
                    }
                }
            }
        }
    }

    fn table(&self, id: RelationId) -> StorageResult<&TableData> {
        self.tables
            .get(&id)
            .ok_or_else(|| StorageError::unknown_relation(id))
    }

    fn table_mut(&mut self, id: RelationId) -> StorageResult<&mut TableData> {
        self.tables
            .get_mut(&id)
            .ok_or_else(|| StorageError::unknown_relation(id))
    }
}

fn check_layout(relation: &Relation, row: &RowImage) -> StorageResult<()> {
    if row.conforms_to(&relation.descriptor) {
        return Ok(());
    }
    let reason = if row.len() != relation.descriptor.len() {
        format!(
            "expected {} columns, got {}",
            relation.descriptor.len(),
            row.len()
        )
    } else {
        "value type does not match column type".to_string()
    };
    Err(StorageError::row_shape_mismatch(relation.name.to_string(), reason))
}

impl StorageFacility for MemoryStorage {
    fn open_relation(&mut self, id: RelationId, lock: LockMode) -> StorageResult<Relation> {
        let relation = self.relation(id)?.clone();
        if !self.locks.contains(&(id, lock)) {
            self.locks.push((id, lock));
        }
        Ok(relation)
    }

    fn prepare_insert(&mut self, relation: &Relation) -> StorageResult<PreparedInsert> {
        let plan_id = self.next_plan;
        self.next_plan += 1;

        let statement = format!(
            "INSERT INTO {}.{} VALUES (($1).*)",
            quote_identifier(&relation.name.schema),
            quote_identifier(&relation.name.name)
        );
        self.plans.insert(plan_id, relation.name.clone());
        Ok(PreparedInsert::new(plan_id, relation.id, statement))
    }

    fn execute_insert(&mut self, plan: &PreparedInsert, row: RowImage) -> StorageResult<()> {
        let name = self
            .plans
            .get(&plan.plan_id())
            .ok_or_else(|| StorageError::unknown_statement(plan.plan_id()))?;
        let target = self
            .resolve_name(name)
            .ok_or_else(|| StorageError::undefined_table(name.to_string()))?;
        self.insert(target, row)?;
        Ok(())
    }

    fn release_insert(&mut self, plan: &PreparedInsert) {
        self.plans.remove(&plan.plan_id());
    }

    fn insert_row(&mut self, relation: RelationId, row: RowImage) -> StorageResult<()> {
        self.insert(relation, row)?;
        Ok(())
    }
}
