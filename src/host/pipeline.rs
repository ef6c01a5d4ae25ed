//! WritePipeline - reference host for the versioning triggers
//!
//! Runs every row write as BEFORE ROW trigger, storage write, AFTER ROW
//! trigger. A statement is rolled back as a unit when any row of it fails,
//! so a rejected write leaves neither the live row nor a history row behind.

use std::collections::{HashMap, HashSet};

use crate::catalog::PeriodCatalogClient;
use crate::observability::Event;
use crate::row::{Datum, QualifiedName, RelationId, RowImage, TupleDescriptor};
use crate::storage::{MemoryStorage, RowId};
use crate::versioning::{
    TransactionContext, TriggerData, TriggerEvent, TriggerOperation, VersionOutcome, VersioningEngine,
};

use super::{HostError, HostResult};

/// Row rewrite applied after the period has been stamped.
///
/// Stands in for a user trigger that fires after the stamping trigger.
pub type AfterStampHook = Box<dyn Fn(RowImage) -> RowImage>;

pub struct WritePipeline<C> {
    storage: MemoryStorage,
    engine: VersioningEngine<C>,
    versioned: HashSet<RelationId>,
    hooks: HashMap<RelationId, Vec<AfterStampHook>>,
    current: Option<TransactionContext>,
    outcomes: Vec<(RelationId, VersionOutcome)>,
}

impl<C: PeriodCatalogClient> WritePipeline<C> {
    pub fn new(engine: VersioningEngine<C>) -> Self {
        Self::with_storage(MemoryStorage::new(), engine)
    }

    /// Pipeline over relations that already exist
    pub fn with_storage(storage: MemoryStorage, engine: VersioningEngine<C>) -> Self {
        Self {
            storage,
            engine,
            versioned: HashSet::new(),
            hooks: HashMap::new(),
            current: None,
            outcomes: Vec::new(),
        }
    }

    // Schema

    pub fn create_table(&mut self, name: QualifiedName, descriptor: TupleDescriptor) -> HostResult<RelationId> {
        Ok(self.storage.create_relation(name, descriptor)?)
    }

    pub fn rename_table(&mut self, table: RelationId, new_name: QualifiedName) -> HostResult<()> {
        Ok(self.storage.rename_relation(table, new_name)?)
    }

    /// Installs the stamping and history triggers on `table`
    pub fn install_versioning(&mut self, table: RelationId) -> HostResult<()> {
        self.storage.relation(table)?;
        self.versioned.insert(table);
        Ok(())
    }

    pub fn is_versioned(&self, table: RelationId) -> bool {
        self.versioned.contains(&table)
    }

    pub fn add_after_stamp_hook(&mut self, table: RelationId, hook: AfterStampHook) {
        self.hooks.entry(table).or_default().push(hook);
    }

    // Transactions

    pub fn begin(&mut self, txn: TransactionContext) -> HostResult<()> {
        self.storage.begin()?;
        self.current = Some(txn);
        Ok(())
    }

    pub fn commit(&mut self) -> HostResult<()> {
        let txn = self.current.ok_or(HostError::NoTransaction)?;
        self.storage.commit()?;
        self.current = None;
        self.engine.logger().event(Event::TransactionCommitted, &[("txn", &txn.id.to_string())]);
        Ok(())
    }

    pub fn rollback(&mut self) -> HostResult<()> {
        let txn = self.current.ok_or(HostError::NoTransaction)?;
        self.storage.rollback()?;
        self.current = None;
        self.engine.logger().event(
            Event::TransactionRolledBack,
            &[("scope", "transaction"), ("txn", &txn.id.to_string())],
        );
        Ok(())
    }

    // Statements

    pub fn insert(&mut self, table: RelationId, row: RowImage) -> HostResult<RowId> {
        self.statement(|p, txn| p.insert_row(txn, table, row))
    }

    /// Updates one row, assigning values by column name
    pub fn update<S: AsRef<str>>(
        &mut self,
        table: RelationId,
        row_id: RowId,
        assignments: &[(S, Option<Datum>)],
    ) -> HostResult<()> {
        self.statement(|p, txn| p.update_row(txn, table, row_id, assignments))
    }

    pub fn delete(&mut self, table: RelationId, row_id: RowId) -> HostResult<()> {
        self.statement(|p, txn| p.delete_row(txn, table, row_id))
    }

    /// Updates every row matching `filter` as one statement; returns the
    /// number of rows updated.
    pub fn update_where<S: AsRef<str>, F: AsRef<str>>(
        &mut self,
        table: RelationId,
        filter: &[(F, Option<Datum>)],
        assignments: &[(S, Option<Datum>)],
    ) -> HostResult<usize> {
        let targets = self.find_rows(table, filter)?;
        self.statement(|p, txn| {
            for row_id in &targets {
                p.update_row(txn, table, *row_id, assignments)?;
            }
            Ok(targets.len())
        })
    }

    /// Deletes every row matching `filter` as one statement
    pub fn delete_where<F: AsRef<str>>(
        &mut self,
        table: RelationId,
        filter: &[(F, Option<Datum>)],
    ) -> HostResult<usize> {
        let targets = self.find_rows(table, filter)?;
        self.statement(|p, txn| {
            for row_id in &targets {
                p.delete_row(txn, table, *row_id)?;
            }
            Ok(targets.len())
        })
    }

    /// Rows whose named columns all equal the given values
    pub fn find_rows<F: AsRef<str>>(&self, table: RelationId, filter: &[(F, Option<Datum>)]) -> HostResult<Vec<RowId>> {
        let descriptor = &self.storage.relation(table)?.descriptor;
        let conditions = filter
            .iter()
            .map(|(name, value)| Ok((column_position(descriptor, table, name.as_ref())?, value)))
            .collect::<HostResult<Vec<_>>>()?;

        Ok(self
            .storage
            .rows(table)?
            .filter(|(_, row)| {
                conditions.iter().all(|(position, value)| match (row.get(*position), value) {
                    (Some(a), Some(b)) => a.canonical_eq(b),
                    (None, None) => true,
                    _ => false,
                })
            })
            .map(|(id, _)| id)
            .collect())
    }

    // Accessors

    pub fn storage(&self) -> &MemoryStorage {
        &self.storage
    }

    pub fn engine(&self) -> &VersioningEngine<C> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut VersioningEngine<C> {
        &mut self.engine
    }

    /// History trigger outcomes in execution order, rolled-back statements
    /// excluded
    pub fn outcomes(&self) -> &[(RelationId, VersionOutcome)] {
        &self.outcomes
    }

    fn statement<T>(
        &mut self,
        body: impl FnOnce(&mut Self, &TransactionContext) -> HostResult<T>,
    ) -> HostResult<T> {
        let txn = self.current.ok_or(HostError::NoTransaction)?;
        let savepoint = self.storage.savepoint();
        let recorded = self.outcomes.len();

        match body(self, &txn) {
            Ok(value) => Ok(value),
            Err(e) => {
                self.storage.rollback_to(savepoint);
                self.outcomes.truncate(recorded);
                self.engine.logger().event(
                    Event::TransactionRolledBack,
                    &[
                        ("reason", &e.to_string()),
                        ("scope", "statement"),
                        ("txn", &txn.id.to_string()),
                    ],
                );
                Err(e)
            }
        }
    }

    fn insert_row(&mut self, txn: &TransactionContext, table: RelationId, mut row: RowImage) -> HostResult<RowId> {
        let relation = self.storage.relation(table)?.clone();
        let versioned = self.is_versioned(table);

        if versioned {
            let before = TriggerData::new(
                TriggerEvent::before_row(TriggerOperation::Insert),
                relation.clone(),
                Some(row),
                None,
            );
            row = self.engine.stamp_period(txn, &before)?;
        }
        let row = self.run_hooks(table, row);

        let row_id = self.storage.insert(table, row.clone())?;

        if versioned {
            let after = TriggerData::new(
                TriggerEvent::after_row(TriggerOperation::Insert),
                relation,
                Some(row),
                None,
            );
            let outcome = self.engine.write_history(txn, &after, &mut self.storage)?;
            self.outcomes.push((table, outcome));
        }
        Ok(row_id)
    }

    fn update_row<S: AsRef<str>>(
        &mut self,
        txn: &TransactionContext,
        table: RelationId,
        row_id: RowId,
        assignments: &[(S, Option<Datum>)],
    ) -> HostResult<()> {
        let relation = self.storage.relation(table)?.clone();
        let old = self.storage.row(table, row_id)?.clone();

        let mut new = old.clone();
        for (name, value) in assignments {
            let position = column_position(&relation.descriptor, table, name.as_ref())?;
            new.set(position, value.clone());
        }

        let versioned = self.is_versioned(table);
        if versioned {
            let before = TriggerData::new(
                TriggerEvent::before_row(TriggerOperation::Update),
                relation.clone(),
                Some(old.clone()),
                Some(new),
            );
            new = self.engine.stamp_period(txn, &before)?;
        }
        let new = self.run_hooks(table, new);

        self.storage.replace(table, row_id, new.clone())?;

        if versioned {
            let after = TriggerData::new(
                TriggerEvent::after_row(TriggerOperation::Update),
                relation,
                Some(old),
                Some(new),
            );
            let outcome = self.engine.write_history(txn, &after, &mut self.storage)?;
            self.outcomes.push((table, outcome));
        }
        Ok(())
    }

    fn delete_row(&mut self, txn: &TransactionContext, table: RelationId, row_id: RowId) -> HostResult<()> {
        let relation = self.storage.relation(table)?.clone();
        let old = self.storage.remove(table, row_id)?;

        if self.is_versioned(table) {
            let after = TriggerData::new(
                TriggerEvent::after_row(TriggerOperation::Delete),
                relation,
                Some(old),
                None,
            );
            let outcome = self.engine.write_history(txn, &after, &mut self.storage)?;
            self.outcomes.push((table, outcome));
        }
        Ok(())
    }

    fn run_hooks(&self, table: RelationId, row: RowImage) -> RowImage {
        match self.hooks.get(&table) {
            Some(hooks) => hooks.iter().fold(row, |row, hook| hook(row)),
            None => row,
        }
    }
}

fn column_position(descriptor: &TupleDescriptor, table: RelationId, name: &str) -> HostResult<usize> {
    descriptor
        .position_of(name)
        .ok_or_else(|| HostError::UnknownColumn {
            table,
            column: name.to_string(),
        })
}
