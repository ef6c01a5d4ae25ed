//! Storage/query facility interface consumed by the versioning engine

use std::fmt;

use super::StorageResult;
use crate::row::{Relation, RelationId, RowImage};

/// Relation lock modes, weakest first.
///
/// Locks are held until the enclosing transaction ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LockMode {
    AccessShare,
    RowExclusive,
    AccessExclusive,
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockMode::AccessShare => write!(f, "AccessShareLock"),
            LockMode::RowExclusive => write!(f, "RowExclusiveLock"),
            LockMode::AccessExclusive => write!(f, "AccessExclusiveLock"),
        }
    }
}

/// Handle to a prepared single-row insert.
///
/// The statement names its target by qualified name, so it resolves the
/// target when executed, not when prepared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedInsert {
    plan_id: u64,
    target: RelationId,
    statement: String,
}

impl PreparedInsert {
    pub fn new(plan_id: u64, target: RelationId, statement: impl Into<String>) -> Self {
        Self {
            plan_id,
            target,
            statement: statement.into(),
        }
    }

    pub fn plan_id(&self) -> u64 {
        self.plan_id
    }

    /// Relation the statement was prepared against
    pub fn target(&self) -> RelationId {
        self.target
    }

    /// Parameterized statement text
    pub fn statement(&self) -> &str {
        &self.statement
    }
}

/// Transactional execution service of the host.
///
/// All calls run inside the caller's transaction; the facility owns
/// atomicity and locking.
pub trait StorageFacility {
    /// Opens a relation and acquires `lock` until transaction end.
    fn open_relation(&mut self, id: RelationId, lock: LockMode) -> StorageResult<Relation>;

    /// Prepares `INSERT INTO <relation> VALUES (($1).*)`.
    fn prepare_insert(&mut self, relation: &Relation) -> StorageResult<PreparedInsert>;

    /// Executes a prepared insert with one row parameter.
    fn execute_insert(&mut self, plan: &PreparedInsert, row: RowImage) -> StorageResult<()>;

    /// Frees a prepared insert. Unknown plans are ignored.
    fn release_insert(&mut self, plan: &PreparedInsert);

    /// Inserts directly into a relation by id, without a prepared statement.
    fn insert_row(&mut self, relation: RelationId, row: RowImage) -> StorageResult<()>;
}
