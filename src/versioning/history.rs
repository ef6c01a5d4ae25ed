//! HistoryWriter - archives closed row versions
//!
//! The history table may differ from the live table in column order, in
//! dropped slots and in extra or missing columns. Values are carried over
//! by column name; the end column is then set to the closing instant.

use crate::config::PlanCacheConfig;
use crate::row::{QualifiedName, Relation, RelationId, RowImage, TupleDescriptor};
use crate::storage::{LockMode, StorageFacility};
use crate::temporal::TransactionClock;

use super::{InsertPlanCache, Period, PlanCacheStats, PlanLookup, VersioningError, VersioningResult};

/// Column correspondence from a live layout to a history layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnMap {
    /// Layouts match exactly; rows are copied as-is
    Identity,
    /// For each history slot, the live slot it takes its value from
    ByName(Vec<Option<usize>>),
}

impl ColumnMap {
    /// Matches history columns to live columns by name.
    ///
    /// A history column with no live counterpart stays NULL. A name match
    /// with a different declared type cannot be converted.
    pub fn build(source: &TupleDescriptor, target: &TupleDescriptor) -> VersioningResult<Self> {
        if source.same_shape(target) {
            return Ok(ColumnMap::Identity);
        }

        let mut slots = vec![None; target.len()];
        for (position, column) in target.live_columns() {
            let Some(from) = source.position_of(&column.name) else {
                continue;
            };
            let source_type = source.columns()[from].column_type;
            if source_type != column.column_type {
                return Err(VersioningError::row_type_mismatch(
                    &column.name,
                    source_type.type_name(),
                    column.column_type.type_name(),
                ));
            }
            slots[position] = Some(from);
        }
        Ok(ColumnMap::ByName(slots))
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, ColumnMap::Identity)
    }

    /// Builds a history-shaped row from a live row
    pub fn apply(&self, row: &RowImage, target_len: usize) -> RowImage {
        match self {
            ColumnMap::Identity => row.clone().widened(target_len),
            ColumnMap::ByName(slots) => RowImage::new(
                slots
                    .iter()
                    .map(|from| from.and_then(|p| row.get(p).cloned()))
                    .collect(),
            ),
        }
    }
}

/// Result of archiving one row version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedRow {
    pub history: RelationId,
    pub history_name: QualifiedName,
    /// `None` when the row was inserted without a prepared plan
    pub plan: Option<PlanLookup>,
}

/// Writes closed row versions into history relations
#[derive(Debug)]
pub struct HistoryWriter {
    use_plans: bool,
    plans: InsertPlanCache,
}

impl HistoryWriter {
    pub fn new(config: &PlanCacheConfig) -> Self {
        Self {
            use_plans: config.enabled,
            plans: InsertPlanCache::new(config),
        }
    }

    /// Archives `old`, the pre-image of a row of `live`, into `history`
    /// with its end column set to the transaction start.
    ///
    /// The history relation stays locked `RowExclusive` until the
    /// transaction ends.
    pub fn archive(
        &mut self,
        live: &Relation,
        period: &Period,
        clock: &TransactionClock,
        old: &RowImage,
        history: RelationId,
        storage: &mut dyn StorageFacility,
    ) -> VersioningResult<ArchivedRow> {
        let history_rel = storage
            .open_relation(history, LockMode::RowExclusive)
            .map_err(|e| VersioningError::history_write_failed(&history.to_string(), e))?;
        let target = &history_rel.descriptor;

        let end = target
            .position_of(&period.end_name)
            .ok_or_else(|| VersioningError::undefined_column(&period.end_name))?;

        let map = ColumnMap::build(&live.descriptor, target)?;
        let mut row = map.apply(old, target.len());
        row.set(end, Some(period.temporal_type.now(clock)));

        let history_name = history_rel.name.to_string();
        let plan = if self.use_plans {
            let (prepared, lookup) = self
                .plans
                .plan_for(&history_rel, storage)
                .map_err(|e| VersioningError::history_write_failed(&history_name, e))?;
            let executed = storage.execute_insert(&prepared, row);
            if lookup == PlanLookup::Uncached {
                storage.release_insert(&prepared);
            }
            executed.map_err(|e| VersioningError::history_write_failed(&history_name, e))?;
            Some(lookup)
        } else {
            storage
                .insert_row(history, row)
                .map_err(|e| VersioningError::history_write_failed(&history_name, e))?;
            None
        };

        Ok(ArchivedRow {
            history,
            history_name: history_rel.name,
            plan,
        })
    }

    pub fn plan_stats(&self) -> PlanCacheStats {
        self.plans.stats()
    }
}
