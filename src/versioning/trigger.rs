//! Trigger entry points
//!
//! `stamp_period` runs as a BEFORE ROW trigger on INSERT and UPDATE and
//! returns the row image to write. `write_history` runs as an AFTER ROW
//! trigger on INSERT, UPDATE and DELETE; it validates the written row and
//! archives the closed version.
//!
//! Catalog metadata is looked up on every call. The only state kept across
//! calls is the history insert-plan cache.

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::catalog::PeriodCatalogClient;
use crate::config::VersioningConfig;
use crate::observability::{Event, Logger, MetricsRegistry};
use crate::row::{Relation, RelationId, RowImage};
use crate::storage::StorageFacility;
use crate::temporal::TransactionClock;

use super::{
    AnomalyDetector, ChangeClassifier, ExcludedColumnSet, HistoryWriter, OldVersion, Period,
    PlanCacheStats, PlanLookup, RowStamper, VersioningError, VersioningErrorCode, VersioningResult,
};

const STAMP_FUNCTION: &str = "generated_always_as_row_start_end";
const HISTORY_FUNCTION: &str = "write_history";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerTiming {
    Before,
    After,
    InsteadOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerLevel {
    Row,
    Statement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOperation {
    Insert,
    Update,
    Delete,
    Truncate,
}

impl fmt::Display for TriggerOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerOperation::Insert => write!(f, "INSERT"),
            TriggerOperation::Update => write!(f, "UPDATE"),
            TriggerOperation::Delete => write!(f, "DELETE"),
            TriggerOperation::Truncate => write!(f, "TRUNCATE"),
        }
    }
}

/// When and why a trigger fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerEvent {
    pub timing: TriggerTiming,
    pub level: TriggerLevel,
    pub operation: TriggerOperation,
}

impl TriggerEvent {
    pub fn new(timing: TriggerTiming, level: TriggerLevel, operation: TriggerOperation) -> Self {
        Self {
            timing,
            level,
            operation,
        }
    }

    pub fn before_row(operation: TriggerOperation) -> Self {
        Self::new(TriggerTiming::Before, TriggerLevel::Row, operation)
    }

    pub fn after_row(operation: TriggerOperation) -> Self {
        Self::new(TriggerTiming::After, TriggerLevel::Row, operation)
    }

    fn is_before_row(&self) -> bool {
        self.timing == TriggerTiming::Before && self.level == TriggerLevel::Row
    }

    fn is_after_row(&self) -> bool {
        self.timing == TriggerTiming::After && self.level == TriggerLevel::Row
    }
}

/// Row images handed to a trigger.
///
/// INSERT: `trig_row` is the new row. UPDATE: `trig_row` is the old row and
/// `new_row` the new one. DELETE: `trig_row` is the old row.
#[derive(Debug, Clone)]
pub struct TriggerData {
    pub event: TriggerEvent,
    pub relation: Relation,
    pub trig_row: Option<RowImage>,
    pub new_row: Option<RowImage>,
}

impl TriggerData {
    pub fn new(
        event: TriggerEvent,
        relation: Relation,
        trig_row: Option<RowImage>,
        new_row: Option<RowImage>,
    ) -> Self {
        Self {
            event,
            relation,
            trig_row,
            new_row,
        }
    }
}

/// The enclosing transaction as seen by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionContext {
    pub id: Uuid,
    pub clock: TransactionClock,
}

impl TransactionContext {
    /// New transaction with a random id
    pub fn new(clock: TransactionClock) -> Self {
        Self {
            id: Uuid::new_v4(),
            clock,
        }
    }

    pub fn with_id(id: Uuid, clock: TransactionClock) -> Self {
        Self { id, clock }
    }
}

/// What `write_history` did for one row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionOutcome {
    /// Inserted row carries a valid period
    InsertVerified,
    /// Update changed only excluded columns
    ExcludedOnly,
    /// Row was opened by this transaction; nothing archived
    SameTransaction,
    /// Table has no history table
    VersioningDisabled,
    /// Closed version written to `history`
    Archived { history: RelationId },
}

impl VersionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            VersionOutcome::InsertVerified => "insert_verified",
            VersionOutcome::ExcludedOnly => "excluded_only",
            VersionOutcome::SameTransaction => "same_transaction",
            VersionOutcome::VersioningDisabled => "versioning_disabled",
            VersionOutcome::Archived { .. } => "archived",
        }
    }
}

/// System-versioning trigger engine over a period catalog
pub struct VersioningEngine<C> {
    catalog: C,
    config: VersioningConfig,
    history: HistoryWriter,
    metrics: Arc<MetricsRegistry>,
    logger: Logger,
}

impl<C: PeriodCatalogClient> VersioningEngine<C> {
    pub fn new(catalog: C, config: VersioningConfig) -> Self {
        Self::with_metrics(catalog, config, Arc::new(MetricsRegistry::new()))
    }

    pub fn with_metrics(catalog: C, config: VersioningConfig, metrics: Arc<MetricsRegistry>) -> Self {
        let history = HistoryWriter::new(&config.plan_cache);
        let logger = Logger::new(config.log_level);
        Self {
            catalog,
            config,
            history,
            metrics,
            logger,
        }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut C {
        &mut self.catalog
    }

    pub fn config(&self) -> &VersioningConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Logger at the configured level, shared with the host
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn plan_stats(&self) -> PlanCacheStats {
        self.history.plan_stats()
    }

    /// BEFORE ROW trigger: returns the row image to write.
    ///
    /// Inserts and effective updates get `[now, infinity)`; updates that
    /// change only excluded columns are returned unchanged.
    pub fn stamp_period(&self, txn: &TransactionContext, data: &TriggerData) -> VersioningResult<RowImage> {
        self.stamp_inner(txn, data)
            .map_err(|e| self.observe_rejection(e, txn, &data.relation))
    }

    fn stamp_inner(&self, txn: &TransactionContext, data: &TriggerData) -> VersioningResult<RowImage> {
        if !data.event.is_before_row() {
            return Err(VersioningError::wrong_timing(STAMP_FUNCTION, "BEFORE ROW"));
        }

        let relation = &data.relation;
        let new = match data.event.operation {
            TriggerOperation::Insert => required(&data.trig_row, STAMP_FUNCTION, "new")?,
            TriggerOperation::Update => {
                let old = required(&data.trig_row, STAMP_FUNCTION, "old")?;
                let new = required(&data.new_row, STAMP_FUNCTION, "new")?;
                if self.only_excluded_changed(relation, old, new)? {
                    return Ok(new.clone());
                }
                new
            }
            TriggerOperation::Delete | TriggerOperation::Truncate => {
                return Err(VersioningError::wrong_operation(STAMP_FUNCTION, "INSERT or UPDATE"));
            }
        };

        let period = self.period(relation)?;
        let stamped = RowStamper::new(&period).stamp(&txn.clock, new.clone());

        self.metrics.increment_rows_stamped();
        self.logger.event(
            Event::PeriodStamped,
            &[
                ("table", &relation.name.to_string()),
                ("txn", &txn.id.to_string()),
            ],
        );
        Ok(stamped)
    }

    /// AFTER ROW trigger: validates the written row and archives the
    /// version it replaced.
    pub fn write_history(
        &mut self,
        txn: &TransactionContext,
        data: &TriggerData,
        storage: &mut dyn StorageFacility,
    ) -> VersioningResult<VersionOutcome> {
        match self.write_history_inner(txn, data, storage) {
            Ok(outcome) => Ok(outcome),
            Err(e) => Err(self.observe_rejection(e, txn, &data.relation)),
        }
    }

    fn write_history_inner(
        &mut self,
        txn: &TransactionContext,
        data: &TriggerData,
        storage: &mut dyn StorageFacility,
    ) -> VersioningResult<VersionOutcome> {
        if !data.event.is_after_row() {
            return Err(VersioningError::wrong_timing(HISTORY_FUNCTION, "AFTER ROW"));
        }

        let relation = &data.relation;
        let operation = data.event.operation;
        let (old, new, only_excluded) = match operation {
            TriggerOperation::Insert => (None, Some(required(&data.trig_row, HISTORY_FUNCTION, "new")?), false),
            TriggerOperation::Update => {
                let old = required(&data.trig_row, HISTORY_FUNCTION, "old")?;
                let new = required(&data.new_row, HISTORY_FUNCTION, "new")?;
                let only_excluded = self.only_excluded_changed(relation, old, new)?;
                (Some(old), Some(new), only_excluded)
            }
            TriggerOperation::Delete => (Some(required(&data.trig_row, HISTORY_FUNCTION, "old")?), None, false),
            TriggerOperation::Truncate => {
                return Err(VersioningError::wrong_operation(
                    HISTORY_FUNCTION,
                    "INSERT or UPDATE or DELETE",
                ));
            }
        };

        let period = self.period(relation)?;
        let detector = AnomalyDetector::new(&period);
        let table = relation.name.to_string();
        let txn_id = txn.id.to_string();

        if let (Some(new), false) = (new, only_excluded) {
            detector.verify_generated(&txn.clock, new)?;
            if operation == TriggerOperation::Insert {
                return Ok(VersionOutcome::InsertVerified);
            }
        }

        if only_excluded {
            self.metrics.increment_excluded_only_updates();
            self.logger.event(Event::ExcludedOnlyUpdate, &[("table", &table), ("txn", &txn_id)]);
            return Ok(VersionOutcome::ExcludedOnly);
        }

        let old = old.ok_or_else(|| VersioningError::missing_row(HISTORY_FUNCTION, "old"))?;
        if detector.check_old_version(&txn.clock, old)? == OldVersion::SameTransaction {
            self.metrics.increment_same_transaction_updates();
            self.logger.event(Event::SameTransactionUpdate, &[("table", &table), ("txn", &txn_id)]);
            return Ok(VersionOutcome::SameTransaction);
        }

        let history = self
            .catalog
            .lookup_history_table(relation.id)
            .map_err(|e| VersioningError::from_catalog(e, &relation.name.name))?;
        let Some(history) = history else {
            self.logger.event(Event::VersioningDisabled, &[("table", &table), ("txn", &txn_id)]);
            return Ok(VersionOutcome::VersioningDisabled);
        };

        let archived = self
            .history
            .archive(relation, &period, &txn.clock, old, history, storage)?;
        let history_name = archived.history_name.to_string();

        match archived.plan {
            Some(PlanLookup::Hit) => self.metrics.increment_insert_plan_hits(),
            Some(PlanLookup::Prepared) | Some(PlanLookup::Uncached) => {
                self.metrics.increment_insert_plan_prepares();
                self.logger.event(Event::InsertPlanPrepared, &[("history", &history_name)]);
            }
            Some(PlanLookup::Refreshed) => {
                self.metrics.increment_insert_plan_refreshes();
                self.logger.event(Event::InsertPlanRefreshed, &[("history", &history_name)]);
            }
            None => {}
        }

        self.metrics.increment_history_rows_archived();
        self.logger.event(
            Event::HistoryArchived,
            &[("history", &history_name), ("table", &table), ("txn", &txn_id)],
        );
        Ok(VersionOutcome::Archived {
            history: archived.history,
        })
    }

    fn period(&self, relation: &Relation) -> VersioningResult<Period> {
        let columns = self
            .catalog
            .lookup_period_columns(relation.id, &self.config.period_name)
            .map_err(|e| VersioningError::from_catalog(e, &relation.name.name))?;
        Period::resolve(&relation.descriptor, &columns)
    }

    fn only_excluded_changed(&self, relation: &Relation, old: &RowImage, new: &RowImage) -> VersioningResult<bool> {
        let names = self
            .catalog
            .lookup_excluded_columns(relation.id)
            .map_err(|e| VersioningError::from_catalog(e, &relation.name.name))?;
        let excluded = ExcludedColumnSet::resolve(&relation.descriptor, &names)?;
        Ok(ChangeClassifier::only_excluded_changed(
            &relation.descriptor,
            &excluded,
            old,
            new,
        ))
    }

    /// Records rejections that indicate writer or caller misuse
    fn observe_rejection(&self, err: VersioningError, txn: &TransactionContext, relation: &Relation) -> VersioningError {
        let table = relation.name.to_string();
        let txn_id = txn.id.to_string();
        match err.code() {
            VersioningErrorCode::AeroGeneratedAlways => {
                self.metrics.increment_generated_always_rejections();
                self.logger.event(
                    Event::GeneratedAlwaysRejected,
                    &[
                        ("column", err.column().unwrap_or_default()),
                        ("table", &table),
                        ("txn", &txn_id),
                    ],
                );
            }
            VersioningErrorCode::AeroInvalidRowVersion => {
                self.metrics.increment_row_version_anomalies();
                self.logger.event(Event::RowVersionAnomaly, &[("table", &table), ("txn", &txn_id)]);
            }
            VersioningErrorCode::AeroTriggerProtocolViolated => {
                self.logger.event(
                    Event::TriggerProtocolViolated,
                    &[("message", err.message()), ("table", &table)],
                );
            }
            _ => {}
        }
        err
    }
}

fn required<'a>(row: &'a Option<RowImage>, function: &str, which: &str) -> VersioningResult<&'a RowImage> {
    row.as_ref()
        .ok_or_else(|| VersioningError::missing_row(function, which))
}
