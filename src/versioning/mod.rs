//! System-versioning trigger engine
//!
//! This module contains:
//! - Period resolution against a relation layout
//! - ChangeClassifier (excluded-only update detection)
//! - RowStamper (generated-always start/end values)
//! - AnomalyDetector (tamper and row-version checks)
//! - HistoryWriter and its insert-plan cache
//! - VersioningEngine, the BEFORE/AFTER ROW trigger entry points
//!
//! Per row, the host calls `stamp_period` before writing and
//! `write_history` after writing, inside the same transaction. Any error
//! aborts the statement.

mod classifier;
mod detector;
mod errors;
mod history;
mod period;
mod plan_cache;
mod stamper;
mod trigger;

pub use classifier::{ChangeClassifier, ExcludedColumnSet};
pub use detector::{AnomalyDetector, OldVersion};
pub use errors::{Severity, VersioningError, VersioningErrorCode, VersioningResult};
pub use history::{ArchivedRow, ColumnMap, HistoryWriter};
pub use period::Period;
pub use plan_cache::{InsertPlanCache, PlanCacheStats, PlanLookup};
pub use stamper::RowStamper;
pub use trigger::{
    TransactionContext, TriggerData, TriggerEvent, TriggerLevel, TriggerOperation, TriggerTiming,
    VersionOutcome, VersioningEngine,
};
