//! Observable events of the versioning engine and its host
//!
//! Events are explicit and typed.

use std::fmt;

use super::Severity;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Row stamping
    /// Period columns of a new row image were set
    PeriodStamped,
    /// Update touched only excluded columns; no new version
    ExcludedOnlyUpdate,

    // Version close
    /// Row was already opened by this transaction; no history row
    SameTransactionUpdate,
    /// Closed version written to the history table
    HistoryArchived,
    /// Table has a period but no system versioning
    VersioningDisabled,

    // Rejections
    /// Writer supplied a generated-always column value
    GeneratedAlwaysRejected,
    /// Row being closed was created after the transaction started
    RowVersionAnomaly,
    /// Trigger fired with the wrong timing, level or operation
    TriggerProtocolViolated,

    // History insert plans
    /// Insert plan prepared for a history table
    InsertPlanPrepared,
    /// Cached plan re-prepared because the history table was renamed
    InsertPlanRefreshed,

    // Host pipeline
    /// Workload and catalog loaded
    WorkloadLoaded,
    /// Transaction committed
    TransactionCommitted,
    /// Transaction or statement rolled back
    TransactionRolledBack,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::PeriodStamped => "PERIOD_STAMPED",
            Event::ExcludedOnlyUpdate => "EXCLUDED_ONLY_UPDATE",
            Event::SameTransactionUpdate => "SAME_TRANSACTION_UPDATE",
            Event::HistoryArchived => "HISTORY_ARCHIVED",
            Event::VersioningDisabled => "VERSIONING_DISABLED",
            Event::GeneratedAlwaysRejected => "GENERATED_ALWAYS_REJECTED",
            Event::RowVersionAnomaly => "ROW_VERSION_ANOMALY",
            Event::TriggerProtocolViolated => "TRIGGER_PROTOCOL_VIOLATED",
            Event::InsertPlanPrepared => "INSERT_PLAN_PREPARED",
            Event::InsertPlanRefreshed => "INSERT_PLAN_REFRESHED",
            Event::WorkloadLoaded => "WORKLOAD_LOADED",
            Event::TransactionCommitted => "TRANSACTION_COMMITTED",
            Event::TransactionRolledBack => "TRANSACTION_ROLLED_BACK",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::PeriodStamped
            | Event::ExcludedOnlyUpdate
            | Event::SameTransactionUpdate
            | Event::HistoryArchived
            | Event::VersioningDisabled
            | Event::InsertPlanPrepared => Severity::Trace,
            Event::InsertPlanRefreshed
            | Event::WorkloadLoaded
            | Event::TransactionCommitted => Severity::Info,
            Event::GeneratedAlwaysRejected
            | Event::RowVersionAnomaly
            | Event::TransactionRolledBack => Severity::Warn,
            Event::TriggerProtocolViolated => Severity::Fatal,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
