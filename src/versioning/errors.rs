//! Versioning error types
//!
//! Error codes:
//! - AERO_TRIGGER_PROTOCOL_VIOLATED (FATAL)
//! - AERO_VERSIONING_CONTRACT (FATAL)
//! - AERO_PERIOD_NOT_FOUND (REJECT)
//! - AERO_UNDEFINED_COLUMN (REJECT)
//! - AERO_GENERATED_ALWAYS (REJECT)
//! - AERO_INVALID_ROW_VERSION (REJECT, retryable)
//! - AERO_CATALOG_FAILED (REJECT)
//! - AERO_HISTORY_WRITE_FAILED (REJECT)
//!
//! Every error aborts the statement that fired the trigger.

use std::fmt;

use crate::catalog::CatalogError;
use crate::storage::StorageError;
use crate::temporal::TemporalError;

/// Severity levels for versioning errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The statement is rejected; the session continues
    Reject,
    /// Programming error in the caller or the engine
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Versioning error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersioningErrorCode {
    /// Trigger fired with the wrong timing, level or operation
    AeroTriggerProtocolViolated,
    /// Unsupported period type, NULL period value or unconvertible row type
    AeroVersioningContract,
    /// Period missing from the catalog
    AeroPeriodNotFound,
    /// Catalog references a column the table does not have
    AeroUndefinedColumn,
    /// Writer supplied a value for a generated-always column
    AeroGeneratedAlways,
    /// Row being closed was created after the transaction started
    AeroInvalidRowVersion,
    /// Catalog lookup failed
    AeroCatalogFailed,
    /// History row could not be written
    AeroHistoryWriteFailed,
}

impl VersioningErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            VersioningErrorCode::AeroTriggerProtocolViolated => "AERO_TRIGGER_PROTOCOL_VIOLATED",
            VersioningErrorCode::AeroVersioningContract => "AERO_VERSIONING_CONTRACT",
            VersioningErrorCode::AeroPeriodNotFound => "AERO_PERIOD_NOT_FOUND",
            VersioningErrorCode::AeroUndefinedColumn => "AERO_UNDEFINED_COLUMN",
            VersioningErrorCode::AeroGeneratedAlways => "AERO_GENERATED_ALWAYS",
            VersioningErrorCode::AeroInvalidRowVersion => "AERO_INVALID_ROW_VERSION",
            VersioningErrorCode::AeroCatalogFailed => "AERO_CATALOG_FAILED",
            VersioningErrorCode::AeroHistoryWriteFailed => "AERO_HISTORY_WRITE_FAILED",
        }
    }

    /// Returns the SQLSTATE reported to SQL clients
    pub fn sqlstate(&self) -> &'static str {
        match self {
            VersioningErrorCode::AeroTriggerProtocolViolated => "39P01",
            VersioningErrorCode::AeroVersioningContract => "XX000",
            VersioningErrorCode::AeroPeriodNotFound => "42704",
            VersioningErrorCode::AeroUndefinedColumn => "42703",
            VersioningErrorCode::AeroGeneratedAlways => "428C9",
            VersioningErrorCode::AeroInvalidRowVersion => "2201H",
            VersioningErrorCode::AeroCatalogFailed => "58000",
            VersioningErrorCode::AeroHistoryWriteFailed => "58030",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            VersioningErrorCode::AeroTriggerProtocolViolated
            | VersioningErrorCode::AeroVersioningContract => Severity::Fatal,
            _ => Severity::Reject,
        }
    }

    /// Whether retrying the whole transaction may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, VersioningErrorCode::AeroInvalidRowVersion)
    }
}

impl fmt::Display for VersioningErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Versioning error with SQL-style message, detail and hint
#[derive(Debug, Clone)]
pub struct VersioningError {
    code: VersioningErrorCode,
    message: String,
    detail: Option<String>,
    hint: Option<String>,
    column: Option<String>,
}

impl VersioningError {
    fn new(code: VersioningErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            detail: None,
            hint: None,
            column: None,
        }
    }

    fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    /// Trigger fired at the wrong time or granularity
    pub fn wrong_timing(function: &str, expected: &str) -> Self {
        Self::new(
            VersioningErrorCode::AeroTriggerProtocolViolated,
            format!("function \"{}\" must be fired {}", function, expected),
        )
    }

    /// Trigger fired for an operation it does not handle
    pub fn wrong_operation(function: &str, expected: &str) -> Self {
        Self::new(
            VersioningErrorCode::AeroTriggerProtocolViolated,
            format!("function \"{}\" must be fired for {}", function, expected),
        )
    }

    /// Trigger data lacks a row image the operation requires
    pub fn missing_row(function: &str, which: &str) -> Self {
        Self::new(
            VersioningErrorCode::AeroTriggerProtocolViolated,
            format!("function \"{}\" was called without a {} row", function, which),
        )
    }

    pub fn contract(message: impl Into<String>) -> Self {
        Self::new(VersioningErrorCode::AeroVersioningContract, message)
    }

    /// Period column holds NULL where a value is required
    pub fn null_period_value(column: &str) -> Self {
        Self::contract(format!("period column \"{}\" is null", column)).with_column(column)
    }

    /// History table column cannot receive the live table's value
    pub fn row_type_mismatch(column: &str, source: &str, target: &str) -> Self {
        Self::contract("could not convert row type")
            .with_detail(format!(
                "Attribute \"{}\" of type {} does not match corresponding attribute of type {}.",
                column, target, source
            ))
            .with_column(column)
    }

    pub fn period_not_found(period: &str, table: &str) -> Self {
        Self::new(
            VersioningErrorCode::AeroPeriodNotFound,
            format!("period \"{}\" not found on table \"{}\"", period, table),
        )
    }

    pub fn undefined_column(column: &str) -> Self {
        Self::new(
            VersioningErrorCode::AeroUndefinedColumn,
            format!("column \"{}\" does not exist", column),
        )
        .with_column(column)
    }

    /// Writer supplied the start column
    pub fn generated_always_row_start(column: &str) -> Self {
        Self::generated_always(column, "ROW START")
    }

    /// Writer supplied the end column
    pub fn generated_always_row_end(column: &str) -> Self {
        Self::generated_always(column, "ROW END")
    }

    fn generated_always(column: &str, kind: &str) -> Self {
        Self::new(
            VersioningErrorCode::AeroGeneratedAlways,
            format!("cannot insert or update column \"{}\"", column),
        )
        .with_detail(format!("Column \"{}\" is GENERATED ALWAYS AS {}", column, kind))
        .with_column(column)
    }

    pub fn invalid_row_version() -> Self {
        Self::new(VersioningErrorCode::AeroInvalidRowVersion, "invalid row version")
            .with_detail("The row being updated or deleted was created after this transaction started.")
            .with_hint("The transaction might succeed if retried.")
    }

    pub fn catalog_failed(error: CatalogError) -> Self {
        Self::new(VersioningErrorCode::AeroCatalogFailed, error.to_string())
    }

    /// Maps a catalog error raised while serving `table`
    pub fn from_catalog(error: CatalogError, table: &str) -> Self {
        match error {
            CatalogError::PeriodNotFound { period, .. } => Self::period_not_found(&period, table),
            other => Self::catalog_failed(other),
        }
    }

    pub fn history_write_failed(history: &str, error: StorageError) -> Self {
        Self::new(
            VersioningErrorCode::AeroHistoryWriteFailed,
            format!("could not write history row to \"{}\"", history),
        )
        .with_detail(error.to_string())
    }

    pub fn code(&self) -> VersioningErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn sqlstate(&self) -> &'static str {
        self.code.sqlstate()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    /// Column the error refers to, if any
    pub fn column(&self) -> Option<&str> {
        self.column.as_deref()
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl fmt::Display for VersioningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)?;
        if let Some(ref detail) = self.detail {
            write!(f, " (detail: {})", detail)?;
        }
        if let Some(ref hint) = self.hint {
            write!(f, " (hint: {})", hint)?;
        }
        Ok(())
    }
}

impl std::error::Error for VersioningError {}

impl From<TemporalError> for VersioningError {
    fn from(e: TemporalError) -> Self {
        Self::contract(e.to_string())
    }
}

/// Result type for versioning operations
pub type VersioningResult<T> = Result<T, VersioningError>;
