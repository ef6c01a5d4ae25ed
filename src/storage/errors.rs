//! Storage facility error types
//!
//! Error codes:
//! - AERO_UNDEFINED_TABLE (ERROR)
//! - AERO_DUPLICATE_TABLE (ERROR)
//! - AERO_ROW_NOT_FOUND (ERROR)
//! - AERO_ROW_SHAPE_MISMATCH (ERROR)
//! - AERO_UNKNOWN_STATEMENT (FATAL)
//! - AERO_INVALID_TRANSACTION_STATE (ERROR)

use std::fmt;

use crate::row::RelationId;

/// Severity levels for storage errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Statement fails, the session continues
    Error,
    /// Caller bug; the session state can no longer be trusted
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Storage-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorCode {
    /// Relation could not be resolved by id or name
    AeroUndefinedTable,
    /// Relation name already taken
    AeroDuplicateTable,
    /// Row id not present in the relation
    AeroRowNotFound,
    /// Row does not fit the relation's layout
    AeroRowShapeMismatch,
    /// Prepared statement handle was never issued
    AeroUnknownStatement,
    /// Begin/commit/rollback called out of order
    AeroInvalidTransactionState,
}

impl StorageErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            StorageErrorCode::AeroUndefinedTable => "AERO_UNDEFINED_TABLE",
            StorageErrorCode::AeroDuplicateTable => "AERO_DUPLICATE_TABLE",
            StorageErrorCode::AeroRowNotFound => "AERO_ROW_NOT_FOUND",
            StorageErrorCode::AeroRowShapeMismatch => "AERO_ROW_SHAPE_MISMATCH",
            StorageErrorCode::AeroUnknownStatement => "AERO_UNKNOWN_STATEMENT",
            StorageErrorCode::AeroInvalidTransactionState => "AERO_INVALID_TRANSACTION_STATE",
        }
    }

    /// Returns the SQLSTATE reported to SQL clients
    pub fn sqlstate(&self) -> &'static str {
        match self {
            StorageErrorCode::AeroUndefinedTable => "42P01",
            StorageErrorCode::AeroDuplicateTable => "42P07",
            StorageErrorCode::AeroRowNotFound => "P0002",
            StorageErrorCode::AeroRowShapeMismatch => "42804",
            StorageErrorCode::AeroUnknownStatement => "26000",
            StorageErrorCode::AeroInvalidTransactionState => "25000",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            StorageErrorCode::AeroUnknownStatement => Severity::Fatal,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for StorageErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Storage error with context
#[derive(Debug, Clone)]
pub struct StorageError {
    code: StorageErrorCode,
    message: String,
    relation: Option<String>,
}

impl StorageError {
    /// Relation id not known to the storage facility
    pub fn unknown_relation(id: RelationId) -> Self {
        Self {
            code: StorageErrorCode::AeroUndefinedTable,
            message: format!("relation with id {} does not exist", id),
            relation: None,
        }
    }

    /// Relation name does not resolve
    pub fn undefined_table(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            code: StorageErrorCode::AeroUndefinedTable,
            message: format!("relation \"{}\" does not exist", name),
            relation: Some(name),
        }
    }

    pub fn duplicate_table(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            code: StorageErrorCode::AeroDuplicateTable,
            message: format!("relation \"{}\" already exists", name),
            relation: Some(name),
        }
    }

    pub fn row_not_found(relation: impl Into<String>, row: impl fmt::Display) -> Self {
        let relation = relation.into();
        Self {
            code: StorageErrorCode::AeroRowNotFound,
            message: format!("row {} not found in relation \"{}\"", row, relation),
            relation: Some(relation),
        }
    }

    pub fn row_shape_mismatch(relation: impl Into<String>, reason: impl Into<String>) -> Self {
        let relation = relation.into();
        Self {
            code: StorageErrorCode::AeroRowShapeMismatch,
            message: format!(
                "row does not match the layout of relation \"{}\": {}",
                relation,
                reason.into()
            ),
            relation: Some(relation),
        }
    }

    pub fn unknown_statement(plan_id: u64) -> Self {
        Self {
            code: StorageErrorCode::AeroUnknownStatement,
            message: format!("prepared statement {} does not exist", plan_id),
            relation: None,
        }
    }

    pub fn invalid_transaction_state(message: impl Into<String>) -> Self {
        Self {
            code: StorageErrorCode::AeroInvalidTransactionState,
            message: message.into(),
            relation: None,
        }
    }

    pub fn code(&self) -> StorageErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Name of the relation involved, if known
    pub fn relation(&self) -> Option<&str> {
        self.relation.as_deref()
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )
    }
}

impl std::error::Error for StorageError {}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
