//! Catalog error types

use thiserror::Error;

use crate::row::RelationId;

/// Result type for catalog lookups
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Catalog errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("period \"{period}\" not found on relation {table}")]
    PeriodNotFound { table: RelationId, period: String },

    #[error("relation \"{0}\" does not exist")]
    UnknownRelation(String),

    #[error("period \"{period}\" already defined on relation {table}")]
    DuplicatePeriod { table: RelationId, period: String },

    #[error("catalog lookup failed: {0}")]
    LookupFailed(String),
}
