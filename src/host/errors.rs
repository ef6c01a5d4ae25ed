//! Write pipeline errors

use thiserror::Error;

use crate::row::RelationId;
use crate::storage::StorageError;
use crate::versioning::VersioningError;

pub type HostResult<T> = Result<T, HostError>;

#[derive(Debug, Error)]
pub enum HostError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Versioning(#[from] VersioningError),

    #[error("no transaction in progress")]
    NoTransaction,

    #[error("column \"{column}\" of relation {table} does not exist")]
    UnknownColumn { table: RelationId, column: String },
}

impl HostError {
    /// The versioning error behind this failure, if any
    pub fn versioning(&self) -> Option<&VersioningError> {
        match self {
            HostError::Versioning(e) => Some(e),
            _ => None,
        }
    }

    /// Whether retrying the whole transaction may succeed
    pub fn is_retryable(&self) -> bool {
        self.versioning().is_some_and(|e| e.is_retryable())
    }
}
