//! Storage/query facility
//!
//! The versioning engine never touches rows directly; it opens relations,
//! prepares inserts and executes them through `StorageFacility`, inside the
//! caller's transaction.
//!
//! `MemoryStorage` is the reference implementation used by the write
//! pipeline, the CLI and the test suite.

mod errors;
mod facility;
mod memory;

pub use errors::{Severity, StorageError, StorageErrorCode, StorageResult};
pub use facility::{LockMode, PreparedInsert, StorageFacility};
pub use memory::{MemoryStorage, RowId, Savepoint};
