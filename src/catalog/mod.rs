//! Period catalog
//!
//! The catalog is the authoritative store of period and versioning
//! metadata. The versioning engine only ever reads it, through the
//! `PeriodCatalogClient` trait, and re-reads it on every trigger
//! invocation.
//!
//! - `PeriodCatalogClient` - lookup interface consumed by the engine
//! - `InMemoryCatalog` - reference implementation for hosts and tests
//! - `CatalogDocument` - JSON form of the catalog, resolved by table name

mod client;
mod document;
mod errors;
mod memory;

pub use client::{PeriodCatalogClient, PeriodColumns};
pub use document::{CatalogDocument, PeriodEntry, SystemTimeEntry, VersioningEntry};
pub use errors::{CatalogError, CatalogResult};
pub use memory::InMemoryCatalog;
