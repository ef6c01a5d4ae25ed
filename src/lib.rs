//! aerodb-periods - SQL:2016 system-versioned temporal tables
//!
//! Trigger engine that stamps system-time periods on write, detects
//! excluded-only updates and row-version anomalies, and archives closed row
//! versions into history tables.
//!
//! Modules, bottom-up:
//! - `row`, `temporal`: values, layouts and the transaction clock
//! - `catalog`, `storage`: collaborator interfaces with in-memory versions
//! - `versioning`: the trigger engine
//! - `host`, `cli`: reference write pipeline and workload runner

pub mod catalog;
pub mod cli;
pub mod config;
pub mod host;
pub mod observability;
pub mod row;
pub mod storage;
pub mod temporal;
pub mod versioning;
