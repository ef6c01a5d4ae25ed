//! CLI module for aerodb-periods
//!
//! Provides command-line interface for:
//! - replay: Run a workload through the versioning triggers
//! - check: Validate a workload and its catalog

mod args;
mod commands;
mod errors;
mod io;
mod workload;

pub use args::{Cli, Command};
pub use commands::{check, replay, run, run_command};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_error, write_response};
pub use workload::{BoundStatement, Schema, Setup, Statement, TableSpec, TransactionSpec, Workload};
