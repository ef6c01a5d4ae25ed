//! CLI command implementations
//!
//! `replay` runs every transaction of a workload through the write
//! pipeline. A failing statement aborts its transaction, which is rolled
//! back and reported; the remaining transactions still run.
//!
//! `check` binds every statement and validates the versioning setup of each
//! versioned table without executing anything.

use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::catalog::{CatalogError, PeriodCatalogClient};
use crate::config::VersioningConfig;
use crate::host::{HostError, HostResult, WritePipeline};
use crate::observability::{Event, Logger, MetricsRegistry};
use crate::row::{Datum, TupleDescriptor};
use crate::storage::MemoryStorage;
use crate::versioning::{ColumnMap, ExcludedColumnSet, Period, VersioningEngine, VersioningError};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::write_response;
use super::workload::{BoundStatement, Schema, Workload};

/// Main entry point for CLI
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    let report = match cmd {
        Command::Replay { workload, config } => replay(&workload, config.as_deref())?,
        Command::Check { workload } => check(&workload)?,
    };
    write_response(report)
}

/// Replays a workload and returns the final contents of every relation,
/// the failed statements and the engine counters.
pub fn replay(workload_path: &Path, config_path: Option<&Path>) -> CliResult<Value> {
    let config = match config_path {
        Some(path) => VersioningConfig::load(path)?,
        None => VersioningConfig::default(),
    };
    let logger = Logger::new(config.log_level);

    let workload = Workload::load(workload_path)?;
    let setup = workload.build(&config.period_name)?;
    logger.event(
        Event::WorkloadLoaded,
        &[
            ("tables", &workload.tables.len().to_string()),
            ("transactions", &workload.transactions.len().to_string()),
        ],
    );

    let metrics = Arc::new(MetricsRegistry::new());
    let engine = VersioningEngine::with_metrics(setup.catalog, config, Arc::clone(&metrics));
    let mut pipeline = WritePipeline::with_storage(setup.storage, engine);
    for table in setup.versioned {
        pipeline.install_versioning(table)?;
    }

    let mut failures = Vec::new();
    for (txn_index, spec) in workload.transactions.iter().enumerate() {
        pipeline.begin(spec.context())?;

        let mut failed = false;
        for (stmt_index, statement) in spec.statements.iter().enumerate() {
            let bound = Schema::from_storage(pipeline.storage()).bind(statement)?;
            if let Err(e) = execute(&mut pipeline, bound) {
                let mut failure = describe_failure(&e);
                failure.insert("transaction".into(), json!(txn_index));
                failure.insert("statement".into(), json!(stmt_index));
                failures.push(Value::Object(failure));
                failed = true;
                break;
            }
        }

        if failed || spec.rollback {
            pipeline.rollback()?;
        } else {
            pipeline.commit()?;
        }
    }

    Ok(json!({
        "relations": dump_relations(pipeline.storage())?,
        "failures": failures,
        "metrics": metrics.snapshot(),
        "plan_cache": pipeline.engine().plan_stats(),
    }))
}

/// Validates a workload without running it
pub fn check(workload_path: &Path) -> CliResult<Value> {
    let config = VersioningConfig::default();
    let workload = Workload::load(workload_path)?;
    let setup = workload.build(&config.period_name)?;
    let mut schema = Schema::from_storage(&setup.storage);

    let mut versioned = Vec::new();
    for table in &setup.versioned {
        let relation = setup.storage.relation(*table).map_err(|e| CliError::setup_failed(e.to_string()))?;
        let invalid = |e: VersioningError| {
            CliError::workload_error(format!("relation \"{}\": {}", relation.name, e.message()))
        };
        let invalid_catalog = |e: CatalogError| {
            CliError::workload_error(format!("relation \"{}\": {}", relation.name, e))
        };

        let columns = setup
            .catalog
            .lookup_period_columns(*table, &config.period_name)
            .map_err(invalid_catalog)?;
        let period = Period::resolve(&relation.descriptor, &columns).map_err(invalid)?;

        let excluded = setup.catalog.lookup_excluded_columns(*table).map_err(invalid_catalog)?;
        ExcludedColumnSet::resolve(&relation.descriptor, &excluded).map_err(invalid)?;

        if let Some(history) = setup.catalog.lookup_history_table(*table).map_err(invalid_catalog)? {
            let history_desc = schema
                .descriptor(history)
                .ok_or_else(|| CliError::workload_error(format!("history of \"{}\" is missing", relation.name)))?;
            check_history_shape(&relation.descriptor, history_desc, &period)
                .map_err(|message| CliError::workload_error(format!("relation \"{}\": {}", relation.name, message)))?;
        }
        versioned.push(relation.name.to_string());
    }

    for spec in &workload.transactions {
        for statement in &spec.statements {
            if let BoundStatement::Rename { table, to } = schema.bind(statement)? {
                schema.rename(table, to)?;
            }
        }
    }

    Ok(json!({
        "tables": workload.tables.len(),
        "versioned": versioned,
        "transactions": workload.transactions.len(),
        "statements": workload.statement_count(),
    }))
}

fn check_history_shape(live: &TupleDescriptor, history: &TupleDescriptor, period: &Period) -> Result<(), String> {
    ColumnMap::build(live, history).map_err(|e| e.message().to_string())?;
    if history.position_of(&period.end_name).is_none() {
        return Err(format!("history table has no column \"{}\"", period.end_name));
    }
    Ok(())
}

fn execute<C: PeriodCatalogClient>(pipeline: &mut WritePipeline<C>, statement: BoundStatement) -> HostResult<()> {
    match statement {
        BoundStatement::Insert { table, row } => pipeline.insert(table, row).map(|_| ()),
        BoundStatement::Update { table, filter, set } => pipeline.update_where(table, &filter, &set).map(|_| ()),
        BoundStatement::Delete { table, filter } => pipeline.delete_where(table, &filter).map(|_| ()),
        BoundStatement::Rename { table, to } => pipeline.rename_table(table, to),
    }
}

fn describe_failure(error: &HostError) -> Map<String, Value> {
    let mut failure = Map::new();
    match error {
        HostError::Versioning(e) => {
            failure.insert("code".into(), json!(e.code().code()));
            failure.insert("sqlstate".into(), json!(e.sqlstate()));
            failure.insert("message".into(), json!(e.message()));
            failure.insert("detail".into(), json!(e.detail()));
            failure.insert("hint".into(), json!(e.hint()));
            failure.insert("retryable".into(), json!(e.is_retryable()));
        }
        HostError::Storage(e) => {
            failure.insert("code".into(), json!(e.code().code()));
            failure.insert("sqlstate".into(), json!(e.code().sqlstate()));
            failure.insert("message".into(), json!(e.message()));
        }
        other => {
            failure.insert("message".into(), json!(other.to_string()));
        }
    }
    failure
}

fn dump_relations(storage: &MemoryStorage) -> CliResult<Value> {
    let mut relations = Map::new();
    for relation in storage.relations() {
        let rows = storage
            .rows(relation.id)
            .map_err(|e| CliError::setup_failed(e.to_string()))?
            .map(|(_, row)| {
                let object: Map<String, Value> = relation
                    .descriptor
                    .live_columns()
                    .map(|(position, column)| (column.name.clone(), Datum::to_json(row.get(position))))
                    .collect();
                Value::Object(object)
            })
            .collect::<Vec<_>>();
        relations.insert(relation.name.to_string(), Value::Array(rows));
    }
    Ok(Value::Object(relations))
}
