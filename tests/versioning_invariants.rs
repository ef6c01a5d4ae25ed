//! System-Versioning Invariant Tests
//!
//! End-to-end behavior of the versioning triggers through the write pipeline:
//! - Every written row carries [transaction start, infinity)
//! - Every closed version lands in the history table exactly once
//! - A row touched twice in one transaction produces one history row
//! - Excluded-only updates produce no history row and keep the period
//! - Anomalies and tampered periods reject the statement, leaving no trace

use aerodb_periods::catalog::{InMemoryCatalog, PeriodColumns};
use aerodb_periods::config::VersioningConfig;
use aerodb_periods::host::{HostError, WritePipeline};
use aerodb_periods::row::{ColumnDef, ColumnType, Datum, QualifiedName, RelationId, RowImage, TupleDescriptor};
use aerodb_periods::storage::MemoryStorage;
use aerodb_periods::temporal::{TransactionClock, INFINITE_TIMESTAMP, INFINITE_TIMESTAMPTZ};
use aerodb_periods::versioning::{
    TransactionContext, VersionOutcome, VersioningEngine, VersioningErrorCode,
};
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};

// =============================================================================
// Helper Functions
// =============================================================================

const BALANCE: usize = 1;
const LAST_SEEN: usize = 2;
const SYS_START: usize = 3;
const SYS_END: usize = 4;

fn accounts() -> TupleDescriptor {
    TupleDescriptor::new(vec![
        ColumnDef::new("id", ColumnType::Int),
        ColumnDef::new("balance", ColumnType::Int),
        ColumnDef::new("last_seen", ColumnType::Text),
        ColumnDef::new("sys_start", ColumnType::TimestampTz),
        ColumnDef::new("sys_end", ColumnType::TimestampTz),
    ])
}

struct Fixture {
    pipeline: WritePipeline<InMemoryCatalog>,
    live: RelationId,
    history: RelationId,
}

fn setup() -> Fixture {
    let mut storage = MemoryStorage::new();
    let live = storage
        .create_relation(QualifiedName::public("accounts"), accounts())
        .unwrap();
    let history = storage
        .create_relation(QualifiedName::public("accounts_history"), accounts())
        .unwrap();

    let mut catalog = InMemoryCatalog::new();
    catalog
        .add_period(live, "system_time", PeriodColumns::new("sys_start", "sys_end"))
        .unwrap();
    catalog.set_excluded_columns(live, ["last_seen"]);
    catalog.enable_system_versioning(live, history);

    let engine = VersioningEngine::new(catalog, VersioningConfig::default());
    let mut pipeline = WritePipeline::with_storage(storage, engine);
    pipeline.install_versioning(live).unwrap();

    Fixture {
        pipeline,
        live,
        history,
    }
}

fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
}

fn txn(hour: u32) -> TransactionContext {
    TransactionContext::new(TransactionClock::utc(at(hour)))
}

fn account(id: i64, balance: i64) -> RowImage {
    RowImage::new(vec![
        Some(Datum::Int(id)),
        Some(Datum::Int(balance)),
        None,
        None,
        None,
    ])
}

fn history_rows(f: &Fixture) -> Vec<RowImage> {
    f.pipeline
        .storage()
        .rows(f.history)
        .unwrap()
        .map(|(_, row)| row.clone())
        .collect()
}

fn tstz(hour: u32) -> Option<Datum> {
    Some(Datum::TimestampTz(at(hour)))
}

fn infinity() -> Option<Datum> {
    Some(Datum::TimestampTz(INFINITE_TIMESTAMPTZ))
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

/// Insert at t1, update at t2, delete at t3: two closed versions in history.
#[test]
fn test_full_row_lifecycle() {
    let mut f = setup();

    f.pipeline.begin(txn(1)).unwrap();
    let row_id = f.pipeline.insert(f.live, account(1, 100)).unwrap();
    f.pipeline.commit().unwrap();

    let live = f.pipeline.storage().row(f.live, row_id).unwrap();
    assert_eq!(live.get(SYS_START).cloned(), tstz(1));
    assert_eq!(live.get(SYS_END).cloned(), infinity());

    f.pipeline.begin(txn(2)).unwrap();
    f.pipeline
        .update(f.live, row_id, &[("balance", Some(Datum::Int(80)))])
        .unwrap();
    f.pipeline.commit().unwrap();

    let live = f.pipeline.storage().row(f.live, row_id).unwrap();
    assert_eq!(live.get(BALANCE).cloned(), Some(Datum::Int(80)));
    assert_eq!(live.get(SYS_START).cloned(), tstz(2));

    f.pipeline.begin(txn(3)).unwrap();
    f.pipeline.delete(f.live, row_id).unwrap();
    f.pipeline.commit().unwrap();

    assert_eq!(f.pipeline.storage().row_count(f.live).unwrap(), 0);

    let history = history_rows(&f);
    assert_eq!(history.len(), 2);

    assert_eq!(history[0].get(BALANCE).cloned(), Some(Datum::Int(100)));
    assert_eq!(history[0].get(SYS_START).cloned(), tstz(1));
    assert_eq!(history[0].get(SYS_END).cloned(), tstz(2));

    assert_eq!(history[1].get(BALANCE).cloned(), Some(Datum::Int(80)));
    assert_eq!(history[1].get(SYS_START).cloned(), tstz(2));
    assert_eq!(history[1].get(SYS_END).cloned(), tstz(3));
}

/// Closed versions tile the timeline without gaps or overlaps.
#[test]
fn test_history_periods_are_contiguous() {
    let mut f = setup();

    f.pipeline.begin(txn(1)).unwrap();
    let row_id = f.pipeline.insert(f.live, account(7, 0)).unwrap();
    f.pipeline.commit().unwrap();

    for hour in 2..6 {
        f.pipeline.begin(txn(hour)).unwrap();
        f.pipeline
            .update(f.live, row_id, &[("balance", Some(Datum::Int(hour as i64)))])
            .unwrap();
        f.pipeline.commit().unwrap();
    }

    let history = history_rows(&f);
    assert_eq!(history.len(), 4);
    for pair in history.windows(2) {
        assert_eq!(pair[0].get(SYS_END), pair[1].get(SYS_START));
    }

    let live = f.pipeline.storage().row(f.live, row_id).unwrap();
    assert_eq!(history[3].get(SYS_END), live.get(SYS_START));
}

/// Two updates of one row in one transaction archive only the version that
/// existed before the transaction.
#[test]
fn test_double_update_in_one_transaction() {
    let mut f = setup();

    f.pipeline.begin(txn(1)).unwrap();
    let row_id = f.pipeline.insert(f.live, account(1, 10)).unwrap();
    f.pipeline.commit().unwrap();

    f.pipeline.begin(txn(2)).unwrap();
    f.pipeline
        .update(f.live, row_id, &[("balance", Some(Datum::Int(20)))])
        .unwrap();
    f.pipeline
        .update(f.live, row_id, &[("balance", Some(Datum::Int(30)))])
        .unwrap();
    f.pipeline.commit().unwrap();

    let history = history_rows(&f);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].get(BALANCE).cloned(), Some(Datum::Int(10)));

    let outcomes: Vec<_> = f.pipeline.outcomes().iter().map(|(_, o)| *o).collect();
    assert_eq!(
        outcomes,
        vec![
            VersionOutcome::InsertVerified,
            VersionOutcome::Archived { history: f.history },
            VersionOutcome::SameTransaction,
        ]
    );
}

/// Inserting and deleting a row in the same transaction leaves no history.
#[test]
fn test_insert_then_delete_same_transaction() {
    let mut f = setup();

    f.pipeline.begin(txn(1)).unwrap();
    let row_id = f.pipeline.insert(f.live, account(1, 10)).unwrap();
    f.pipeline.delete(f.live, row_id).unwrap();
    f.pipeline.commit().unwrap();

    assert!(history_rows(&f).is_empty());
}

/// Changing only an excluded column keeps the version open.
#[test]
fn test_excluded_only_update() {
    let mut f = setup();

    f.pipeline.begin(txn(1)).unwrap();
    let row_id = f.pipeline.insert(f.live, account(1, 10)).unwrap();
    f.pipeline.commit().unwrap();

    f.pipeline.begin(txn(2)).unwrap();
    f.pipeline
        .update(f.live, row_id, &[("last_seen", Some(Datum::Text("web".into())))])
        .unwrap();
    f.pipeline.commit().unwrap();

    let live = f.pipeline.storage().row(f.live, row_id).unwrap();
    assert_eq!(live.get(LAST_SEEN).cloned(), Some(Datum::Text("web".into())));
    assert_eq!(live.get(SYS_START).cloned(), tstz(1));
    assert!(history_rows(&f).is_empty());

    let metrics = f.pipeline.engine().metrics().snapshot();
    assert_eq!(metrics.excluded_only_updates, 1);
}

/// An update that touches an excluded and a versioned column is versioned.
#[test]
fn test_mixed_update_is_versioned() {
    let mut f = setup();

    f.pipeline.begin(txn(1)).unwrap();
    let row_id = f.pipeline.insert(f.live, account(1, 10)).unwrap();
    f.pipeline.commit().unwrap();

    f.pipeline.begin(txn(2)).unwrap();
    f.pipeline
        .update(
            f.live,
            row_id,
            &[
                ("last_seen", Some(Datum::Text("app".into()))),
                ("balance", Some(Datum::Int(11))),
            ],
        )
        .unwrap();
    f.pipeline.commit().unwrap();

    assert_eq!(history_rows(&f).len(), 1);
}

/// An update that assigns identical values still closes the version.
#[test]
fn test_no_op_update_is_versioned() {
    let mut f = setup();

    f.pipeline.begin(txn(1)).unwrap();
    let row_id = f.pipeline.insert(f.live, account(1, 10)).unwrap();
    f.pipeline.commit().unwrap();

    f.pipeline.begin(txn(2)).unwrap();
    f.pipeline
        .update(f.live, row_id, &[("balance", Some(Datum::Int(10)))])
        .unwrap();
    f.pipeline.commit().unwrap();

    assert_eq!(history_rows(&f).len(), 1);
}

// =============================================================================
// Rejection Tests
// =============================================================================

/// Closing a row created by a later transaction is a retryable anomaly.
#[test]
fn test_row_version_anomaly_rejected() {
    let mut f = setup();

    f.pipeline.begin(txn(5)).unwrap();
    let row_id = f.pipeline.insert(f.live, account(1, 10)).unwrap();
    f.pipeline.commit().unwrap();

    f.pipeline.begin(txn(4)).unwrap();
    let err = f
        .pipeline
        .update(f.live, row_id, &[("balance", Some(Datum::Int(0)))])
        .unwrap_err();
    f.pipeline.rollback().unwrap();

    let versioning = err.versioning().unwrap();
    assert_eq!(versioning.code(), VersioningErrorCode::AeroInvalidRowVersion);
    assert_eq!(versioning.sqlstate(), "2201H");
    assert!(err.is_retryable());

    let live = f.pipeline.storage().row(f.live, row_id).unwrap();
    assert_eq!(live.get(BALANCE).cloned(), Some(Datum::Int(10)));
    assert!(history_rows(&f).is_empty());
    assert_eq!(f.pipeline.engine().metrics().snapshot().row_version_anomalies, 1);
}

/// A later BEFORE trigger that rewrites the start column is caught.
#[test]
fn test_tampered_start_rejected() {
    let mut f = setup();
    f.pipeline
        .add_after_stamp_hook(f.live, Box::new(|row: RowImage| row.with(SYS_START, tstz(0))));

    f.pipeline.begin(txn(1)).unwrap();
    let err = f.pipeline.insert(f.live, account(1, 10)).unwrap_err();

    let versioning = err.versioning().unwrap();
    assert_eq!(versioning.code(), VersioningErrorCode::AeroGeneratedAlways);
    assert_eq!(versioning.column(), Some("sys_start"));
    assert_eq!(f.pipeline.storage().row_count(f.live).unwrap(), 0);
    assert_eq!(
        f.pipeline.engine().metrics().snapshot().generated_always_rejections,
        1
    );
}

/// A later BEFORE trigger that closes the period early is caught on update.
#[test]
fn test_tampered_end_rejected_on_update() {
    let mut f = setup();

    f.pipeline.begin(txn(1)).unwrap();
    let row_id = f.pipeline.insert(f.live, account(1, 10)).unwrap();
    f.pipeline.commit().unwrap();

    f.pipeline
        .add_after_stamp_hook(f.live, Box::new(|row: RowImage| row.with(SYS_END, tstz(9))));

    f.pipeline.begin(txn(2)).unwrap();
    let err = f
        .pipeline
        .update(f.live, row_id, &[("balance", Some(Datum::Int(0)))])
        .unwrap_err();
    f.pipeline.rollback().unwrap();

    assert_eq!(err.versioning().unwrap().column(), Some("sys_end"));
    assert!(history_rows(&f).is_empty());
    let live = f.pipeline.storage().row(f.live, row_id).unwrap();
    assert_eq!(live.get(SYS_END).cloned(), infinity());
}

/// A rejected row rolls back the rows written earlier in the statement.
#[test]
fn test_statement_is_atomic() {
    let mut f = setup();

    f.pipeline.begin(txn(1)).unwrap();
    f.pipeline.insert(f.live, account(1, 10)).unwrap();
    f.pipeline.commit().unwrap();

    f.pipeline.begin(txn(3)).unwrap();
    f.pipeline.insert(f.live, account(2, 10)).unwrap();
    f.pipeline.commit().unwrap();

    // Older than the second row only
    f.pipeline.begin(txn(2)).unwrap();
    let err = f
        .pipeline
        .update_where(
            f.live,
            &[("balance", Some(Datum::Int(10)))],
            &[("balance", Some(Datum::Int(0)))],
        )
        .unwrap_err();
    assert!(matches!(err, HostError::Versioning(_)));
    f.pipeline.commit().unwrap();

    assert!(history_rows(&f).is_empty());
    let balances: Vec<_> = f
        .pipeline
        .storage()
        .rows(f.live)
        .unwrap()
        .map(|(_, row)| row.get(BALANCE).cloned())
        .collect();
    assert_eq!(balances, vec![Some(Datum::Int(10)), Some(Datum::Int(10))]);
}

/// A period that was dropped from the catalog rejects further writes.
#[test]
fn test_missing_period_rejected() {
    let mut f = setup();
    f.pipeline
        .engine_mut()
        .catalog_mut()
        .drop_period(f.live, "system_time");

    f.pipeline.begin(txn(1)).unwrap();
    let err = f.pipeline.insert(f.live, account(1, 10)).unwrap_err();
    let versioning = err.versioning().unwrap();
    assert_eq!(versioning.code(), VersioningErrorCode::AeroPeriodNotFound);
    assert!(versioning.message().contains("system_time"));
}

// =============================================================================
// Configuration Tests
// =============================================================================

/// With versioning disabled the period is still maintained.
#[test]
fn test_period_without_history_table() {
    let mut f = setup();
    f.pipeline
        .engine_mut()
        .catalog_mut()
        .disable_system_versioning(f.live);

    f.pipeline.begin(txn(1)).unwrap();
    let row_id = f.pipeline.insert(f.live, account(1, 10)).unwrap();
    f.pipeline.commit().unwrap();

    f.pipeline.begin(txn(2)).unwrap();
    f.pipeline
        .update(f.live, row_id, &[("balance", Some(Datum::Int(0)))])
        .unwrap();
    f.pipeline.commit().unwrap();

    let live = f.pipeline.storage().row(f.live, row_id).unwrap();
    assert_eq!(live.get(SYS_START).cloned(), tstz(2));
    assert!(history_rows(&f).is_empty());
    assert_eq!(
        f.pipeline.outcomes().last().map(|(_, o)| *o),
        Some(VersionOutcome::VersioningDisabled)
    );
}

/// Local timestamps follow the session offset of the transaction.
#[test]
fn test_timestamp_period_uses_session_offset() {
    let descriptor = TupleDescriptor::new(vec![
        ColumnDef::new("id", ColumnType::Int),
        ColumnDef::new("valid_from", ColumnType::Timestamp),
        ColumnDef::new("valid_to", ColumnType::Timestamp),
    ]);

    let mut storage = MemoryStorage::new();
    let live = storage
        .create_relation(QualifiedName::new("ledger", "entries"), descriptor)
        .unwrap();
    let mut catalog = InMemoryCatalog::new();
    catalog
        .add_period(live, "system_time", PeriodColumns::new("valid_from", "valid_to"))
        .unwrap();

    let engine = VersioningEngine::new(catalog, VersioningConfig::default());
    let mut pipeline = WritePipeline::with_storage(storage, engine);
    pipeline.install_versioning(live).unwrap();

    let offset = FixedOffset::east_opt(2 * 3600).unwrap();
    let start = offset.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap();
    pipeline
        .begin(TransactionContext::new(TransactionClock::new(start)))
        .unwrap();
    let row_id = pipeline
        .insert(live, RowImage::new(vec![Some(Datum::Int(1)), None, None]))
        .unwrap();
    pipeline.commit().unwrap();

    let expected = NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(10, 30, 0)
        .unwrap();
    let row = pipeline.storage().row(live, row_id).unwrap();
    assert_eq!(row.get(1).cloned(), Some(Datum::Timestamp(expected)));
    assert_eq!(row.get(2).cloned(), Some(Datum::Timestamp(INFINITE_TIMESTAMP)));
}
