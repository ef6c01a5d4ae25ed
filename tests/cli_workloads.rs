//! CLI Workload Tests
//!
//! Runs workload files through `replay` and `check`:
//! - Replay output lists live and history rows per relation
//! - Failed statements are reported and their transaction rolled back
//! - Engine configuration is read from a file
//! - Check rejects inconsistent catalogs before anything runs
//! - The binary's stdout carries only the JSON response

use std::fs;
use std::path::PathBuf;
use std::process::Command;

use aerodb_periods::cli::{check, replay, CliErrorCode};
use serde_json::{json, Value};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn write_file(dir: &TempDir, name: &str, content: &Value) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, serde_json::to_string_pretty(content).unwrap()).unwrap();
    path
}

fn columns() -> Value {
    json!([
        {"name": "id", "type": "int"},
        {"name": "salary", "type": "int"},
        {"name": "badge_scans", "type": "int"},
        {"name": "sys_start", "type": "timestamptz"},
        {"name": "sys_end", "type": "timestamptz"}
    ])
}

fn catalog() -> Value {
    json!({
        "periods": [
            {"table_name": "employees", "period_name": "system_time",
             "start_column_name": "sys_start", "end_column_name": "sys_end"}
        ],
        "system_time_periods": [
            {"table_name": "employees", "excluded_column_names": ["badge_scans"]}
        ],
        "system_versioning": [
            {"table_name": "employees", "history_table_name": "hr.employees_history"}
        ]
    })
}

fn workload(transactions: Value) -> Value {
    json!({
        "tables": [
            {"name": "employees", "columns": columns()},
            {"name": "hr.employees_history", "columns": columns()}
        ],
        "catalog": catalog(),
        "transactions": transactions
    })
}

fn lifecycle() -> Value {
    json!([
        {"start": "2024-01-01T09:00:00+00:00", "statements": [
            {"op": "insert", "table": "employees", "values": {"id": 1, "salary": 100, "badge_scans": 0}}
        ]},
        {"start": "2024-02-01T09:00:00+00:00", "statements": [
            {"op": "update", "table": "employees", "where": {"id": 1}, "set": {"salary": 120}},
            {"op": "update", "table": "employees", "where": {"id": 1}, "set": {"badge_scans": 3}}
        ]},
        {"start": "2024-03-01T09:00:00+00:00", "statements": [
            {"op": "update", "table": "employees", "where": {"id": 1}, "set": {"badge_scans": 4}}
        ]},
        {"start": "2024-04-01T09:00:00+00:00", "statements": [
            {"op": "delete", "table": "employees", "where": {"id": 1}}
        ]}
    ])
}

// =============================================================================
// Replay Tests
// =============================================================================

#[test]
fn test_replay_lifecycle() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "workload.json", &workload(lifecycle()));

    let report = replay(&path, None).unwrap();

    assert_eq!(report["relations"]["public.employees"], json!([]));
    assert_eq!(
        report["relations"]["hr.employees_history"],
        json!([
            {"id": 1, "salary": 100, "badge_scans": 0,
             "sys_start": "2024-01-01T09:00:00+00:00", "sys_end": "2024-02-01T09:00:00+00:00"},
            {"id": 1, "salary": 120, "badge_scans": 4,
             "sys_start": "2024-02-01T09:00:00+00:00", "sys_end": "2024-04-01T09:00:00+00:00"}
        ])
    );
    assert_eq!(report["failures"], json!([]));
    assert_eq!(report["metrics"]["history_rows_archived"], 2);
    assert_eq!(report["metrics"]["excluded_only_updates"], 2);
    assert_eq!(report["plan_cache"]["prepares"], 1);
    assert_eq!(report["plan_cache"]["hits"], 1);
}

#[test]
fn test_replay_open_version_reads_infinity() {
    let dir = TempDir::new().unwrap();
    let transactions = json!([
        {"start": "2024-01-01T09:00:00+00:00", "statements": [
            {"op": "insert", "table": "employees", "values": {"id": 1, "salary": 100}}
        ]}
    ]);
    let path = write_file(&dir, "workload.json", &workload(transactions));

    let report = replay(&path, None).unwrap();
    let live = &report["relations"]["public.employees"][0];
    assert_eq!(live["sys_start"], "2024-01-01T09:00:00+00:00");
    assert_eq!(live["sys_end"], "infinity");
    assert_eq!(live["badge_scans"], Value::Null);
}

#[test]
fn test_replay_reports_anomaly_and_rolls_back() {
    let dir = TempDir::new().unwrap();
    let transactions = json!([
        {"start": "2024-05-01T09:00:00+00:00", "statements": [
            {"op": "insert", "table": "employees", "values": {"id": 1, "salary": 100}}
        ]},
        {"start": "2024-04-01T09:00:00+00:00", "statements": [
            {"op": "insert", "table": "employees", "values": {"id": 2, "salary": 50}},
            {"op": "update", "table": "employees", "where": {"id": 1}, "set": {"salary": 0}}
        ]}
    ]);
    let path = write_file(&dir, "workload.json", &workload(transactions));

    let report = replay(&path, None).unwrap();

    let failures = report["failures"].as_array().unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0]["code"], "AERO_INVALID_ROW_VERSION");
    assert_eq!(failures[0]["sqlstate"], "2201H");
    assert_eq!(failures[0]["retryable"], true);
    assert_eq!(failures[0]["transaction"], 1);
    assert_eq!(failures[0]["statement"], 1);

    // The earlier insert of the aborted transaction is gone too
    let live = report["relations"]["public.employees"].as_array().unwrap();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0]["salary"], 100);
    assert_eq!(report["relations"]["hr.employees_history"], json!([]));
}

#[test]
fn test_replay_explicit_rollback() {
    let dir = TempDir::new().unwrap();
    let transactions = json!([
        {"start": "2024-01-01T09:00:00+00:00", "rollback": true, "statements": [
            {"op": "insert", "table": "employees", "values": {"id": 1, "salary": 100}}
        ]}
    ]);
    let path = write_file(&dir, "workload.json", &workload(transactions));

    let report = replay(&path, None).unwrap();
    assert_eq!(report["relations"]["public.employees"], json!([]));
    assert_eq!(report["failures"], json!([]));
}

#[test]
fn test_replay_follows_renamed_history() {
    let dir = TempDir::new().unwrap();
    let transactions = json!([
        {"start": "2024-01-01T09:00:00+00:00", "statements": [
            {"op": "insert", "table": "employees", "values": {"id": 1, "salary": 100}}
        ]},
        {"start": "2024-02-01T09:00:00+00:00", "statements": [
            {"op": "update", "table": "employees", "where": {"id": 1}, "set": {"salary": 110}}
        ]},
        {"start": "2024-02-15T09:00:00+00:00", "statements": [
            {"op": "rename", "table": "hr.employees_history", "to": "hr.employees_archive"}
        ]},
        {"start": "2024-03-01T09:00:00+00:00", "statements": [
            {"op": "update", "table": "employees", "where": {"id": 1}, "set": {"salary": 120}}
        ]}
    ]);
    let path = write_file(&dir, "workload.json", &workload(transactions));

    let report = replay(&path, None).unwrap();
    let archive = report["relations"]["hr.employees_archive"].as_array().unwrap();
    assert_eq!(archive.len(), 2);
    assert_eq!(report["plan_cache"]["refreshes"], 1);
}

#[test]
fn test_replay_with_config_file() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "workload.json", &workload(lifecycle()));
    let config = write_file(
        &dir,
        "config.json",
        &json!({"plan_cache": {"enabled": false, "max_entries": 0}, "log_level": "error"}),
    );

    let report = replay(&path, Some(&config)).unwrap();
    assert_eq!(report["metrics"]["history_rows_archived"], 2);
    assert_eq!(report["plan_cache"]["prepares"], 0);
    assert_eq!(report["plan_cache"]["hits"], 0);
}

#[test]
fn test_replay_invalid_config() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "workload.json", &workload(lifecycle()));
    let config = write_file(&dir, "config.json", &json!({"period_name": ""}));

    let err = replay(&path, Some(&config)).unwrap_err();
    assert_eq!(err.code(), &CliErrorCode::ConfigError);
}

#[test]
fn test_replay_missing_workload() {
    let dir = TempDir::new().unwrap();
    let err = replay(&dir.path().join("absent.json"), None).unwrap_err();
    assert_eq!(err.code(), &CliErrorCode::IoError);
}

// =============================================================================
// Check Tests
// =============================================================================

#[test]
fn test_check_summary() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "workload.json", &workload(lifecycle()));

    let summary = check(&path).unwrap();
    assert_eq!(
        summary,
        json!({
            "tables": 2,
            "versioned": ["public.employees"],
            "transactions": 4,
            "statements": 5
        })
    );
}

#[test]
fn test_check_rejects_unknown_excluded_column() {
    let dir = TempDir::new().unwrap();
    let mut content = workload(lifecycle());
    content["catalog"]["system_time_periods"][0]["excluded_column_names"] = json!(["badge"]);
    let path = write_file(&dir, "workload.json", &content);

    let err = check(&path).unwrap_err();
    assert_eq!(err.code(), &CliErrorCode::WorkloadError);
    assert!(err.message().contains("badge"));
}

#[test]
fn test_check_rejects_history_without_end_column() {
    let dir = TempDir::new().unwrap();
    let mut content = workload(lifecycle());
    content["tables"][1]["columns"] = json!([
        {"name": "id", "type": "int"},
        {"name": "sys_start", "type": "timestamptz"}
    ]);
    let path = write_file(&dir, "workload.json", &content);

    let err = check(&path).unwrap_err();
    assert_eq!(err.code(), &CliErrorCode::WorkloadError);
    assert!(err.message().contains("sys_end"));
}

#[test]
fn test_check_rejects_unknown_table_in_statement() {
    let dir = TempDir::new().unwrap();
    let transactions = json!([
        {"start": "2024-01-01T09:00:00+00:00", "statements": [
            {"op": "insert", "table": "contractors", "values": {"id": 1}}
        ]}
    ]);
    let path = write_file(&dir, "workload.json", &workload(transactions));

    let err = check(&path).unwrap_err();
    assert_eq!(err.code(), &CliErrorCode::WorkloadError);
}

// =============================================================================
// Binary Output Tests
// =============================================================================

/// Log lines never interleave with the JSON response on stdout.
#[test]
fn test_binary_stdout_is_single_json_document() {
    let dir = TempDir::new().unwrap();
    let transactions = json!([
        {"start": "2024-05-01T09:00:00+00:00", "statements": [
            {"op": "insert", "table": "employees", "values": {"id": 1, "salary": 100}}
        ]},
        {"start": "2024-04-01T09:00:00+00:00", "statements": [
            {"op": "update", "table": "employees", "where": {"id": 1}, "set": {"salary": 0}}
        ]}
    ]);
    let path = write_file(&dir, "workload.json", &workload(transactions));
    let verbose = write_file(&dir, "config.json", &json!({"log_level": "trace"}));

    let runs = [
        vec!["replay".into(), "--workload".into(), path.clone().into_os_string()],
        vec![
            "replay".into(),
            "--workload".into(),
            path.clone().into_os_string(),
            "--config".into(),
            verbose.into_os_string(),
        ],
    ];
    for args in runs {
        let output = Command::new(env!("CARGO_BIN_EXE_aerodb-periods"))
            .args(&args)
            .output()
            .unwrap();
        assert!(output.status.success());

        let response: Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(response["status"], "ok");
        let failures = response["data"]["failures"].as_array().unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0]["code"], "AERO_INVALID_ROW_VERSION");

        // The anomaly is still logged, on stderr
        let stderr = String::from_utf8(output.stderr).unwrap();
        assert!(stderr.contains("ROW_VERSION_ANOMALY"));
    }
}
