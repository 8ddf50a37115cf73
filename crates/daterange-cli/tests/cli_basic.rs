//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary and verify outputs.

use std::process::Command;

/// Run a CLI command and return output.
fn run_cli(args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_daterange-cli"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

fn parse_json(stdout: &str) -> serde_json::Value {
    serde_json::from_str(stdout).expect("Failed to parse JSON output")
}

#[test]
fn test_query_single_field() {
    let (code, stdout, _) = run_cli(&[
        "query", "--field", "created", "--start", "2024-01-30", "--end", "2024-02-02",
    ]);
    assert_eq!(code, 0, "query failed");
    let query = parse_json(&stdout);
    assert_eq!(query["range"]["created"]["gte"], 1_706_572_800_000i64);
    assert_eq!(query["range"]["created"]["lte"], 1_706_832_000_000i64);
}

#[test]
fn test_query_field_pair_in_seconds() {
    let (code, stdout, _) = run_cli(&[
        "query",
        "--field",
        "eventStart",
        "--field",
        "eventEnd",
        "--start",
        "1700000000500",
        "--end",
        "1700086400500",
        "--format",
        "epoch_seconds",
    ]);
    assert_eq!(code, 0, "query failed");
    let query = parse_json(&stdout);
    assert_eq!(query["bool"]["must"][0]["range"]["eventStart"]["lte"], 1_700_000_000i64);
    assert_eq!(query["bool"]["must"][1]["range"]["eventEnd"]["gte"], 1_700_086_400i64);
}

#[test]
fn test_query_rejects_reversed_range() {
    let (code, _, stderr) = run_cli(&[
        "query", "--field", "created", "--start", "2024-02-02", "--end", "2024-01-30",
    ]);
    assert_ne!(code, 0);
    assert!(stderr.contains("error: Validation error: Invalid date range"));
}

#[test]
fn test_query_rejects_unreadable_date() {
    let (code, _, stderr) = run_cli(&[
        "query", "--field", "created", "--start", "someday", "--end", "2024-01-30",
    ]);
    assert_ne!(code, 0);
    assert!(stderr.contains("Invalid date 'someday'"));
}

#[test]
fn test_marks_cross_month() {
    let (code, stdout, _) = run_cli(&["marks", "--start", "2024-01-30", "--end", "2024-02-02"]);
    assert_eq!(code, 0, "marks failed");
    let marks = parse_json(&stdout);
    let marks = marks.as_object().unwrap();
    assert_eq!(marks.len(), 4);
    assert_eq!(marks["2024-01-30"]["role"], "start");
    assert_eq!(marks["2024-01-31"]["role"], "in-range");
    assert_eq!(marks["2024-02-02"]["role"], "end");
}

#[test]
fn test_simulate_deferred_then_reset() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scenario.toml");
    std::fs::write(
        &path,
        r#"
intercept = "defer"

[config]
component_id = "when"
data_field = ["eventStart", "eventEnd"]

[config.default_selected]
start = "2024-01-30"
end = "2024-02-02"

[[events]]
kind = "reset"

[[events]]
kind = "resolve"
decision = "proceed"

[[events]]
kind = "resolve"
decision = "proceed"
"#,
    )
    .unwrap();

    let (code, stdout, stderr) = run_cli(&[
        "simulate",
        path.to_str().unwrap(),
        "--today",
        "2026-10-18",
    ]);
    assert_eq!(code, 0, "simulate failed: {stderr}");
    let report = parse_json(&stdout);
    assert_eq!(report["state"]["state"], "empty");
    assert_eq!(report["awaiting_interception"], false);
    assert_eq!(report["display_text"], "Select a range of dates");
    assert_eq!(report["calendar"]["current"], "2026-10-18");
    // The reset supersedes the deferred default; only its own null value is published.
    let publications = report["publications"].as_array().unwrap();
    assert_eq!(publications.len(), 1);
    assert!(publications[0]["value"].is_null());
}

#[test]
fn test_simulate_picks() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scenario.toml");
    std::fs::write(
        &path,
        r#"
[config]
component_id = "when"
data_field = "created"
query_format = "date"

[[events]]
kind = "pick"
date = "2024-01-30"

[[events]]
kind = "pick"
date = "2024-02-02"
"#,
    )
    .unwrap();

    let (code, stdout, stderr) = run_cli(&["simulate", path.to_str().unwrap()]);
    assert_eq!(code, 0, "simulate failed: {stderr}");
    let report = parse_json(&stdout);
    assert_eq!(report["display_text"], "2024-01-30 to 2024-02-02");
    let publications = report["publications"].as_array().unwrap();
    assert_eq!(publications.len(), 1);
    assert_eq!(publications[0]["query"]["range"]["created"]["gte"], "2024-01-30");
    assert_eq!(report["calendar"]["markedDates"].as_object().unwrap().len(), 4);
}

#[test]
fn test_config_check_missing_file() {
    let (code, _, stderr) = run_cli(&["config", "check", "/nonexistent/range.toml"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("Failed to load configuration"));
}
