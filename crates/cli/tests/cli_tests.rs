// Integration tests for the `poledger` binary: run, validate, merge, breakdown.
// Run with: cargo test -p poledger-cli --test cli_tests -- --nocapture

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

fn poledger() -> Command {
    Command::new(env!("CARGO_BIN_EXE_poledger"))
}

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../recon/tests/fixtures")
}

/// Temp dir holding a copy of the MICU fixture config and its inputs.
fn micu_workspace() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for entry in fs::read_dir(fixtures_dir()).unwrap() {
        let path = entry.unwrap().path();
        fs::copy(&path, dir.path().join(path.file_name().unwrap())).unwrap();
    }
    dir
}

fn run(args: &[&str]) -> Output {
    poledger().args(args).output().expect("spawn poledger")
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

fn p(path: &Path) -> &str {
    path.to_str().unwrap()
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

#[test]
fn run_writes_keep_list_as_csv_directory() {
    let ws = micu_workspace();
    let config = ws.path().join("micu.ledger.toml");
    let out_dir = ws.path().join("report");

    let out = run(&["run", p(&config), "-o", p(&out_dir)]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    for name in [
        "pc_overview AP",
        "pc_overview AR",
        "Combined PM Types",
        "Detailed Combined PM Types",
        "Base-Build_breakdown",
    ] {
        assert!(out_dir.join(format!("{name}.csv")).exists(), "missing {name}.csv");
    }
    // Produced but not on the keep-list
    assert!(!out_dir.join("AP Analysis.csv").exists());

    let ledger = fs::read_to_string(out_dir.join("pc_overview AP.csv")).unwrap();
    assert_eq!(ledger.lines().count(), 6, "header + 5 merged POs:\n{ledger}");
    assert!(!ledger.contains("4410"));

    let err = stderr(&out);
    assert!(err.contains("3 appended"), "stderr: {err}");
    assert!(err.contains("wrote 5 of"), "stderr: {err}");
}

#[test]
fn run_json_reports_summary_and_assembly() {
    let ws = micu_workspace();
    let config = ws.path().join("micu.ledger.toml");
    let report = ws.path().join("report.json");

    let out = run(&["run", p(&config), "-o", p(&report), "--json"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let result: serde_json::Value = serde_json::from_slice(&out.stdout).expect("valid JSON");
    assert_eq!(result["meta"]["config_name"], "MICU AR/AP Breakdown");
    assert_eq!(result["summary"]["sources"]["ap"]["appended"], 3);
    assert_eq!(result["summary"]["sources"]["ap"]["skipped"], 1);
    assert_eq!(result["summary"]["sources"]["ap"]["excluded"], 2);
    assert_eq!(result["summary"]["sources"]["ar"]["total_amount"], 56000.0);
    assert_eq!(result["assembled"]["written"].as_array().unwrap().len(), 5);

    let written: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
    let names: Vec<&str> = written
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec![
            "pc_overview AP",
            "pc_overview AR",
            "Combined PM Types",
            "Detailed Combined PM Types",
            "Base-Build_breakdown",
        ]
    );
}

#[test]
fn run_rebuilds_existing_workbook_in_place() {
    let ws = micu_workspace();
    let config = ws.path().join("micu.ledger.toml");
    let workbook = ws.path().join("MICU AR-AP Breakdown.xlsx");

    let out = run(&["run", p(&config), "-o", p(&workbook)]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let out = run(&["run", p(&config), "-o", p(&workbook)]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let sheets = poledger_io::xlsx::sheet_names(&workbook).unwrap();
    assert_eq!(
        sheets,
        vec![
            "pc_overview AP",
            "pc_overview AR",
            "Combined PM Types",
            "Detailed Combined PM Types",
            "Base-Build_breakdown",
        ]
    );
}

#[test]
fn run_missing_required_column_exits_5() {
    let ws = micu_workspace();
    let config = ws.path().join("strict.ledger.toml");
    fs::write(
        &config,
        r#"
name = "strict"
[sources.ap]
master = { file = "ap_stack.csv" }
key_column = "PO #"
amount_column = "Amount"
required_columns = ["Cost Code"]
[sources.ap.outputs]
ledger = "pc_overview AP"
[report]
keep = ["pc_overview AP"]
"#,
    )
    .unwrap();
    let out_dir = ws.path().join("out");

    let out = run(&["run", p(&config), "-o", p(&out_dir)]);
    assert_eq!(out.status.code(), Some(5));
    assert!(stderr(&out).contains("Cost Code"));
    assert!(!out_dir.join("pc_overview AP.csv").exists());
}

#[test]
fn run_missing_input_file_exits_4() {
    let ws = tempfile::tempdir().unwrap();
    let config = ws.path().join("absent.ledger.toml");
    fs::write(
        &config,
        r#"
name = "absent"
[sources.ap]
master = { file = "nowhere.csv" }
key_column = "PO #"
amount_column = "Amount"
[sources.ap.outputs]
ledger = "pc_overview AP"
[report]
keep = ["pc_overview AP"]
"#,
    )
    .unwrap();

    let out = run(&["run", p(&config), "-o", p(&ws.path().join("out"))]);
    assert_eq!(out.status.code(), Some(4));
    assert!(stderr(&out).contains("nowhere.csv"));
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

#[test]
fn validate_lists_producible_tables() {
    let config = fixtures_dir().join("micu.ledger.toml");
    let out = run(&["validate", p(&config), "--json"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let tables: Vec<&str> = v["tables"].as_array().unwrap().iter().map(|t| t.as_str().unwrap()).collect();
    assert!(tables.contains(&"AP Analysis"));
    assert!(tables.contains(&"AP Scope Percentages"));
    assert!(tables.contains(&"Base-Build_breakdown"));
    assert!(stderr(&out).contains("config OK"));
}

#[test]
fn validate_rejects_bad_config_with_exit_3() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("bad.ledger.toml");
    fs::write(&config, "name = 1\n").unwrap();

    let out = run(&["validate", p(&config)]);
    assert_eq!(out.status.code(), Some(3));
    assert!(stderr(&out).contains("config parse error"));
}

// ---------------------------------------------------------------------------
// merge
// ---------------------------------------------------------------------------

#[test]
fn merge_appends_new_keys_and_drops_excluded() {
    let dir = tempfile::tempdir().unwrap();
    let merged = dir.path().join("merged.csv");

    let out = run(&[
        "merge",
        p(&fixtures_dir().join("ap_stack.csv")),
        p(&fixtures_dir().join("ap_overview.csv")),
        "--key",
        "PO #",
        "--exclude",
        "4410",
        "-o",
        p(&merged),
    ]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let content = fs::read_to_string(&merged).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 6, "{content}");
    assert!(lines[0].ends_with("Buyer"));
    assert!(lines[1].starts_with("P-100,1001,"));
    assert!(lines[3].contains("FlowRite"));
    assert!(!content.contains("4410"));
    assert!(stderr(&out).contains("1 duplicate(s) skipped"));
}

#[test]
fn merge_rejects_unknown_output_extension() {
    let dir = tempfile::tempdir().unwrap();
    let out = run(&[
        "merge",
        p(&fixtures_dir().join("ap_stack.csv")),
        p(&fixtures_dir().join("ap_overview.csv")),
        "--key",
        "PO #",
        "-o",
        p(&dir.path().join("merged.pdf")),
    ]);
    assert_eq!(out.status.code(), Some(2));
}

// ---------------------------------------------------------------------------
// breakdown
// ---------------------------------------------------------------------------

#[test]
fn breakdown_prints_json_without_output() {
    let out = run(&[
        "breakdown",
        p(&fixtures_dir().join("ap_overview.csv")),
        "--amount",
        "Amount",
        "--dims",
        "Main/CO/DCR",
    ]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let rows = v["breakdown"]["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 3);
    let total: f64 = rows.iter().map(|r| r["total"].as_f64().unwrap()).sum();
    assert!((total - 20500.0).abs() < 1e-9);
    assert!(v["crosstab"].is_null());
}

#[test]
fn breakdown_with_rules_and_crosstab_writes_workbook() {
    let dir = tempfile::tempdir().unwrap();
    let workbook = dir.path().join("analysis.xlsx");

    let out = run(&[
        "breakdown",
        p(&fixtures_dir().join("ap_overview.csv")),
        "--amount",
        "Amount",
        "--describe",
        "PO Description",
        "--rule",
        "mechanical=Mechanical",
        "--rule",
        "plumbing=Plumbing",
        "--dims",
        "PM Type,Main/CO/DCR",
        "--category",
        "PM Type",
        "--rows",
        "PM Type",
        "--columns",
        "Main/CO/DCR",
        "--taxonomy",
        "Main Contract Scope,DCR Scope",
        "-o",
        p(&workbook),
    ]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let sheets = poledger_io::xlsx::sheet_names(&workbook).unwrap();
    assert_eq!(
        sheets,
        vec!["ap_overview Breakdown", "ap_overview Amounts", "ap_overview Percentages"]
    );
    let amounts = poledger_io::xlsx::import_sheet(&workbook, Some("ap_overview Amounts")).unwrap();
    assert_eq!(amounts.columns(), &["PM Type", "Main Contract Scope", "DCR Scope", "Unspecified"]);
}

#[test]
fn breakdown_on_amount_column_exits_6() {
    let out = run(&[
        "breakdown",
        p(&fixtures_dir().join("ap_overview.csv")),
        "--amount",
        "Amount",
        "--dims",
        "Amount",
    ]);
    assert_eq!(out.status.code(), Some(6));
    assert!(stderr(&out).contains("invalid dimension 'Amount'"));
}
