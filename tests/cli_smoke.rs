//! End-to-end runs of the `lmatch` binary against on-disk ledgers.

mod util;

use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use ledgermatch::{Summary, Table};
use predicates::prelude::*;
use serde_json::Value;
use std::process::Command;

fn lmatch(dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("lmatch").expect("lmatch binary");
    cmd.current_dir(dir).env_remove("RUST_LOG").env_remove("LEDGERMATCH_LOG");
    cmd
}

fn write_config(tmp: &assert_fs::TempDir) {
    tmp.child("ledgermatch.toml")
        .write_str(util::WEIGHBRIDGE_CONFIG)
        .expect("write config");
}

#[test]
fn reconcile_json_summary() {
    let tmp = util::weighbridge_fixture();
    write_config(&tmp);

    let assert = lmatch(tmp.path())
        .args(["--quiet", "reconcile", "-r", "reference.json", "-c", "candidates.json", "--json"])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    let v: Value = serde_json::from_str(stdout.trim()).expect("valid json");

    assert_eq!(v["schema_version"], 1);
    assert_eq!(v["present"], 2);
    assert_eq!(v["partition"]["value"], "Berkel");
    assert!(v["outputs"]["summary"].as_str().is_some_and(|p| p.ends_with("summary.json")));

    // Timestamps and paths vary per run; the counts do not
    let summary: Summary = serde_json::from_value(v["summary"].clone()).expect("summary");
    insta::assert_yaml_snapshot!(summary, @r#"
    matched: 1
    discrepant: 1
    no_ticket: 2
    missing_reference: 1
    classified: 4
    out_of_scope: 1
    candidate_rows: 5
    reference_rows: 4
    "#);
}

#[test]
fn reconcile_writes_annotated_tables() {
    let tmp = util::weighbridge_fixture();
    write_config(&tmp);

    lmatch(tmp.path())
        .args(["reconcile", "-r", "reference.json", "-c", "candidates.json", "--no-color"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Reconciled 5 candidate rows against 4 reference rows"))
        .stdout(predicate::str::contains("Results written to"));

    let out = tmp.child("ledgermatch-out");
    out.child("summary.json").assert(predicate::path::exists());

    let candidates =
        Table::parse_json(&std::fs::read_to_string(out.child("candidates.json").path()).unwrap()).unwrap();
    let verdict = candidates.column_index("verdict").unwrap();
    let reason = candidates.column_index("expected_weight").unwrap();
    let verdicts: Vec<String> = (0..candidates.len())
        .map(|i| candidates.cell(i, verdict).unwrap().to_string())
        .collect();

    // In-scope rows first, the out-of-scope row last and unlabelled
    assert_eq!(
        verdicts,
        vec!["ticket present", "ticket present", "no ticket present", "no ticket present", ""]
    );
    assert_eq!(candidates.cell(1, reason).unwrap().as_number(), Some(80.25));

    let reference =
        Table::parse_json(&std::fs::read_to_string(out.child("reference.json").path()).unwrap()).unwrap();
    let missing = reference.column_index("missing_from_candidates").unwrap();
    let flags: Vec<String> = (0..reference.len())
        .map(|i| reference.cell(i, missing).unwrap().to_string())
        .collect();
    assert_eq!(flags, vec!["false", "false", "true", "false"]);
}

#[test]
fn reconcile_jsonl_output_and_flagged_rows() {
    let tmp = util::weighbridge_fixture();
    write_config(&tmp);

    lmatch(tmp.path())
        .args([
            "reconcile",
            "-r",
            "reference.json",
            "-c",
            "candidates.json",
            "--format",
            "jsonl",
            "--show-flagged",
            "--no-color",
            "-o",
            "out",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("80.25"));

    let text = std::fs::read_to_string(tmp.child("out/candidates.jsonl").path()).unwrap();
    assert_eq!(text.lines().count(), 5);
}

#[test]
fn dry_run_writes_nothing() {
    let tmp = util::weighbridge_fixture();
    write_config(&tmp);

    lmatch(tmp.path())
        .args(["--dry-run", "reconcile", "-r", "reference.json", "-c", "candidates.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("DRY RUN"));

    tmp.child("ledgermatch-out").assert(predicate::path::missing());
}

#[test]
fn check_reports_missing_column() {
    let tmp = util::weighbridge_fixture();

    // No config: the default column names do not exist in the fixture
    lmatch(tmp.path())
        .args(["check", "-r", "reference.json", "-c", "candidates.json", "--json"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"ok\":false"))
        .stdout(predicate::str::contains("ledgermatch::missing_columns"));
}

#[test]
fn check_passes_with_column_flags() {
    let tmp = util::weighbridge_fixture();

    lmatch(tmp.path())
        .args([
            "check",
            "-r",
            "reference.json",
            "-c",
            "candidates.json",
            "--ref-key",
            "weegbonnr",
            "--ref-weight",
            "gewicht",
            "--cand-key",
            "Weegbonnummer",
            "--cand-weight",
            "Gewicht(kg)",
            "--no-color",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("(5 rows)"));
}

#[test]
fn environment_overrides_config_file() {
    let tmp = util::weighbridge_fixture();
    write_config(&tmp);

    // Only the row bound for the other destination is classified now
    let assert = lmatch(tmp.path())
        .env("LEDGERMATCH_RECONCILE__PARTITION_VALUE", "Elders")
        .args(["--quiet", "--dry-run", "reconcile", "-r", "reference.json", "-c", "candidates.json", "--json"])
        .assert()
        .success();

    let v: Value = serde_json::from_slice(&assert.get_output().stdout).expect("valid json");
    assert_eq!(v["summary"]["classified"], 1);
    assert_eq!(v["summary"]["matched"], 1);
    assert_eq!(v["outputs"], Value::Null);
}

#[test]
fn init_creates_config_once() {
    let tmp = assert_fs::TempDir::new().unwrap();

    lmatch(tmp.path()).args(["init"]).assert().success();
    tmp.child("ledgermatch.toml")
        .assert(predicate::str::contains("[reconcile.columns]"));

    lmatch(tmp.path())
        .args(["init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
}

#[test]
fn reconcile_empty_candidate_export_flags_every_reference_row() {
    let tmp = util::ledger_fixture(
        serde_json::json!([
            {"ticket_number": 2002, "weight": 15.0},
            {"ticket_number": "1001", "weight": 120.0}
        ]),
        serde_json::json!([]),
    );

    let assert = lmatch(tmp.path())
        .args(["--quiet", "reconcile", "-r", "reference.json", "-c", "candidates.json", "--json"])
        .assert()
        .success();

    let v: Value = serde_json::from_slice(&assert.get_output().stdout).expect("valid json");
    assert_eq!(v["summary"]["missing_reference"], 2);
    assert_eq!(v["summary"]["candidate_rows"], 0);

    let reference = Table::parse_json(
        &std::fs::read_to_string(tmp.child("ledgermatch-out/reference.json").path()).unwrap(),
    )
    .unwrap();
    let missing = reference.column_index("missing_from_candidates").unwrap();
    assert!((0..reference.len()).all(|i| reference.cell(i, missing) == Some(&ledgermatch::Cell::Bool(true))));
}

#[test]
fn reconcile_missing_column_shows_available_columns() {
    let tmp = util::weighbridge_fixture();

    // No config: the default column names do not exist in the fixture
    lmatch(tmp.path())
        .args(["reconcile", "-r", "reference.json", "-c", "candidates.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("available columns"))
        .stderr(predicate::str::contains("weegbonnr"));

    tmp.child("ledgermatch-out").assert(predicate::path::missing());
}
