//! Shared test utilities for integration tests
//!
//! Provides ledger fixture creation and small helpers
//! used across multiple test files.

#![allow(dead_code)]

use assert_fs::prelude::*;
use ledgermatch::Table;
use serde_json::Value;

/// Build an in-memory table from a JSON array of row objects.
pub fn table(rows: Value) -> Table
{
    Table::from_json_value(&rows).expect("fixture rows form a table")
}

/// Write both ledgers as JSON files into a fresh temp directory.
///
/// Files land at `reference.json` and `candidates.json`.
pub fn ledger_fixture(
    reference: Value,
    candidates: Value,
) -> assert_fs::TempDir
{
    // Initialize the temporary project root
    let tmp = assert_fs::TempDir::new().expect("tempdir");

    tmp.child("reference.json")
        .write_str(&serde_json::to_string_pretty(&reference).expect("serialize reference"))
        .expect("write reference");

    tmp.child("candidates.json")
        .write_str(&serde_json::to_string_pretty(&candidates).expect("serialize candidates"))
        .expect("write candidates");

    // Return the prepared directory to the caller
    tmp
}

/// The weighbridge example used by the end-to-end tests: Dutch column
/// names, one partition value in scope, a mix of every verdict.
pub fn weighbridge_fixture() -> assert_fs::TempDir
{
    let reference = serde_json::json!([
        {"weegbonnr": 1001, "gewicht": 120.0, "klant": "A"},
        {"weegbonnr": "1002", "gewicht": 80.25, "klant": "B"},
        {"weegbonnr": 2002, "gewicht": 15.0, "klant": "C"},
        {"weegbonnr": "1003.0", "gewicht": 40.0, "klant": "D"}
    ]);
    let candidates = serde_json::json!([
        {"Weegbonnummer": "1001.0", "Gewicht(kg)": 120.04, "Bestemming": "Berkel"},
        {"Weegbonnummer": 1002, "Gewicht(kg)": 79.0, "Bestemming": "Berkel"},
        {"Weegbonnummer": null, "Gewicht(kg)": 10.0, "Bestemming": "Berkel"},
        {"Weegbonnummer": "1003", "Gewicht(kg)": 40.0, "Bestemming": "Elders"},
        {"Weegbonnummer": "ABC-7", "Gewicht(kg)": 3.0, "Bestemming": "Berkel"}
    ]);
    ledger_fixture(reference, candidates)
}

/// Config binding the weighbridge fixture's columns.
pub const WEIGHBRIDGE_CONFIG: &str = r#"
[reconcile]
partition_field = "Bestemming"
partition_value = "Berkel"

[reconcile.columns]
key_field_reference = "weegbonnr"
weight_field_reference = "gewicht"
key_field_candidate = "Weegbonnummer"
weight_field_candidate = "Gewicht(kg)"
"#;
