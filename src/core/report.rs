//! Human and machine renderings of a reconciliation run.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use owo_colors::{AnsiColors, OwoColorize};
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table as TextTable, Tabled};

use crate::cli::AppContext;
use crate::core::reconcile::{ReconcileOptions, Reconciliation};
use crate::core::verdict::Summary;
use crate::infra::table::Cell;

pub const SCHEMA_VERSION: u32 = 1;

/// Files written by a run
#[derive(Debug, Clone, Serialize)]
pub struct OutputPaths {
    pub reference: PathBuf,
    pub candidates: PathBuf,
    pub summary: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct PartitionFilter {
    pub field: String,
    pub value: String,
}

/// Contents of `summary.json` and of `--json` output
#[derive(Debug, Clone, Serialize)]
pub struct SummaryDocument {
    pub schema_version: u32,
    pub generated_at: DateTime<Utc>,
    pub reference: PathBuf,
    pub candidates: PathBuf,
    pub weight_round_digits: u32,
    pub partition: Option<PartitionFilter>,
    pub elapsed_ms: u64,
    pub summary: Summary,
    /// Matched plus discrepant
    pub present: usize,
    /// `None` on dry runs
    pub outputs: Option<OutputPaths>,
}

impl SummaryDocument {
    pub fn new(
        reference: PathBuf,
        candidates: PathBuf,
        options: &ReconcileOptions,
        summary: Summary,
        elapsed: Duration,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            generated_at: Utc::now(),
            reference,
            candidates,
            weight_round_digits: options.weight_round_digits,
            partition: options.partition().map(|(field, value)| PartitionFilter {
                field: field.to_string(),
                value: value.to_string(),
            }),
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            present: summary.present(),
            summary,
            outputs: None,
        }
    }
}

fn paint(ctx: &AppContext, text: &str, color: AnsiColors) -> String {
    if ctx.no_color {
        text.to_string()
    } else {
        text.color(color).to_string()
    }
}

/// Multi-line human summary.
pub fn render_summary(summary: &Summary, elapsed: Duration, ctx: &AppContext) -> String {
    let mut out = format!(
        "Reconciled {} candidate rows against {} reference rows in {:.2}s\n",
        summary.candidate_rows,
        summary.reference_rows,
        elapsed.as_secs_f64()
    );

    let lines = [
        ("✓", "ticket present, weight matches", summary.matched, AnsiColors::Green),
        ("⚖", "ticket present, weight differs", summary.discrepant, AnsiColors::Red),
        ("✗", "no ticket present", summary.no_ticket, AnsiColors::Yellow),
        ("↺", "reference tickets missing from candidates", summary.missing_reference, AnsiColors::Magenta),
    ];
    for (mark, label, count, color) in lines {
        out.push_str(&format!("  {} {:<42} {}\n", paint(ctx, mark, color), label, count));
    }

    if summary.out_of_scope > 0 {
        out.push_str(&format!(
            "  {} {:<42} {}\n",
            paint(ctx, "·", AnsiColors::BrightBlack),
            "outside the partition filter",
            summary.out_of_scope
        ));
    }

    out
}

#[derive(Tabled)]
struct FlaggedRow {
    #[tabled(rename = "row")]
    row: usize,
    #[tabled(rename = "ticket")]
    ticket: String,
    #[tabled(rename = "weight")]
    weight: String,
    #[tabled(rename = "expected")]
    expected: String,
}

/// Table of discrepant candidate rows, or `None` if there are none.
///
/// Row numbers are 1-based positions in the candidate input.
pub fn render_flagged(recon: &Reconciliation, options: &ReconcileOptions) -> Option<String> {
    let ticket_idx = recon.candidates.column_index(&options.columns.key_field_candidate)?;
    let weight_idx = recon.candidates.column_index(&options.columns.weight_field_candidate)?;

    let rows: Vec<FlaggedRow> = recon
        .flagged_rows()
        .map(|i| {
            let cell = |col| recon.candidates.cell(i, col).map(Cell::to_string).unwrap_or_default();
            FlaggedRow {
                row: recon.source_rows[i] + 1,
                ticket: cell(ticket_idx),
                weight: cell(weight_idx),
                expected: recon.classifications[i]
                    .verdict()
                    .and_then(|v| v.expected_weight())
                    .map(|w| w.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            }
        })
        .collect();

    if rows.is_empty() {
        return None;
    }

    let mut table = TextTable::new(rows);
    table.with(Style::rounded());
    Some(table.to_string())
}
