//! Candidate classification and the unmatched-reference set-difference.
//!
//! `Reconciler::run` validates both schemas up front, builds the reference
//! index, classifies in-scope candidates in parallel and returns new,
//! annotated tables. Input tables are never modified.
//!
//! Ordering: without a partition filter the candidate output keeps input
//! order. With one, in-scope rows come first and out-of-scope rows second,
//! each group in its original relative order.

use std::collections::HashSet;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::core::error::{PreconditionError, TableRole};
use crate::core::index::{DuplicatePolicy, ReferenceIndex};
use crate::core::normalize::{TicketKey, normalize};
use crate::core::tolerance::{DEFAULT_ROUND_DIGITS, Tolerance, weight_of};
use crate::core::verdict::{Classification, Summary, Verdict, VerdictLabels};
use crate::infra::table::{Cell, Table};

/// Column bindings for both ledgers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnBindings {
    pub key_field_reference: String,
    pub weight_field_reference: String,
    pub key_field_candidate: String,
    pub weight_field_candidate: String,
}

impl Default for ColumnBindings {
    fn default() -> Self {
        Self {
            key_field_reference: "ticket_number".to_string(),
            weight_field_reference: "weight".to_string(),
            key_field_candidate: "ticket_number".to_string(),
            weight_field_candidate: "weight".to_string(),
        }
    }
}

/// Names of the columns appended to the output tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationColumns {
    pub verdict_column: String,
    pub reason_column: String,
    pub missing_column: String,
}

impl Default for AnnotationColumns {
    fn default() -> Self {
        Self {
            verdict_column: "verdict".to_string(),
            reason_column: "expected_weight".to_string(),
            missing_column: "missing_from_candidates".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileOptions {
    pub columns: ColumnBindings,

    /// Only candidates whose `partition_field` displays as
    /// `partition_value` are classified; both must be set
    pub partition_field: Option<String>,
    pub partition_value: Option<String>,

    pub weight_round_digits: u32,
    pub duplicate_policy: DuplicatePolicy,

    pub annotations: AnnotationColumns,

    pub labels: VerdictLabels,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            columns: ColumnBindings::default(),
            partition_field: None,
            partition_value: None,
            weight_round_digits: DEFAULT_ROUND_DIGITS,
            duplicate_policy: DuplicatePolicy::default(),
            annotations: AnnotationColumns::default(),
            labels: VerdictLabels::default(),
        }
    }
}

impl ReconcileOptions {
    /// Active partition filter, if both halves are configured.
    pub fn partition(&self) -> Option<(&str, &str)> {
        match (&self.partition_field, &self.partition_value) {
            (Some(f), Some(v)) => Some((f.as_str(), v.as_str())),
            _ => None,
        }
    }

    pub fn tolerance(&self) -> Tolerance {
        Tolerance::new(self.weight_round_digits)
    }
}

/// Column positions resolved by the upfront schema check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    pub reference_key: usize,
    pub reference_weight: usize,
    pub candidate_key: usize,
    pub candidate_weight: usize,
    pub partition: Option<usize>,
}

/// Everything a reconciliation run produces
#[derive(Debug, Clone)]
pub struct Reconciliation {
    /// Candidate rows in output order with verdict and reason columns
    pub candidates: Table,
    /// Reference rows in input order with the missing marker column
    pub reference: Table,
    /// One entry per output candidate row
    pub classifications: Vec<Classification>,
    /// Input row index of each output candidate row
    pub source_rows: Vec<usize>,
    /// One entry per reference row
    pub missing_mask: Vec<bool>,
    pub summary: Summary,
}

impl Reconciliation {
    /// Output rows whose verdict is a weight mismatch.
    pub fn flagged_rows(&self) -> impl Iterator<Item = usize> + '_ {
        self.classifications
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_flagged())
            .map(|(i, _)| i)
    }
}

/// Classify one candidate against the reference index.
pub fn classify(key: &TicketKey, weight: &Cell, index: &ReferenceIndex, tolerance: Tolerance) -> Verdict {
    if key.is_empty() {
        return Verdict::NoTicket;
    }

    match index.get(key.as_str()) {
        None => Verdict::NoTicket,
        Some(expected) if tolerance.agrees(weight_of(weight), expected) => Verdict::Matched,
        Some(expected) => Verdict::WeightMismatch { expected },
    }
}

/// Flag every reference key that never occurs among `candidate_keys`.
///
/// Empty keys never match, so blank reference tickets are always flagged.
pub fn unmatched_reference<'a>(
    reference_keys: impl IntoIterator<Item = &'a TicketKey>,
    candidate_keys: impl IntoIterator<Item = &'a TicketKey>,
) -> Vec<bool> {
    let seen: HashSet<&str> = candidate_keys
        .into_iter()
        .filter(|k| !k.is_empty())
        .map(TicketKey::as_str)
        .collect();

    reference_keys
        .into_iter()
        .map(|k| k.is_empty() || !seen.contains(k.as_str()))
        .collect()
}

/// Stateless reconciliation engine; one value can serve many runs.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    options: ReconcileOptions,
}

impl Reconciler {
    pub fn new(options: ReconcileOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    /// Check that every configured column exists, before any work starts.
    pub fn validate(&self, reference: &Table, candidates: &Table) -> Result<Schema, PreconditionError> {
        let cols = &self.options.columns;

        let reference_idx = require(
            reference,
            TableRole::Reference,
            &[cols.key_field_reference.as_str(), cols.weight_field_reference.as_str()],
        )?;

        let mut candidate_required = vec![cols.key_field_candidate.as_str(), cols.weight_field_candidate.as_str()];
        if let Some((field, _)) = self.options.partition() {
            candidate_required.push(field);
        }
        let candidate_idx = require(candidates, TableRole::Candidate, &candidate_required)?;

        Ok(Schema {
            reference_key: reference_idx[0],
            reference_weight: reference_idx[1],
            candidate_key: candidate_idx[0],
            candidate_weight: candidate_idx[1],
            partition: candidate_idx.get(2).copied(),
        })
    }

    #[instrument(skip_all, fields(reference_rows = reference.len(), candidate_rows = candidates.len()))]
    pub fn run(&self, reference: &Table, candidates: &Table) -> Result<Reconciliation, PreconditionError> {
        let schema = self.validate(reference, candidates)?;
        let opts = &self.options;

        let index = ReferenceIndex::from_pairs(
            reference
                .rows()
                .iter()
                .map(|row| (&row[schema.reference_key], &row[schema.reference_weight])),
            opts.duplicate_policy,
        )?;

        let candidate_keys: Vec<TicketKey> = candidates
            .rows()
            .par_iter()
            .map(|row| normalize(&row[schema.candidate_key]))
            .collect();

        // Stable partition: in-scope rows first, the rest after
        let (in_scope, rest): (Vec<usize>, Vec<usize>) = match (schema.partition, opts.partition()) {
            (Some(col), Some((_, value))) => {
                (0..candidates.len()).partition(|&i| candidates.rows()[i][col].to_string() == value)
            }
            _ => ((0..candidates.len()).collect(), Vec::new()),
        };

        let tolerance = opts.tolerance();
        let verdicts: Vec<Verdict> = in_scope
            .par_iter()
            .map(|&i| {
                classify(
                    &candidate_keys[i],
                    &candidates.rows()[i][schema.candidate_weight],
                    &index,
                    tolerance,
                )
            })
            .collect();

        let classifications: Vec<Classification> = verdicts
            .into_iter()
            .map(Classification::Classified)
            .chain(rest.iter().map(|_| Classification::OutOfScope))
            .collect();

        let source_rows: Vec<usize> = in_scope.into_iter().chain(rest).collect();

        let reference_keys: Vec<TicketKey> = reference
            .rows()
            .par_iter()
            .map(|row| normalize(&row[schema.reference_key]))
            .collect();
        let missing_mask = unmatched_reference(&reference_keys, &candidate_keys);

        let summary = Summary::tally(&classifications, &missing_mask);
        info!(
            matched = summary.matched,
            discrepant = summary.discrepant,
            no_ticket = summary.no_ticket,
            missing_reference = summary.missing_reference,
            out_of_scope = summary.out_of_scope,
            "reconciliation complete"
        );

        let annotated_candidates = self.annotate_candidates(candidates, &source_rows, &classifications);
        let annotated_reference = self.annotate_reference(reference, &missing_mask);

        Ok(Reconciliation {
            candidates: annotated_candidates,
            reference: annotated_reference,
            classifications,
            source_rows,
            missing_mask,
            summary,
        })
    }

    fn annotate_candidates(
        &self,
        candidates: &Table,
        source_rows: &[usize],
        classifications: &[Classification],
    ) -> Table {
        let names = &self.options.annotations;
        let labels = &self.options.labels;

        let mut out = candidates.select_rows(source_rows);
        out.set_column(
            &names.verdict_column,
            classifications.iter().map(|c| labels.verdict_cell(c)),
        );
        out.set_column(
            &names.reason_column,
            classifications.iter().map(|c| labels.reason_cell(c)),
        );
        out
    }

    fn annotate_reference(&self, reference: &Table, missing_mask: &[bool]) -> Table {
        let mut out = reference.clone();
        out.set_column(
            &self.options.annotations.missing_column,
            missing_mask.iter().map(|m| Cell::Bool(*m)),
        );
        out
    }
}

/// Resolve column positions or report every missing name at once.
fn require(table: &Table, role: TableRole, names: &[&str]) -> Result<Vec<usize>, PreconditionError> {
    let resolved: Vec<Option<usize>> = names.iter().map(|n| table.column_index(n)).collect();

    if resolved.iter().all(Option::is_some) {
        return Ok(resolved.into_iter().flatten().collect());
    }

    // `[]` carries no column names at all. A table without rows meets any
    // column requirement; its positions are never read.
    if table.is_empty() {
        return Ok(resolved.into_iter().map(|idx| idx.unwrap_or(usize::MAX)).collect());
    }

    let missing = names
        .iter()
        .zip(&resolved)
        .filter(|(_, idx)| idx.is_none())
        .map(|(name, _)| name.to_string())
        .collect();

    Err(PreconditionError::missing_columns(role, missing, table.columns().to_vec()))
}
