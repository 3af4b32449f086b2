//! Verdict taxonomy and run summary.

use serde::{Deserialize, Serialize};

use crate::infra::table::Cell;

/// Outcome of classifying one in-scope candidate row.
///
/// A blank ticket and a ticket unknown to the reference ledger both yield
/// `NoTicket`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Verdict {
    /// Ticket found and weights agree at the configured precision
    Matched,
    /// Ticket found but the weights differ, or one side is not a number.
    /// `expected` is the reference weight, if it is numeric.
    WeightMismatch { expected: Option<f64> },
    NoTicket,
}

impl Verdict {
    /// Ticket was found in the reference index.
    pub fn is_present(&self) -> bool {
        !matches!(self, Verdict::NoTicket)
    }

    /// Row should be highlighted for review.
    pub fn is_flagged(&self) -> bool {
        matches!(self, Verdict::WeightMismatch { .. })
    }

    pub fn expected_weight(&self) -> Option<f64> {
        match self {
            Verdict::WeightMismatch { expected } => *expected,
            _ => None,
        }
    }
}

/// Per-row result including rows excluded by the partition filter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Classified(Verdict),
    OutOfScope,
}

impl Classification {
    pub fn verdict(&self) -> Option<&Verdict> {
        match self {
            Classification::Classified(v) => Some(v),
            Classification::OutOfScope => None,
        }
    }

    pub fn is_flagged(&self) -> bool {
        self.verdict().is_some_and(Verdict::is_flagged)
    }
}

/// Text written into the verdict column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerdictLabels {
    /// Matched and weight-mismatch rows
    pub present: String,
    pub no_ticket: String,
    /// Reason cell of a mismatch whose reference weight is not a number
    pub unreadable_weight: String,
}

impl Default for VerdictLabels {
    fn default() -> Self {
        Self {
            present: "ticket present".to_string(),
            no_ticket: "no ticket present".to_string(),
            unreadable_weight: "reference weight not numeric".to_string(),
        }
    }
}

impl VerdictLabels {
    pub fn verdict_cell(&self, classification: &Classification) -> Cell {
        match classification {
            Classification::Classified(v) if v.is_present() => Cell::text(&self.present),
            Classification::Classified(_) => Cell::text(&self.no_ticket),
            Classification::OutOfScope => Cell::Empty,
        }
    }

    /// Reason column: the expected weight on mismatches, otherwise empty.
    ///
    /// Never empty for a mismatch, so a flagged row cannot read as matched.
    pub fn reason_cell(&self, classification: &Classification) -> Cell {
        match classification.verdict() {
            Some(Verdict::WeightMismatch { expected: Some(w) }) => Cell::Number(*w),
            Some(Verdict::WeightMismatch { expected: None }) => Cell::text(&self.unreadable_weight),
            _ => Cell::Empty,
        }
    }
}

/// Aggregate counts for one reconciliation run.
///
/// `matched + discrepant + no_ticket == classified` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub matched: usize,
    pub discrepant: usize,
    pub no_ticket: usize,
    /// Reference rows whose key never appears among the candidates
    pub missing_reference: usize,
    pub classified: usize,
    pub out_of_scope: usize,
    pub candidate_rows: usize,
    pub reference_rows: usize,
}

impl Summary {
    pub fn tally(classifications: &[Classification], missing_mask: &[bool]) -> Self {
        let mut summary = Summary {
            candidate_rows: classifications.len(),
            reference_rows: missing_mask.len(),
            missing_reference: missing_mask.iter().filter(|m| **m).count(),
            ..Summary::default()
        };

        for c in classifications {
            match c {
                Classification::Classified(Verdict::Matched) => summary.matched += 1,
                Classification::Classified(Verdict::WeightMismatch { .. }) => summary.discrepant += 1,
                Classification::Classified(Verdict::NoTicket) => summary.no_ticket += 1,
                Classification::OutOfScope => summary.out_of_scope += 1,
            }
        }
        summary.classified = summary.matched + summary.discrepant + summary.no_ticket;

        summary
    }

    /// Rows whose ticket was found, whatever the weight comparison said.
    pub fn present(&self) -> usize {
        self.matched + self.discrepant
    }

    pub fn is_consistent(&self) -> bool {
        self.matched + self.discrepant + self.no_ticket == self.classified
            && self.classified + self.out_of_scope == self.candidate_rows
            && self.missing_reference <= self.reference_rows
    }
}
