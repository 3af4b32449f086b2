//! Precondition failures: the only errors the reconciliation core raises.
//!
//! Per-row data-quality problems are never errors; they surface as verdicts.

use std::fmt;

use miette::Diagnostic;
use serde::Serialize;

/// Which input a precondition failure refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TableRole {
    Reference,
    Candidate,
}

impl fmt::Display for TableRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableRole::Reference => write!(f, "reference"),
            TableRole::Candidate => write!(f, "candidate"),
        }
    }
}

/// Schema problems detected before any row is classified
#[derive(Debug, Clone, PartialEq, Eq, Diagnostic, thiserror::Error)]
pub enum PreconditionError {
    #[error("{table} table is missing required column(s): {}", .missing.join(", "))]
    #[diagnostic(code(ledgermatch::missing_columns))]
    MissingColumns {
        table: TableRole,
        missing: Vec<String>,
        available: Vec<String>,
        #[help]
        help: String,
    },

    /// Only raised under `DuplicatePolicy::Reject`; rows are 1-based
    #[error("reference ticket `{key}` appears on rows {first_row} and {second_row}")]
    #[diagnostic(
        code(ledgermatch::duplicate_reference_key),
        help("deduplicate the reference ledger or set duplicate_policy = \"last-wins\"")
    )]
    DuplicateReferenceKey {
        key: String,
        first_row: usize,
        second_row: usize,
    },
}

impl PreconditionError {
    /// Missing-columns error whose help lists what the table does have.
    pub fn missing_columns(table: TableRole, missing: Vec<String>, available: Vec<String>) -> Self {
        let help = if available.is_empty() {
            "the rows carry no fields at all".to_string()
        } else {
            format!("available columns: {}", available.join(", "))
        };
        PreconditionError::MissingColumns { table, missing, available, help }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_message_and_help() {
        let err = PreconditionError::missing_columns(
            TableRole::Candidate,
            vec!["weight".into(), "ticket".into()],
            vec!["a".into(), "b".into()],
        );

        assert_eq!(
            err.to_string(),
            "candidate table is missing required column(s): weight, ticket"
        );
        assert_eq!(err.help().unwrap().to_string(), "available columns: a, b");
        assert_eq!(err.code().unwrap().to_string(), "ledgermatch::missing_columns");
    }

    #[test]
    fn test_duplicate_key_diagnostic() {
        let err = PreconditionError::DuplicateReferenceKey { key: "7".into(), first_row: 1, second_row: 3 };

        assert_eq!(err.code().unwrap().to_string(), "ledgermatch::duplicate_reference_key");
        assert!(err.help().unwrap().to_string().contains("last-wins"));
    }
}
