//! Ticket-number canonicalization.
//!
//! Both ledgers store ticket numbers inconsistently: integers, floats with a
//! trailing `.0`, numeric text, or genuine alphanumeric codes. `normalize`
//! folds all of them into one comparable key.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::infra::table::Cell;

/// Canonical, comparable form of a ticket number.
///
/// The empty key means "no ticket number present" and never matches a
/// reference entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketKey(String);

impl TicketKey {
    /// The reserved "no ticket" key.
    pub fn none() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Borrow<str> for TicketKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonicalize a raw ticket-number cell.
///
/// - empty, or blank after trimming: the empty key
/// - anything readable as a finite float: the digits of its integer part
///   (`1234.0`, `"1234.0"` and `" 1234 "` all give `"1234"`)
/// - everything else: the trimmed text, unchanged
///
/// Never fails; unreadable values fall through to the trimmed text.
pub fn normalize(raw: &Cell) -> TicketKey {
    match raw {
        Cell::Empty => TicketKey::none(),
        Cell::Bool(b) => TicketKey(if *b { "1" } else { "0" }.to_string()),
        // Integers take the float path too, so `1234` and `"1234"` agree
        // even beyond 2^53
        Cell::Integer(i) => normalize(&Cell::Number(*i as f64)),
        Cell::Number(n) => match integer_digits(*n) {
            Some(digits) => TicketKey(digits),
            None => TicketKey(raw.to_string().trim().to_string()),
        },
        Cell::Text(s) => normalize_str(s),
    }
}

/// Text entry point of [`normalize`].
pub fn normalize_str(raw: &str) -> TicketKey {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return TicketKey::none();
    }

    let digits = trimmed
        .parse::<f64>()
        .ok()
        .and_then(integer_digits);

    TicketKey(digits.unwrap_or_else(|| trimmed.to_string()))
}

/// Truncate toward zero and render the integer's decimal digits.
fn integer_digits(value: f64) -> Option<String> {
    if !value.is_finite() {
        return None;
    }

    let truncated = value.trunc();
    // -0.0 would otherwise render as "-0"
    if truncated == 0.0 {
        return Some("0".to_string());
    }
    Some(format!("{truncated:.0}"))
}
