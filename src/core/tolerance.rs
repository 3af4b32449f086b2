//! Weight comparison at a fixed rounding precision.

use crate::infra::table::Cell;

/// Default number of decimal places weights are compared at.
pub const DEFAULT_ROUND_DIGITS: u32 = 1;

/// Decimal places at which every finite `f64` is already exact
const EXACT_DIGITS: u32 = 1074;

/// Equality of weights after rounding both sides to the same precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tolerance {
    digits: u32,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::new(DEFAULT_ROUND_DIGITS)
    }
}

impl Tolerance {
    pub fn new(digits: u32) -> Self {
        Self { digits }
    }

    pub fn digits(&self) -> u32 {
        self.digits
    }

    /// Round to `digits` decimal places.
    ///
    /// Rounding works on the exact binary value, so `1.05` (stored just
    /// above 1.05) becomes `1.1`. Exact ties go to even.
    pub fn round(&self, value: f64) -> f64 {
        if !value.is_finite() || self.digits >= EXACT_DIGITS {
            return value;
        }
        let precision = self.digits as usize;
        format!("{value:.precision$}").parse().unwrap_or(value)
    }

    /// Both weights present and equal after rounding.
    pub fn agrees(&self, candidate: Option<f64>, reference: Option<f64>) -> bool {
        match (candidate, reference) {
            (Some(c), Some(r)) => self.round(c) == self.round(r),
            _ => false,
        }
    }
}

/// Read a weight cell; absent and non-numeric values give `None`.
pub fn weight_of(cell: &Cell) -> Option<f64> {
    cell.as_number()
}
