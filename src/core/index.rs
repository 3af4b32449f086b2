//! Reference index: normalized ticket key -> reference weight.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::core::error::{PreconditionError, TableRole};
use crate::core::normalize::{TicketKey, normalize};
use crate::core::tolerance::weight_of;
use crate::infra::table::{Cell, Table};

/// What to do when two reference rows normalize to the same key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// The later row's weight replaces the earlier one
    #[default]
    LastWins,
    /// Refuse to build the index
    Reject,
}

#[derive(Debug, Clone, Copy)]
struct IndexedWeight {
    weight: Option<f64>,
    row: usize,
}

/// Lookup structure over the reference ledger.
///
/// Rows with an empty key are never indexed. Weights are `None` when the
/// reference cell is absent or non-numeric.
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    entries: HashMap<TicketKey, IndexedWeight>,
    overwritten: usize,
    unkeyed: usize,
}

impl ReferenceIndex {
    /// Index a reference table by `key_field`, storing `weight_field`.
    #[instrument(skip(table), fields(rows = table.len()))]
    pub fn build(
        table: &Table,
        key_field: &str,
        weight_field: &str,
        policy: DuplicatePolicy,
    ) -> Result<Self, PreconditionError> {
        // A ledger without rows has nothing to index, whatever its columns
        if table.is_empty() {
            return Ok(Self::default());
        }

        let (key_idx, weight_idx) = match (table.column_index(key_field), table.column_index(weight_field)) {
            (Some(k), Some(w)) => (k, w),
            (k, w) => {
                let missing = [(key_field, k), (weight_field, w)]
                    .into_iter()
                    .filter(|(_, idx)| idx.is_none())
                    .map(|(name, _)| name.to_string())
                    .collect();
                return Err(PreconditionError::missing_columns(
                    TableRole::Reference,
                    missing,
                    table.columns().to_vec(),
                ));
            }
        };

        let pairs = table
            .rows()
            .iter()
            .map(|row| (&row[key_idx], &row[weight_idx]));
        Self::from_pairs(pairs, policy)
    }

    /// Index raw `(ticket, weight)` cell pairs in input order.
    pub fn from_pairs<'a, I>(pairs: I, policy: DuplicatePolicy) -> Result<Self, PreconditionError>
    where
        I: IntoIterator<Item = (&'a Cell, &'a Cell)>,
    {
        let mut index = Self::default();

        for (i, (ticket, weight)) in pairs.into_iter().enumerate() {
            let row = i + 1;
            let key = normalize(ticket);
            if key.is_empty() {
                index.unkeyed += 1;
                continue;
            }

            let entry = IndexedWeight { weight: weight_of(weight), row };
            match index.entries.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert(entry);
                }
                Entry::Occupied(mut slot) => {
                    if policy == DuplicatePolicy::Reject {
                        return Err(PreconditionError::DuplicateReferenceKey {
                            key: slot.key().to_string(),
                            first_row: slot.get().row,
                            second_row: row,
                        });
                    }
                    debug!(key = %slot.key(), row, previous_row = slot.get().row, "duplicate reference key overwritten");
                    slot.insert(entry);
                    index.overwritten += 1;
                }
            }
        }

        if index.overwritten > 0 {
            warn!(
                overwritten = index.overwritten,
                "reference ledger has duplicate ticket numbers; later rows win"
            );
        }
        debug!(entries = index.len(), unkeyed = index.unkeyed, "reference index built");

        Ok(index)
    }

    /// Reference weight for `key`.
    ///
    /// The outer `Option` is the lookup; the inner one is `None` when the
    /// reference weight itself is absent or non-numeric.
    pub fn get(&self, key: &str) -> Option<Option<f64>> {
        self.entries.get(key).map(|e| e.weight)
    }

    pub fn contains(&self, key: &str) -> bool {
        !key.is_empty() && self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rows whose weight was replaced by a later duplicate.
    pub fn overwritten(&self) -> usize {
        self.overwritten
    }

    /// Rows skipped because their ticket number was blank.
    pub fn unkeyed(&self) -> usize {
        self.unkeyed
    }
}
