//! Diff and classification of listing snapshots.
//!
//! A current record that equals (field for field) any record of the
//! previous snapshot is dropped. Every surviving record is correlated with
//! its previous counterpart through the identity key and labeled by the
//! first matching rule:
//!
//! 1. no counterpart: `New Item` / `New Item - Out of Stock`
//! 2. out of stock -> in stock: `Restocked`
//! 3. in stock -> out of stock: `Out of Stock`
//! 4. price text differs: `Price Change - Previously <old>`
//! 5. store differs: `Store Change`
//! 6. link differs: `URL Change` (reachable only when keyed by name)
//! 7. otherwise: `Unknown Change`

use std::collections::{HashMap, HashSet};

use crate::models::{ClassifiedChange, IdentityKey, ListingRecord, UpdateType};

fn key_of(key: IdentityKey, record: &ListingRecord) -> &str {
    match key {
        IdentityKey::Link => &record.link,
        IdentityKey::Name => &record.name,
    }
}

/// Classified changes between two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffResult {
    /// Changes in the order their records appear in the current listing
    pub changes: Vec<ClassifiedChange>,
}

impl DiffResult {
    /// Check if there are any changes.
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Get the total number of changes.
    pub fn change_count(&self) -> usize {
        self.changes.len()
    }

    /// Changes that belong in the emailed digest.
    ///
    /// With `include_out_of_stock` unset, `Out of Stock` transitions are
    /// left out. The diff itself is not altered.
    pub fn notifiable(&self, include_out_of_stock: bool) -> Vec<ClassifiedChange> {
        self.changes
            .iter()
            .filter(|c| include_out_of_stock || c.update_type != UpdateType::OutOfStock)
            .cloned()
            .collect()
    }
}

/// Calculator for computing diffs between snapshots.
#[derive(Debug, Clone, Default)]
pub struct DiffCalculator {
    key: IdentityKey,
}

impl DiffCalculator {
    /// Create a link-keyed diff calculator.
    pub fn new() -> Self {
        Self::keyed_by(IdentityKey::Link)
    }

    /// Create a diff calculator correlating records by the given key.
    pub fn keyed_by(key: IdentityKey) -> Self {
        Self { key }
    }

    /// Calculate the classified changes from `previous` to `current`.
    pub fn calculate(&self, previous: &[ListingRecord], current: &[ListingRecord]) -> DiffResult {
        let seen: HashSet<&ListingRecord> = previous.iter().collect();

        // Later duplicates of a key overwrite earlier ones.
        let prev_by_key: HashMap<&str, &ListingRecord> =
            previous.iter().map(|r| (key_of(self.key, r), r)).collect();

        let mut emitted: HashSet<&ListingRecord> = HashSet::new();
        let mut changes = Vec::new();

        for record in current {
            if seen.contains(record) || !emitted.insert(record) {
                continue;
            }
            let counterpart = prev_by_key.get(key_of(self.key, record)).copied();
            let update_type = classify(counterpart, record);
            log::debug!("{} -> {}", record.link, update_type);
            changes.push(ClassifiedChange::new(record.clone(), update_type));
        }

        DiffResult { changes }
    }
}

/// Label a record that differs from everything previously seen.
pub fn classify(previous: Option<&ListingRecord>, current: &ListingRecord) -> UpdateType {
    let Some(previous) = previous else {
        return if current.is_available() {
            UpdateType::NewItem
        } else {
            UpdateType::NewItemOutOfStock
        };
    };

    match (previous.in_stock, current.in_stock) {
        (Some(false), Some(true)) => return UpdateType::Restocked,
        (Some(true), Some(false)) => return UpdateType::OutOfStock,
        _ => {}
    }

    if previous.price != current.price {
        UpdateType::PriceChange {
            previous: previous.price.clone(),
        }
    } else if previous.store != current.store {
        UpdateType::StoreChange
    } else if previous.link != current.link {
        UpdateType::UrlChange
    } else {
        UpdateType::UnknownChange
    }
}

/// Convenience function to calculate a link-keyed diff.
pub fn calculate_diff(previous: &[ListingRecord], current: &[ListingRecord]) -> DiffResult {
    DiffCalculator::new().calculate(previous, current)
}
