//! Reconciliation engine.
//!
//! [`compute_plan`] is a pure function from (observed, desired) to the minimal set of
//! creates and drops. It performs no I/O and cannot fail.

use crate::types::index::{CanonicalIndex, CollectionIndexSet};
use crate::types::plan::{CollectionDiff, ReconciliationPlan};

/// Decides which differences between two same-named indexes require a rebuild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ComparePolicy {
    /// Only the key shape (fields, order, directions) is compared.
    #[default]
    KeysOnly,
    /// Uniqueness and TTL are compared as well.
    KeysAndOptions,
}

impl ComparePolicy {
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            Self::KeysAndOptions
        } else {
            Self::KeysOnly
        }
    }

    fn requires_rebuild(self, observed: &CanonicalIndex, desired: &CanonicalIndex) -> bool {
        match self {
            Self::KeysOnly => !observed.same_keys(desired),
            Self::KeysAndOptions => !observed.same_keys(desired) || !observed.same_options(desired),
        }
    }
}

/// Computes the plan turning `observed` into `desired`.
///
/// Only collections named in `desired` are considered: a collection that exists in
/// the database but not in the configuration is never touched. Entries follow the
/// declaration order of `desired`.
pub fn compute_plan(
    observed: &CollectionIndexSet,
    desired: &CollectionIndexSet,
    policy: ComparePolicy,
) -> ReconciliationPlan {
    let mut plan = ReconciliationPlan::new();

    for (collection, desired_indexes) in desired {
        let observed_indexes = observed.get(collection).map(Vec::as_slice).unwrap_or_default();
        plan.push(diff_collection(collection, observed_indexes, desired_indexes, policy));
    }

    plan
}

/// Diff of a single collection.
///
/// Drops are listed in discovery order (indexes whose shape changed, in desired order,
/// then stale indexes in observed order); creates follow the desired order. The system
/// index is never a candidate for either list.
pub fn diff_collection(
    collection: &str,
    observed: &[CanonicalIndex],
    desired: &[CanonicalIndex],
    policy: ComparePolicy,
) -> CollectionDiff {
    let mut diff = CollectionDiff::new(collection);

    for wanted in desired.iter().filter(|index| !index.is_system_index()) {
        match observed.iter().find(|existing| existing.name == wanted.name) {
            None => diff.to_create.push(wanted.clone()),
            Some(existing) if policy.requires_rebuild(existing, wanted) => {
                // No alter-index on the server: a changed index is dropped and created again.
                diff.to_drop.push(existing.clone());
                diff.to_create.push(wanted.clone());
            }
            Some(_) => {}
        }
    }

    for existing in observed.iter().filter(|index| !index.is_system_index()) {
        if !desired.iter().any(|wanted| wanted.name == existing.name) {
            diff.to_drop.push(existing.clone());
        }
    }

    diff
}
