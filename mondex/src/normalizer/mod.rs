//! Turns configuration entries and driver records into [`CanonicalIndex`] values.
//!
//! Nothing in here touches the filesystem or the database.

use tracing::warn;

use crate::config::{ConfigError, IndexConfigEntry, IndexSpec};
use crate::types::index::{
    CanonicalIndex, CollectionIndexSet, IndexDirection, IndexKeySpec, ObservedIndex, SYSTEM_INDEX_FIELD,
};

/// Derives the index name MongoDB would generate for `keys`: every field followed by
/// its direction, joined with underscores (`{a: 1, b: -1}` becomes `a_1_b_-1`).
pub fn generate_index_name(keys: &IndexKeySpec) -> String {
    keys.iter().map(|(field, direction)| format!("{}_{}", field, direction)).collect::<Vec<_>>().join("_")
}

/// Canonical form of a single configured index. The name is always derived from the keys.
pub fn normalize_index_spec(spec: &IndexSpec) -> CanonicalIndex {
    CanonicalIndex::new(generate_index_name(&spec.keys), spec.keys.clone())
        .unique(spec.is_unique)
        .expire_after(spec.expire_after_seconds)
}

/// Builds the desired index set from parsed configuration entries.
///
/// Rejects entries the reconciliation engine could not act on sensibly: an empty
/// collection name, a collection declared twice, an index without fields, two indexes
/// deriving the same name, or an attempt to manage the primary key index.
pub fn normalize_desired(entries: &[IndexConfigEntry]) -> Result<CollectionIndexSet, ConfigError> {
    let mut desired = CollectionIndexSet::with_capacity(entries.len());

    for entry in entries {
        let collection = entry.collection.trim();
        if collection.is_empty() {
            return Err(ConfigError::EmptyCollectionName);
        }
        if desired.contains_key(collection) {
            return Err(ConfigError::DuplicateCollection { collection: collection.to_string() });
        }

        let mut indexes: Vec<CanonicalIndex> = Vec::with_capacity(entry.indexes.len());
        for (position, spec) in entry.indexes.iter().enumerate() {
            if spec.keys.is_empty() {
                return Err(ConfigError::EmptyIndex { collection: collection.to_string(), position });
            }
            if is_primary_key(&spec.keys) {
                return Err(ConfigError::SystemIndex {
                    collection: collection.to_string(),
                    field: SYSTEM_INDEX_FIELD.to_string(),
                });
            }

            let index = normalize_index_spec(spec);
            if indexes.iter().any(|existing| existing.name == index.name) {
                return Err(ConfigError::DuplicateIndex { collection: collection.to_string(), name: index.name });
            }
            indexes.push(index);
        }

        desired.insert(collection.to_string(), indexes);
    }

    Ok(desired)
}

/// Maps an index reported by the database into canonical form, keeping its name.
pub fn normalize_observed(index: ObservedIndex) -> CanonicalIndex {
    CanonicalIndex::new(index.name, IndexKeySpec::from_document(&index.keys))
        .unique(index.unique.unwrap_or(false))
        .expire_after(index.expire_after_seconds)
}

/// Renders observed indexes back into configuration entries, the inverse of
/// [`normalize_desired`]. The system index is skipped and collections left with
/// no index are omitted.
///
/// Indexes that differ only in options this tool does not model (collation,
/// partial filters) can share a key spec. Only the first of them is written, so the
/// pulled file always loads again.
pub fn observed_to_config(observed: &CollectionIndexSet) -> Vec<IndexConfigEntry> {
    observed
        .iter()
        .map(|(collection, indexes)| IndexConfigEntry {
            collection: collection.clone(),
            indexes: pulled_indexes(collection, indexes),
        })
        .filter(|entry| !entry.indexes.is_empty())
        .collect()
}

fn pulled_indexes(collection: &str, indexes: &[CanonicalIndex]) -> Vec<IndexSpec> {
    let mut kept: Vec<&CanonicalIndex> = Vec::with_capacity(indexes.len());

    for index in indexes.iter().filter(|index| !index.is_system_index()) {
        if let Some(first) = kept.iter().find(|existing| existing.same_keys(index)) {
            warn!(
                collection,
                index = %index.name,
                kept = %first.name,
                keys = %index.keys,
                "Skipping index with the same keys as an index already pulled"
            );
            continue;
        }
        kept.push(index);
    }

    kept.into_iter()
        .map(|index| IndexSpec {
            keys: index.keys.clone(),
            is_unique: index.is_unique,
            expire_after_seconds: index.expire_after_seconds,
        })
        .collect()
}

fn is_primary_key(keys: &IndexKeySpec) -> bool {
    let mut fields = keys.iter();
    matches!((fields.next(), fields.next()), (Some((SYSTEM_INDEX_FIELD, IndexDirection::Ascending)), None))
}
