use crate::types::index::CanonicalIndex;

/// Index changes required on a single collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionDiff {
    pub collection: String,
    pub to_create: Vec<CanonicalIndex>,
    pub to_drop: Vec<CanonicalIndex>,
}

impl CollectionDiff {
    pub fn new(collection: impl Into<String>) -> Self {
        Self { collection: collection.into(), to_create: Vec::new(), to_drop: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_drop.is_empty()
    }

    pub fn operation_count(&self) -> usize {
        self.to_create.len() + self.to_drop.len()
    }

    /// Operations in the order they must be executed: every drop before any create,
    /// so that an index recreated under the same name never collides with its old self.
    pub fn operations(&self) -> impl Iterator<Item = IndexOperation> + '_ {
        self.to_drop
            .iter()
            .cloned()
            .map(IndexOperation::Drop)
            .chain(self.to_create.iter().cloned().map(IndexOperation::Create))
    }
}

/// A single create or drop issued against the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexOperation {
    Drop(CanonicalIndex),
    Create(CanonicalIndex),
}

impl IndexOperation {
    pub fn index(&self) -> &CanonicalIndex {
        match self {
            Self::Drop(index) | Self::Create(index) => index,
        }
    }

    pub fn is_drop(&self) -> bool {
        matches!(self, Self::Drop(_))
    }
}

/// The output of reconciliation: one entry per collection that needs at least one change,
/// in the order the collections were declared in the configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationPlan {
    entries: Vec<CollectionDiff>,
}

impl ReconciliationPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a collection diff. Diffs without any operation are discarded.
    pub fn push(&mut self, diff: CollectionDiff) {
        if !diff.is_empty() {
            self.entries.push(diff);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CollectionDiff> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[CollectionDiff] {
        &self.entries
    }

    pub fn get(&self, collection: &str) -> Option<&CollectionDiff> {
        self.entries.iter().find(|diff| diff.collection == collection)
    }

    pub fn operation_count(&self) -> usize {
        self.entries.iter().map(CollectionDiff::operation_count).sum()
    }
}

impl<'a> IntoIterator for &'a ReconciliationPlan {
    type Item = &'a CollectionDiff;
    type IntoIter = std::slice::Iter<'a, CollectionDiff>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
