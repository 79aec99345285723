pub mod index;
pub mod params;
pub mod plan;

pub use index::{CanonicalIndex, CollectionIndexSet, IndexDirection, IndexKeySpec, ObservedIndex, SYSTEM_INDEX_NAME};
pub use plan::{CollectionDiff, IndexOperation, ReconciliationPlan};
