pub mod error;
pub mod mongo_client;

use async_trait::async_trait;
pub use error::DatabaseError;

use crate::types::index::{CanonicalIndex, ObservedIndex};

/// Index operations mondex needs from a database.
///
/// Every call is independent: a failed create or drop leaves the store usable for the next one.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// list_collections - Names of the user collections, `system.*` excluded
    async fn list_collections(&self) -> Result<Vec<String>, DatabaseError>;

    /// list_indexes - Every index defined on `collection`, including `_id_`
    async fn list_indexes(&self, collection: &str) -> Result<Vec<ObservedIndex>, DatabaseError>;

    /// create_index - Create `index` on `collection` under `index.name`
    async fn create_index(&self, collection: &str, index: &CanonicalIndex) -> Result<(), DatabaseError>;

    /// drop_index - Drop the index called `name` from `collection`
    async fn drop_index(&self, collection: &str, name: &str) -> Result<(), DatabaseError>;
}
