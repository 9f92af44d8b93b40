//! DocumentStore trait: the abstraction over the target document database.
//!
//! The ingestion flow only ever needs a handful of collection-level
//! operations, so that is all this trait exposes. Implementations live in
//! `dbclaw-store` (MongoDB and an in-memory store for tests).

use crate::error::StoreError;
use crate::value::Document;
use async_trait::async_trait;

/// A handle to one named database inside a document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// The backend name (e.g., "mongodb", "in_memory").
    fn name(&self) -> &str;

    /// The database this handle points at.
    fn database(&self) -> &str;

    /// Names of the collections currently present in the database.
    async fn collection_names(&self) -> Result<Vec<String>, StoreError>;

    /// Drop a collection and everything in it.
    async fn drop_collection(&self, collection: &str) -> Result<(), StoreError>;

    /// Insert all documents in one bulk call. Returns the inserted count.
    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<usize, StoreError>;

    /// Number of documents in a collection (0 if it does not exist).
    async fn count(&self, collection: &str) -> Result<u64, StoreError>;

    /// Release the underlying connection. Further calls fail with `Closed`.
    async fn close(&self) -> Result<(), StoreError>;

    /// Whether a collection with this name exists.
    async fn has_collection(&self, collection: &str) -> Result<bool, StoreError> {
        Ok(self
            .collection_names()
            .await?
            .iter()
            .any(|name| name == collection))
    }
}
