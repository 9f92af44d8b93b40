//! In-memory store: useful for testing and dry runs.

use async_trait::async_trait;
use dbclaw_core::error::StoreError;
use dbclaw_core::store::DocumentStore;
use dbclaw_core::value::Document;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// A store that keeps every collection in a map.
/// Useful for testing and for `--dry-run` loads.
pub struct InMemoryStore {
    database: String,
    collections: Arc<RwLock<BTreeMap<String, Vec<Document>>>>,
    insert_calls: AtomicUsize,
    close_calls: AtomicUsize,
    closed: AtomicBool,
}

impl InMemoryStore {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collections: Arc::new(RwLock::new(BTreeMap::new())),
            insert_calls: AtomicUsize::new(0),
            close_calls: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Pre-populate a collection, bypassing the trait (test setup).
    pub async fn seed(&self, collection: &str, documents: Vec<Document>) {
        self.collections
            .write()
            .await
            .insert(collection.to_string(), documents);
    }

    /// A copy of a collection's documents, if it exists.
    pub async fn documents(&self, collection: &str) -> Option<Vec<Document>> {
        self.collections.read().await.get(collection).cloned()
    }

    /// How many `insert_many` calls reached this store.
    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    /// How many times `close` was called.
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    fn database(&self) -> &str {
        &self.database
    }

    async fn collection_names(&self) -> Result<Vec<String>, StoreError> {
        self.ensure_open()?;
        Ok(self.collections.read().await.keys().cloned().collect())
    }

    async fn drop_collection(&self, collection: &str) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.collections.write().await.remove(collection);
        Ok(())
    }

    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<usize, StoreError> {
        self.ensure_open()?;
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        let inserted = documents.len();
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .extend(documents);
        Ok(inserted)
    }

    async fn count(&self, collection: &str) -> Result<u64, StoreError> {
        self.ensure_open()?;
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .map_or(0, |docs| docs.len() as u64))
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
