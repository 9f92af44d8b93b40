//! Collection loader: makes a collection hold exactly one batch of documents.
//!
//! The only write operation is `replace`: drop whatever is there, then bulk
//! insert. It never merges or upserts.

use dbclaw_core::error::StoreError;
use dbclaw_core::store::DocumentStore;
use dbclaw_core::value::Document;
use tracing::{debug, info};

/// What `replace` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The batch was empty; the collection is now absent.
    Empty,
    /// This many documents were inserted in one bulk call.
    Inserted(usize),
}

impl LoadOutcome {
    pub fn inserted(self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Inserted(n) => n,
        }
    }
}

pub struct CollectionLoader<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> CollectionLoader<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Replace the collection's contents with `documents`.
    ///
    /// Destructive: any existing collection of that name is dropped first,
    /// even when `documents` is empty.
    pub async fn replace(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<LoadOutcome, StoreError> {
        if self.store.has_collection(collection).await? {
            debug!(collection, "Dropping existing collection before reload");
            self.store.drop_collection(collection).await?;
        }

        if documents.is_empty() {
            debug!(collection, "No documents to insert");
            return Ok(LoadOutcome::Empty);
        }

        let inserted = self.store.insert_many(collection, documents).await?;
        info!(
            database = self.store.database(),
            collection,
            inserted,
            "Inserted documents"
        );
        Ok(LoadOutcome::Inserted(inserted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbclaw_core::value::Value;
    use dbclaw_store::InMemoryStore;

    fn doc(id: i64) -> Document {
        vec![("id".to_string(), Value::Int(id))].into_iter().collect()
    }

    #[tokio::test]
    async fn empty_batch_leaves_no_collection() {
        let store = InMemoryStore::new("db");
        store.seed("c", vec![doc(1)]).await;

        let outcome = CollectionLoader::new(&store).replace("c", vec![]).await.unwrap();

        assert_eq!(outcome, LoadOutcome::Empty);
        assert!(!store.has_collection("c").await.unwrap());
        assert_eq!(store.insert_calls(), 0);
    }

    #[tokio::test]
    async fn replace_discards_old_contents() {
        let store = InMemoryStore::new("db");
        store.seed("c", vec![doc(1), doc(2), doc(3)]).await;

        let outcome = CollectionLoader::new(&store)
            .replace("c", vec![doc(10), doc(11)])
            .await
            .unwrap();

        assert_eq!(outcome, LoadOutcome::Inserted(2));
        assert_eq!(store.documents("c").await.unwrap(), vec![doc(10), doc(11)]);
    }

    #[tokio::test]
    async fn batch_goes_in_one_bulk_call() {
        let store = InMemoryStore::new("db");
        let docs: Vec<Document> = (0..250).map(doc).collect();

        let outcome = CollectionLoader::new(&store).replace("c", docs).await.unwrap();

        assert_eq!(outcome.inserted(), 250);
        assert_eq!(store.insert_calls(), 1);
    }

    #[tokio::test]
    async fn closed_store_surfaces_error() {
        let store = InMemoryStore::new("db");
        store.close().await.unwrap();
        let result = CollectionLoader::new(&store).replace("c", vec![doc(1)]).await;
        assert!(matches!(result, Err(StoreError::Closed)));
    }
}
