//! MongoDB backend.
//!
//! One `Client` per run, shared by every collection operation. The
//! connection is verified with a `ping` against `admin` before `connect`
//! returns, so an unreachable server fails the run up front.

use async_trait::async_trait;
use dbclaw_config::DatabaseConfig;
use dbclaw_core::error::StoreError;
use dbclaw_core::store::DocumentStore;
use dbclaw_core::value::{Document, Value};
use mongodb::bson::{Bson, Document as BsonDocument, doc};
use mongodb::options::{ClientOptions, Tls, TlsOptions};
use mongodb::{Client, Database};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// A MongoDB database handle implementing `DocumentStore`.
pub struct MongoStore {
    client: Client,
    db: Database,
    closed: AtomicBool,
}

impl MongoStore {
    /// Connect and ping.
    ///
    /// `tls_allow_invalid_certificates` is honoured as configured; it exists
    /// for local development against self-signed clusters and must stay off
    /// in production.
    pub async fn connect(uri: &str, config: &DatabaseConfig) -> Result<Self, StoreError> {
        let mut options = ClientOptions::parse(uri)
            .await
            .map_err(|e| StoreError::Connection(format!("Invalid connection string: {e}")))?;

        options.server_selection_timeout =
            Some(Duration::from_millis(config.server_selection_timeout_ms));
        options.app_name = Some("dbclaw".into());

        if config.tls {
            let mut tls = TlsOptions::default();
            if config.tls_allow_invalid_certificates {
                warn!("TLS certificate validation is disabled; do not use this in production");
                tls.allow_invalid_certificates = Some(true);
            }
            options.tls = Some(Tls::Enabled(tls));
        }

        let client = Client::with_options(options)
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let db = client.database(&config.name);
        info!(database = %config.name, "Connected to MongoDB");

        Ok(Self {
            client,
            db,
            closed: AtomicBool::new(false),
        })
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    fn op_error(collection: &str, e: mongodb::error::Error) -> StoreError {
        StoreError::Operation {
            collection: collection.to_string(),
            reason: e.to_string(),
        }
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    fn name(&self) -> &str {
        "mongodb"
    }

    fn database(&self) -> &str {
        self.db.name()
    }

    async fn collection_names(&self) -> Result<Vec<String>, StoreError> {
        self.ensure_open()?;
        self.db
            .list_collection_names()
            .await
            .map_err(|e| Self::op_error("*", e))
    }

    async fn drop_collection(&self, collection: &str) -> Result<(), StoreError> {
        self.ensure_open()?;
        debug!(collection, "Dropping collection");
        self.db
            .collection::<BsonDocument>(collection)
            .drop()
            .await
            .map_err(|e| Self::op_error(collection, e))
    }

    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<usize, StoreError> {
        self.ensure_open()?;
        let batch: Vec<BsonDocument> = documents.into_iter().map(to_bson_document).collect();
        let result = self
            .db
            .collection::<BsonDocument>(collection)
            .insert_many(batch)
            .await
            .map_err(|e| Self::op_error(collection, e))?;
        Ok(result.inserted_ids.len())
    }

    async fn count(&self, collection: &str) -> Result<u64, StoreError> {
        self.ensure_open()?;
        self.db
            .collection::<BsonDocument>(collection)
            .count_documents(doc! {})
            .await
            .map_err(|e| Self::op_error(collection, e))
    }

    async fn close(&self) -> Result<(), StoreError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.client.clone().shutdown().await;
        debug!("MongoDB client shut down");
        Ok(())
    }
}

/// Map a cell value onto BSON.
///
/// Integers that fit in 32 bits are stored as `Int32`, larger ones as `Int64`.
fn to_bson(value: Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(b),
        Value::Int(i) => match i32::try_from(i) {
            Ok(small) => Bson::Int32(small),
            Err(_) => Bson::Int64(i),
        },
        Value::Float(f) => Bson::Double(f),
        Value::String(s) => Bson::String(s),
        Value::List(items) => Bson::Array(items.into_iter().map(to_bson).collect()),
        Value::Map(map) => Bson::Document(map.into_iter().map(|(k, v)| (k, to_bson(v))).collect()),
    }
}

fn to_bson_document(document: Document) -> BsonDocument {
    document
        .into_fields()
        .into_iter()
        .map(|(k, v)| (k, to_bson(v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn integers_pick_the_narrowest_type() {
        assert_eq!(to_bson(Value::Int(42)), Bson::Int32(42));
        assert_eq!(
            to_bson(Value::Int(i64::from(i32::MAX) + 1)),
            Bson::Int64(i64::from(i32::MAX) + 1)
        );
    }

    #[test]
    fn flat_maps_become_embedded_documents() {
        let mut map = BTreeMap::new();
        map.insert("lang".to_string(), Value::from("en"));
        let Bson::Document(inner) = to_bson(Value::Map(map)) else {
            panic!("expected embedded document");
        };
        assert_eq!(inner.get_str("lang").unwrap(), "en");
    }

    #[test]
    fn document_field_order_is_preserved() {
        let doc: Document = vec![
            ("z".to_string(), Value::Int(1)),
            ("a".to_string(), Value::Null),
            ("m".to_string(), Value::Float(1.5)),
        ]
        .into_iter()
        .collect();
        let bson = to_bson_document(doc);
        let keys: Vec<&String> = bson.keys().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
        assert_eq!(bson.get("a"), Some(&Bson::Null));
    }
}
