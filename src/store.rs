//! # Customer store
//!
//! The document-store side of the tool: scanning for records without an
//! embedding, writing an embedding back by `_id`, and running the vector
//! search aggregation.
//!
//! [`CustomerStore`] is the seam the backfill and search flows depend on;
//! [`MongoStore`] implements it on top of the official `mongodb` driver.
//! The store is built once per command, passed in by reference and released
//! with [`MongoStore::shutdown`] when the command ends.

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt, stream::BoxStream};
use mongodb::{
    Client, Collection,
    bson::{Bson, Document, doc},
};
use tracing::{debug, info};

use crate::{
    config::SearchConfig,
    customer::{EMBEDDING_FIELD, render_bson},
    error::{SearchError, StoreError, WriteError},
    search::{SearchRow, VectorQuery},
};

/// Stream of raw customer records.
pub type RecordStream<'a> = BoxStream<'a, Result<Document, StoreError>>;

/// Selects records that do not carry an embedding yet.
pub fn missing_embedding_filter() -> Document {
    let mut filter = Document::new();
    filter.insert(EMBEDDING_FIELD, doc! { "$exists": false });
    filter
}

/// Operations the backfill and search flows need from the document store.
#[async_trait]
pub trait CustomerStore: Send + Sync {
    /// Records matching [`missing_embedding_filter`].
    ///
    /// # Errors
    ///
    /// Fails if the scan cannot be started; errors while iterating are
    /// yielded by the stream.
    async fn pending_records(&self) -> Result<RecordStream<'_>, StoreError>;

    /// Sets `embedding_vector` on the record with the given `_id`.
    async fn set_embedding(&self, id: &Bson, vector: &[f64]) -> Result<(), WriteError>;

    /// Runs the two-stage `$vectorSearch` aggregation.
    async fn vector_search(&self, query: &VectorQuery) -> Result<Vec<SearchRow>, SearchError>;
}

/// [`CustomerStore`] backed by a MongoDB Atlas collection.
pub struct MongoStore {
    client: Client,
    collection: Collection<Document>,
}

impl MongoStore {
    /// Connects to the cluster and checks it answers a `ping`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connect`] if the URI is invalid or the
    /// deployment is unreachable.
    pub async fn connect(config: &SearchConfig) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(&config.mongo_uri)
            .await
            .map_err(StoreError::Connect)?;
        let database = client.database(&config.db_name);
        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(StoreError::Connect)?;
        info!(
            "Connected to {}.{}",
            config.db_name, config.collection_name
        );

        let collection = database.collection::<Document>(&config.collection_name);
        Ok(Self { client, collection })
    }

    /// Closes the connection pool.
    pub async fn shutdown(self) {
        debug!("Shutting down MongoDB client");
        self.client.shutdown().await;
    }
}

#[async_trait]
impl CustomerStore for MongoStore {
    async fn pending_records(&self) -> Result<RecordStream<'_>, StoreError> {
        let cursor = self
            .collection
            .find(missing_embedding_filter())
            .await
            .map_err(|e| StoreError::Scan(e.to_string()))?;
        Ok(cursor.map_err(|e| StoreError::Scan(e.to_string())).boxed())
    }

    async fn set_embedding(&self, id: &Bson, vector: &[f64]) -> Result<(), WriteError> {
        let values: Vec<Bson> = vector.iter().copied().map(Bson::Double).collect();
        let mut set = Document::new();
        set.insert(EMBEDDING_FIELD, values);

        let result = self
            .collection
            .update_one(doc! { "_id": id.clone() }, doc! { "$set": set })
            .await?;

        if result.matched_count == 0 {
            return Err(WriteError::NotFound(render_bson(id)));
        }
        Ok(())
    }

    async fn vector_search(&self, query: &VectorQuery) -> Result<Vec<SearchRow>, SearchError> {
        let cursor = self.collection.aggregate(query.pipeline()).await?;
        let documents: Vec<Document> = cursor.try_collect().await?;
        documents.into_iter().map(SearchRow::from_document).collect()
    }
}
