//! MongoDB-backed document store
//!
//! Thin adapter from the store traits onto the official driver. Scans map
//! to `find` with a server-side filter and projection, so laziness and
//! cursor release come from the driver: batches are fetched as the stream
//! is polled and dropping the cursor kills it server-side.

use crate::config::SourceConfig;
use crate::error::{Error, Result};
use crate::store::{DocumentCollection, DocumentStore, DocumentStream};
use async_trait::async_trait;
use bson::Document;
use futures::TryStreamExt;
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection, Cursor, Database};
use std::time::Duration;
use tracing::debug;

/// Bound on connection establishment and server selection
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Store
// ============================================================================

/// [`DocumentStore`] over a single MongoDB database
pub struct MongoStore {
    database: Database,
    namespace: String,
}

impl MongoStore {
    /// Parse the connection string and open a client for the configured
    /// database. The returned store is lazy: no I/O happens until the first
    /// operation.
    pub async fn connect(config: &SourceConfig) -> Result<Self> {
        let mut options = ClientOptions::parse(&config.connection_string)
            .await
            .map_err(|e| Error::connectivity(config.database.as_str(), e.to_string()))?;
        options.connect_timeout = Some(CONNECT_TIMEOUT);
        options.server_selection_timeout = Some(CONNECT_TIMEOUT);

        let client = Client::with_options(options)
            .map_err(|e| Error::connectivity(config.database.as_str(), e.to_string()))?;
        let database = client.database(&config.database);
        debug!(
            database = %config.database,
            uri = %config.masked_connection_string(),
            "MongoDB client ready"
        );

        Ok(Self {
            database,
            namespace: config.database.clone(),
        })
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn list_collection_names(&self) -> Result<Vec<String>> {
        Ok(self.database.list_collection_names().await?)
    }

    async fn open_collection(&self, name: &str) -> Result<Box<dyn DocumentCollection>> {
        Ok(Box::new(MongoCollection {
            collection: self.database.collection::<Document>(name),
            name: name.to_string(),
        }))
    }
}

// ============================================================================
// Collection
// ============================================================================

struct MongoCollection {
    collection: Collection<Document>,
    name: String,
}

#[async_trait]
impl DocumentCollection for MongoCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn sample_documents(&self, limit: u32) -> Result<Vec<Document>> {
        let mut cursor = self
            .collection
            .find(Document::new())
            .limit(i64::from(limit))
            .await?;
        let mut documents = Vec::new();
        while let Some(document) = cursor.try_next().await? {
            documents.push(document);
        }
        Ok(documents)
    }

    async fn scan(
        &self,
        filter: Document,
        projection: Option<Document>,
    ) -> Result<Box<dyn DocumentStream>> {
        let find = self.collection.find(filter);
        let cursor = match projection {
            Some(projection) => find.projection(projection).await?,
            None => find.await?,
        };
        Ok(Box::new(MongoStream { cursor }))
    }
}

// ============================================================================
// Stream
// ============================================================================

struct MongoStream {
    cursor: Cursor<Document>,
}

#[async_trait]
impl DocumentStream for MongoStream {
    async fn try_next(&mut self) -> Result<Option<Document>> {
        Ok(self.cursor.try_next().await?)
    }
}
