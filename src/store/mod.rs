//! Storage backends
//!
//! The source core is written against three narrow traits: a store that
//! lists collections, a collection that can be sampled or scanned, and a
//! forward-only document stream. The MongoDB backend implements them over
//! the driver; the in-memory backend implements them over seeded vectors
//! for tests and local development.

mod memory;
mod mongo;

pub use memory::{MemoryStore, StreamProbe};
pub use mongo::MongoStore;

use crate::error::Result;
use async_trait::async_trait;
use bson::Document;

// ============================================================================
// Store Traits
// ============================================================================

/// A database holding named collections of schemaless documents
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Namespace (database name) attached to every table discovered here
    fn namespace(&self) -> &str;

    /// List collection names without touching collection bodies
    async fn list_collection_names(&self) -> Result<Vec<String>>;

    /// Open a handle to one collection by name
    async fn open_collection(&self, name: &str) -> Result<Box<dyn DocumentCollection>>;
}

/// A single collection of documents
#[async_trait]
pub trait DocumentCollection: Send + Sync {
    /// Collection name
    fn name(&self) -> &str;

    /// Fetch up to `limit` documents for schema discovery
    async fn sample_documents(&self, limit: u32) -> Result<Vec<Document>>;

    /// Start a lazy scan, optionally narrowed by a projection and a filter.
    ///
    /// An empty filter matches every document. Documents arrive in batches
    /// as the returned stream is polled, never buffered whole.
    async fn scan(
        &self,
        filter: Document,
        projection: Option<Document>,
    ) -> Result<Box<dyn DocumentStream>>;
}

impl std::fmt::Debug for dyn DocumentCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentCollection")
            .field("name", &self.name())
            .finish()
    }
}

/// A forward-only stream of documents produced by one scan.
///
/// Dropping the stream releases whatever server-side or in-memory resources
/// back it, so callers can stop early without draining.
#[async_trait]
pub trait DocumentStream: Send {
    /// Next document, or `None` once the scan is exhausted
    async fn try_next(&mut self) -> Result<Option<Document>>;
}

#[cfg(test)]
mod tests;
