//! In-memory document store
//!
//! A seedable [`DocumentStore`] used by the test suite and handy for local
//! experiments. Collections keep their seed order, scans evaluate the same
//! strictly-greater-than filters the server-backed store would, and a probe
//! counts released streams so tests can assert early termination.

use crate::cursor::bson_order;
use crate::error::{Error, Result};
use crate::store::{DocumentCollection, DocumentStore, DocumentStream};
use async_trait::async_trait;
use bson::{Bson, Document};
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering::Relaxed;
use std::sync::Arc;

// ============================================================================
// Store
// ============================================================================

#[derive(Debug, Clone, Default)]
struct CollectionSeed {
    name: String,
    documents: Vec<Document>,
    sample_error: Option<String>,
    fail_scan_after: Option<usize>,
}

/// Counts streams whose backing resources have been returned, whether by
/// close, drop, or draining to exhaustion.
#[derive(Debug, Clone, Default)]
pub struct StreamProbe {
    released: Arc<AtomicUsize>,
}

impl StreamProbe {
    /// Number of streams released so far
    pub fn released(&self) -> usize {
        self.released.load(Relaxed)
    }
}

/// Seedable in-memory implementation of [`DocumentStore`].
///
/// Seeding happens through `&mut` before the store is handed to a source;
/// afterwards it is read-only like any other backend.
#[derive(Debug)]
pub struct MemoryStore {
    namespace: String,
    collections: Vec<CollectionSeed>,
    listing_error: Option<String>,
    probe: StreamProbe,
}

impl MemoryStore {
    /// Create an empty store under the given namespace
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            collections: Vec::new(),
            listing_error: None,
            probe: StreamProbe::default(),
        }
    }

    /// Create an empty collection if it does not exist yet
    pub fn create_collection(&mut self, name: &str) {
        self.seed_mut(name);
    }

    /// Append a document to a collection, creating the collection on first use
    pub fn insert(&mut self, collection: &str, document: Document) {
        self.seed_mut(collection).documents.push(document);
    }

    /// Make `list_collection_names` fail with the given message
    pub fn fail_listing(&mut self, message: &str) {
        self.listing_error = Some(message.to_string());
    }

    /// Make sampling of one collection fail with the given message
    pub fn fail_sampling(&mut self, collection: &str, message: &str) {
        self.seed_mut(collection).sample_error = Some(message.to_string());
    }

    /// Make scans of one collection fail after yielding `documents` documents
    pub fn fail_scan_after(&mut self, collection: &str, documents: usize) {
        self.seed_mut(collection).fail_scan_after = Some(documents);
    }

    /// Handle for asserting stream release after the store has been moved
    pub fn probe(&self) -> StreamProbe {
        self.probe.clone()
    }

    fn seed_mut(&mut self, name: &str) -> &mut CollectionSeed {
        let position = match self.collections.iter().position(|c| c.name == name) {
            Some(position) => position,
            None => {
                self.collections.push(CollectionSeed {
                    name: name.to_string(),
                    ..CollectionSeed::default()
                });
                self.collections.len() - 1
            }
        };
        &mut self.collections[position]
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn list_collection_names(&self) -> Result<Vec<String>> {
        if let Some(message) = &self.listing_error {
            return Err(Error::connectivity(
                self.namespace.as_str(),
                message.as_str(),
            ));
        }
        Ok(self.collections.iter().map(|c| c.name.clone()).collect())
    }

    async fn open_collection(&self, name: &str) -> Result<Box<dyn DocumentCollection>> {
        let seed = self
            .collections
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| Error::StreamNotFound {
                stream: name.to_string(),
            })?;
        Ok(Box::new(MemoryCollection {
            seed: seed.clone(),
            probe: self.probe.clone(),
        }))
    }
}

// ============================================================================
// Collection
// ============================================================================

struct MemoryCollection {
    seed: CollectionSeed,
    probe: StreamProbe,
}

#[async_trait]
impl DocumentCollection for MemoryCollection {
    fn name(&self) -> &str {
        &self.seed.name
    }

    async fn sample_documents(&self, limit: u32) -> Result<Vec<Document>> {
        if let Some(message) = &self.seed.sample_error {
            return Err(Error::Other(message.clone()));
        }
        Ok(self
            .seed
            .documents
            .iter()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn scan(
        &self,
        filter: Document,
        projection: Option<Document>,
    ) -> Result<Box<dyn DocumentStream>> {
        let documents = self
            .seed
            .documents
            .iter()
            .filter(|document| matches_filter(document, &filter))
            .map(|document| match &projection {
                Some(projection) => project(document, projection),
                None => document.clone(),
            })
            .collect();
        Ok(Box::new(MemoryStream {
            documents,
            fail_after: self.seed.fail_scan_after,
            yielded: 0,
            failed: false,
            probe: self.probe.clone(),
        }))
    }
}

/// Evaluate the filters [`crate::cursor::build_filter`] produces: every entry
/// must match, an entry is either a `$gt` bound or an equality test, and a
/// missing field never matches.
fn matches_filter(document: &Document, filter: &Document) -> bool {
    filter.iter().all(|(field, condition)| {
        let Some(actual) = document.get(field) else {
            return false;
        };
        match condition {
            Bson::Document(operators) => match operators.get("$gt") {
                Some(bound) => bson_order(actual, bound) == Some(Ordering::Greater),
                None => false,
            },
            expected => actual == expected,
        }
    })
}

fn project(document: &Document, projection: &Document) -> Document {
    let mut projected = Document::new();
    for (field, value) in document {
        if is_included(projection, field) {
            projected.insert(field.clone(), value.clone());
        }
    }
    projected
}

fn is_included(projection: &Document, field: &str) -> bool {
    match projection.get(field) {
        Some(Bson::Int32(flag)) => *flag != 0,
        Some(Bson::Int64(flag)) => *flag != 0,
        Some(Bson::Boolean(flag)) => *flag,
        _ => false,
    }
}

// ============================================================================
// Stream
// ============================================================================

struct MemoryStream {
    documents: VecDeque<Document>,
    fail_after: Option<usize>,
    yielded: usize,
    failed: bool,
    probe: StreamProbe,
}

#[async_trait]
impl DocumentStream for MemoryStream {
    async fn try_next(&mut self) -> Result<Option<Document>> {
        if let Some(bound) = self.fail_after {
            if self.yielded >= bound && !self.failed {
                self.failed = true;
                return Err(Error::Other("scan interrupted".to_string()));
            }
        }
        match self.documents.pop_front() {
            Some(document) => {
                self.yielded += 1;
                Ok(Some(document))
            }
            None => Ok(None),
        }
    }
}

impl Drop for MemoryStream {
    fn drop(&mut self) {
        self.probe.released.fetch_add(1, Relaxed);
    }
}
