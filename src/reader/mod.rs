//! Record reading
//!
//! Wraps raw scans into records and a closable stream. Projections pin the
//! identity field first so every record carries it no matter what discovery
//! sampled. A failure mid-stream is terminal: the error surfaces once, the
//! underlying scan is released, and the stream then reads as exhausted.

use crate::error::{Error, Result};
use crate::schema::TableInfo;
use crate::store::DocumentStream;
use crate::types::ID_FIELD;
use bson::{Bson, Document};
use tracing::debug;

// ============================================================================
// Record
// ============================================================================

/// One document read from a collection, in stored field order
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    document: Document,
}

impl Record {
    /// Wrap a raw document
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    /// Field value by name
    pub fn get(&self, field: &str) -> Option<&Bson> {
        self.document.get(field)
    }

    /// Whether the record carries a field
    pub fn contains_field(&self, field: &str) -> bool {
        self.document.contains_key(field)
    }

    /// Field names in stored order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.document.keys().map(String::as_str)
    }

    /// The raw document
    pub fn into_inner(self) -> Document {
        self.document
    }

    /// Project into relaxed Extended JSON
    pub fn into_json(self) -> serde_json::Value {
        Bson::Document(self.document).into_relaxed_extjson()
    }

    /// Project into relaxed Extended JSON without consuming the record
    pub fn to_json(&self) -> serde_json::Value {
        Bson::Document(self.document.clone()).into_relaxed_extjson()
    }
}

/// Build the projection for a table: the identity field pinned first, then
/// every discovered field once.
pub fn projection_for(table: &TableInfo) -> Document {
    let mut projection = Document::new();
    projection.insert(ID_FIELD, 1);
    for field in table.field_names() {
        if field != ID_FIELD {
            projection.insert(field, 1);
        }
    }
    projection
}

// ============================================================================
// Record Stream
// ============================================================================

/// A forward-only, closable stream of records from one scan.
///
/// Close at any point to release the underlying scan without draining it;
/// exhaustion and errors release it automatically.
pub struct RecordStream {
    collection: String,
    inner: Option<Box<dyn DocumentStream>>,
}

impl std::fmt::Debug for RecordStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStream")
            .field("collection", &self.collection)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl RecordStream {
    /// Wrap a raw document stream
    pub fn new(collection: &str, inner: Box<dyn DocumentStream>) -> Self {
        Self {
            collection: collection.to_string(),
            inner: Some(inner),
        }
    }

    /// Collection this stream reads from
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Next record, or `None` once the stream is exhausted or closed.
    ///
    /// An underlying failure is surfaced exactly once; every call after it
    /// returns `Ok(None)`.
    pub async fn next(&mut self) -> Result<Option<Record>> {
        let Some(inner) = self.inner.as_mut() else {
            return Ok(None);
        };
        match inner.try_next().await {
            Ok(Some(document)) => Ok(Some(Record::new(document))),
            Ok(None) => {
                self.release();
                Ok(None)
            }
            Err(e) => {
                self.release();
                Err(Error::stream_decode(
                    self.collection.as_str(),
                    e.to_string(),
                ))
            }
        }
    }

    /// Release the underlying scan without draining it.
    ///
    /// Safe to call more than once.
    pub fn close(&mut self) {
        self.release();
    }

    /// Whether the underlying scan has been released
    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    fn release(&mut self) {
        if self.inner.take().is_some() {
            debug!(collection = %self.collection, "record stream released");
        }
    }
}
