//! Source operations
//!
//! Ties the store, discovery, cursor, and reader layers together into the
//! three operations a sync runs: check connectivity, discover the catalog,
//! and read a stream in full-refresh or incremental mode.

use crate::cursor::{build_filter, CursorState};
use crate::error::{Error, Result};
use crate::reader::{projection_for, RecordStream};
use crate::schema::{Catalog, SchemaDiscoverer, TableInfo};
use crate::store::DocumentStore;
use crate::types::ID_FIELD;
use bson::spec::ElementType;
use bson::Document;
use serde::{Deserialize, Serialize};
use tracing::info;

// ============================================================================
// Check Result
// ============================================================================

/// Result of a connection check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    /// Whether the check succeeded
    pub success: bool,

    /// What was verified, or what failed
    pub message: Option<String>,
}

impl CheckResult {
    /// Create a successful check result
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }

    /// Create a failed check result
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

// ============================================================================
// Document Source
// ============================================================================

/// A source over one document database.
///
/// Works against any [`DocumentStore`], so the same operations run over
/// MongoDB in production and the in-memory store in tests.
pub struct DocumentSource {
    store: Box<dyn DocumentStore>,
    discoverer: SchemaDiscoverer,
}

impl DocumentSource {
    /// Create a source with the default discovery sample bound
    pub fn new(store: Box<dyn DocumentStore>) -> Self {
        Self {
            store,
            discoverer: SchemaDiscoverer::new(),
        }
    }

    /// Create a source with an explicit discovery sample bound
    pub fn with_sample_size(store: Box<dyn DocumentStore>, sample_size: u32) -> Self {
        Self {
            store,
            discoverer: SchemaDiscoverer::with_sample_size(sample_size),
        }
    }

    /// Database this source reads from
    pub fn namespace(&self) -> &str {
        self.store.namespace()
    }

    /// Verify the source is usable: the database must be reachable and must
    /// contain at least one collection.
    ///
    /// Only collection names are listed; no collection body is touched.
    pub async fn check(&self) -> CheckResult {
        let database = self.store.namespace();
        match self.store.list_collection_names().await {
            Ok(names) if names.is_empty() => CheckResult::failure(format!(
                "Database '{database}' has no collections to operate on"
            )),
            Ok(names) => {
                info!(
                    database = %database,
                    collections = names.len(),
                    "source passed the basic operation test"
                );
                CheckResult::success(format!(
                    "{} collections visible in database '{database}'",
                    names.len()
                ))
            }
            Err(e) => CheckResult::failure(format!(
                "Unable to list collections in database '{database}': {e}"
            )),
        }
    }

    /// Discover the catalog by sampling every listed collection
    pub async fn discover(&self) -> Result<Catalog> {
        self.discoverer.discover(self.store.as_ref()).await
    }

    /// Read every document of a table, projected to its discovered fields
    pub async fn read_full_refresh(&self, table: &TableInfo) -> Result<RecordStream> {
        info!(collection = %table.name, mode = "full_refresh", "starting scan");
        self.open_scan(table, Document::new()).await
    }

    /// Read documents strictly past a checkpoint.
    ///
    /// The checkpoint string is decoded against the native type discovery
    /// observed for the cursor field; a checkpoint that does not decode is
    /// an error, never a silent full refresh.
    pub async fn read_incremental(
        &self,
        table: &TableInfo,
        cursor_field: &str,
        cursor_value: &str,
    ) -> Result<RecordStream> {
        let native_type = resolve_cursor_type(table, cursor_field)?;
        let state = CursorState::new(cursor_field, native_type, cursor_value);
        let filter = build_filter(&state, &table.name)?;
        info!(
            collection = %table.name,
            mode = "incremental",
            cursor_field = %cursor_field,
            "starting scan"
        );
        self.open_scan(table, filter).await
    }

    async fn open_scan(&self, table: &TableInfo, filter: Document) -> Result<RecordStream> {
        let collection = self.store.open_collection(&table.name).await?;
        let projection = projection_for(table);
        let inner = collection.scan(filter, Some(projection)).await?;
        Ok(RecordStream::new(&table.name, inner))
    }
}

/// The identity field orders by ObjectId even when discovery never sampled
/// it; any other unsampled cursor field is an error.
fn resolve_cursor_type(table: &TableInfo, cursor_field: &str) -> Result<ElementType> {
    match table.field(cursor_field) {
        Some(field) => Ok(field.native_type),
        None if cursor_field == ID_FIELD => Ok(ElementType::ObjectId),
        None => Err(Error::cursor_field_missing(
            table.name.as_str(),
            cursor_field,
        )),
    }
}
