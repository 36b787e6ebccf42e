//! Sampled schema discovery
//!
//! Reads a bounded sample of documents per collection and unifies the
//! observed field types into a [`TableInfo`]. Sampling keeps discovery cheap
//! on large collections; the resulting table is advisory metadata, not a
//! validation contract.

use crate::config::DEFAULT_SAMPLE_SIZE;
use crate::error::{Error, Result};
use crate::schema::types::{element_type_name, portable_type, CommonField, PortableType, TableInfo};
use crate::store::{DocumentCollection, DocumentStore};
use crate::types::ID_FIELD;
use tracing::{debug, warn};

// ============================================================================
// Catalog
// ============================================================================

/// Result of discovering a whole store: the tables that discovered cleanly
/// plus the per-collection failures that were collected along the way.
#[derive(Debug, Default)]
pub struct Catalog {
    /// Successfully discovered tables
    pub tables: Vec<TableInfo>,

    /// Collections that could not be discovered
    pub failures: Vec<DiscoveryFailure>,
}

impl Catalog {
    /// Look up a discovered table by collection name
    pub fn table(&self, name: &str) -> Option<&TableInfo> {
        self.tables.iter().find(|t| t.name == name)
    }
}

/// A single collection whose discovery failed
#[derive(Debug)]
pub struct DiscoveryFailure {
    /// Collection that failed
    pub collection: String,

    /// What went wrong
    pub error: Error,
}

// ============================================================================
// Schema Discoverer
// ============================================================================

/// Discovers field→type tables by sampling documents.
///
/// Type conflicts across the sample are resolved deterministically: the
/// first observation of a field pins its native type; a later observation
/// mapping to a different portable primitive widens the portable type to
/// [`PortableType::Any`]. Widening is sticky and a field is never dropped.
#[derive(Debug, Clone)]
pub struct SchemaDiscoverer {
    sample_size: u32,
}

impl SchemaDiscoverer {
    /// Create a discoverer with the default sample bound
    pub fn new() -> Self {
        Self {
            sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }

    /// Create a discoverer with an explicit sample bound
    pub fn with_sample_size(sample_size: u32) -> Self {
        Self { sample_size }
    }

    /// The sample bound in effect
    pub fn sample_size(&self) -> u32 {
        self.sample_size
    }

    /// Discover every collection the store lists.
    ///
    /// Collections are discovered independently: a failure is recorded in
    /// the catalog and never aborts discovery of sibling collections. Only
    /// the initial collection listing is fatal.
    pub async fn discover(&self, store: &dyn DocumentStore) -> Result<Catalog> {
        let collection_names = store.list_collection_names().await?;
        debug!(
            database = store.namespace(),
            collections = collection_names.len(),
            "starting discovery"
        );

        let mut catalog = Catalog::default();
        for collection_name in collection_names {
            match self.discover_one(store, &collection_name).await {
                Ok(table) => catalog.tables.push(table),
                Err(error) => {
                    warn!(
                        collection = %collection_name,
                        error = %error,
                        "skipping collection after discovery failure"
                    );
                    catalog.failures.push(DiscoveryFailure {
                        collection: collection_name,
                        error,
                    });
                }
            }
        }
        Ok(catalog)
    }

    async fn discover_one(&self, store: &dyn DocumentStore, name: &str) -> Result<TableInfo> {
        let collection = store
            .open_collection(name)
            .await
            .map_err(|e| wrap_discovery(name, e))?;
        self.discover_collection(store.namespace(), collection.as_ref())
            .await
    }

    /// Discover a single collection into a [`TableInfo`].
    ///
    /// The reserved identity field is always reported as the primary key,
    /// whether or not the sample observed it.
    pub async fn discover_collection(
        &self,
        namespace: &str,
        collection: &dyn DocumentCollection,
    ) -> Result<TableInfo> {
        let documents = collection
            .sample_documents(self.sample_size)
            .await
            .map_err(|e| wrap_discovery(collection.name(), e))?;

        // Sample order is store iteration order, so reruns against an
        // unchanged collection see the same observations in the same order.
        let mut fields: Vec<CommonField> = Vec::new();
        for document in &documents {
            for (field_name, value) in document {
                let observed = value.element_type();
                match fields.iter_mut().find(|f| f.name == *field_name) {
                    None => fields.push(CommonField::new(field_name, observed)),
                    Some(field) => {
                        if portable_type(observed) != field.portable_type {
                            debug!(
                                collection = collection.name(),
                                field = %field_name,
                                first_seen = field.native_type_name(),
                                observed = element_type_name(observed),
                                "conflicting type observations, widening to generic"
                            );
                            field.portable_type = PortableType::Any;
                        }
                    }
                }
            }
        }

        debug!(
            collection = collection.name(),
            sampled = documents.len(),
            fields = fields.len(),
            "collection discovered"
        );

        Ok(TableInfo {
            namespace: namespace.to_string(),
            name: collection.name().to_string(),
            fields,
            primary_keys: vec![ID_FIELD.to_string()],
        })
    }
}

impl Default for SchemaDiscoverer {
    fn default() -> Self {
        Self::new()
    }
}

fn wrap_discovery(collection: &str, error: Error) -> Error {
    match error {
        already @ Error::Discovery { .. } => already,
        other => Error::discovery(collection, other.to_string()),
    }
}
