// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # MongoDB Source Connector
//!
//! A schemaless document-store source: samples collections to infer a typed
//! catalog, then streams records in full-refresh or incremental mode.
//!
//! ## Features
//!
//! - **Schema Discovery**: Sample a bounded number of documents per collection
//!   and map native BSON types to a portable type system
//! - **Incremental Sync**: Resume from a checkpoint; cursor values are decoded
//!   into the field's native type so comparisons happen server-side
//! - **Typed Catalogs**: JSON Schema per collection, `_id` always the primary key
//! - **Lazy Streaming**: Records arrive batch-wise and the server cursor is
//!   released as soon as the stream is closed or dropped
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mongodb_source::store::MongoStore;
//! use mongodb_source::{DocumentSource, Result, SourceConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = SourceConfig::from_file("config.json")?;
//!     let store = MongoStore::connect(&config).await?;
//!     let source = DocumentSource::with_sample_size(Box::new(store), config.sample_size);
//!
//!     // Check connection
//!     let status = source.check().await;
//!
//!     // Discover collections and their field types
//!     let catalog = source.discover().await?;
//!
//!     // Read data
//!     for table in &catalog.tables {
//!         let mut stream = source.read_full_refresh(table).await?;
//!         while let Some(record) = stream.next().await? {
//!             // Process records
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Source Interface                         │
//! │  check() → CheckResult      discover() → Catalog                │
//! │  read_full_refresh / read_incremental → RecordStream            │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌───────────────┬──────────────┴──────────┬───────────────────────┐
//! │    Store      │         Schema          │        Cursor         │
//! ├───────────────┼─────────────────────────┼───────────────────────┤
//! │ MongoDB       │ Bounded sampling        │ Checkpoint decoding   │
//! │ In-memory     │ Type widening           │ $gt filter building   │
//! │ Lazy streams  │ Primary key pinning     │ BSON ordering         │
//! └───────────────┴─────────────────────────┴───────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the connector
pub mod error;

/// Common types and constants
pub mod types;

/// Source configuration
pub mod config;

/// Cursor decoding, filter building and BSON ordering
pub mod cursor;

/// Schema discovery from sampled documents
pub mod schema;

/// Document store backends
pub mod store;

/// Record streaming
pub mod reader;

/// Source operations (check, discover, read)
pub mod source;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use config::SourceConfig;
pub use schema::{Catalog, SchemaDiscoverer, TableInfo};
pub use source::{CheckResult, DocumentSource};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
