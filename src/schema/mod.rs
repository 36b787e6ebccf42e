//! Schema discovery
//!
//! Maps native document field types onto a small portable primitive set and
//! derives per-collection field tables from bounded samples. Discovery never
//! scans whole collections and never fails a database because one collection
//! is unreadable.

mod discover;
mod types;

pub use discover::{Catalog, DiscoveryFailure, SchemaDiscoverer};
pub use types::{element_type_name, portable_type, CommonField, PortableType, TableInfo};
