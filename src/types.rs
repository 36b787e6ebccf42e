//! Common types used throughout the MongoDB source
//!
//! Shared protocol enums and reserved identifiers used across modules.

use serde::{Deserialize, Serialize};

/// The store's reserved document-identity field.
///
/// Always reported as the primary key and always included in read
/// projections, whether or not the discovery sample ever observed it.
pub const ID_FIELD: &str = "_id";

// ============================================================================
// Sync Mode
// ============================================================================

/// Synchronization mode for streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Full refresh - read every document in the collection
    #[default]
    FullRefresh,
    /// Incremental - only read documents past the cursor high-water mark
    Incremental,
}

impl SyncMode {
    /// Protocol string for this mode
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncMode::FullRefresh => "full_refresh",
            SyncMode::Incremental => "incremental",
        }
    }
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
