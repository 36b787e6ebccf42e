//! Error types for the MongoDB source
//!
//! This module defines the error taxonomy for the whole connector.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use thiserror::Error;

/// The main error type for the MongoDB source
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    /// Invalid or incomplete configuration
    #[error("Configuration error: {message}")]
    Config {
        /// What is wrong with the configuration
        message: String,
    },

    /// JSON parsing failed
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Connectivity Errors
    // ============================================================================
    /// The store is unreachable; fatal for the whole sync
    #[error("Unable to reach {resource}: {message}")]
    Connectivity {
        /// The unreachable resource (usually the database)
        resource: String,
        /// Underlying failure
        message: String,
    },

    /// Error surfaced by the MongoDB driver
    #[error("MongoDB driver error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    // ============================================================================
    // Discovery Errors
    // ============================================================================
    /// One collection could not be discovered; siblings are unaffected
    #[error("Discovery failed for collection '{collection}': {message}")]
    Discovery {
        /// Collection that failed
        collection: String,
        /// Underlying failure
        message: String,
    },

    // ============================================================================
    // Cursor Errors
    // ============================================================================
    /// A checkpoint value does not decode under the cursor field's native
    /// type; fatal for that table's incremental read
    #[error("Cursor value for field '{field}' in collection '{collection}' cannot be decoded as {expected}: {message}")]
    CursorTypeMismatch {
        /// Collection being read
        collection: String,
        /// Cursor field
        field: String,
        /// Native type the value was decoded against
        expected: String,
        /// Why decoding failed
        message: String,
    },

    /// The requested cursor field was never discovered, so its native type
    /// cannot be resolved
    #[error("Cursor field '{field}' not found in the discovered schema of collection '{collection}'")]
    CursorFieldMissing {
        /// Collection being read
        collection: String,
        /// Missing cursor field
        field: String,
    },

    // ============================================================================
    // Read Errors
    // ============================================================================
    /// A document failed to decode mid-scan; terminal for that stream
    #[error("Failed to decode document from collection '{collection}': {message}")]
    StreamDecode {
        /// Collection being read
        collection: String,
        /// Underlying failure
        message: String,
    },

    /// A selected stream does not exist in the catalog
    #[error("Stream '{stream}' not found in catalog")]
    StreamNotFound {
        /// The missing stream
        stream: String,
    },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    /// Filesystem error (config loading)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    /// Catch-all for errors with no richer classification
    #[error("{0}")]
    Other(String),

    /// Wrapped [`anyhow::Error`]
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a connectivity error naming the unreachable resource
    pub fn connectivity(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connectivity {
            resource: resource.into(),
            message: message.into(),
        }
    }

    /// Create a discovery error for a single collection
    pub fn discovery(collection: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Discovery {
            collection: collection.into(),
            message: message.into(),
        }
    }

    /// Create a cursor type mismatch error
    pub fn cursor_type_mismatch(
        collection: impl Into<String>,
        field: impl Into<String>,
        expected: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::CursorTypeMismatch {
            collection: collection.into(),
            field: field.into(),
            expected: expected.into(),
            message: message.into(),
        }
    }

    /// Create a missing cursor field error
    pub fn cursor_field_missing(
        collection: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        Self::CursorFieldMissing {
            collection: collection.into(),
            field: field.into(),
        }
    }

    /// Create a stream decode error for a mid-scan failure
    pub fn stream_decode(collection: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StreamDecode {
            collection: collection.into(),
            message: message.into(),
        }
    }

    /// Check if this error aborts the whole sync.
    ///
    /// Non-fatal errors are local to one collection (discovery) or one
    /// stream (decode/cursor) and leave sibling collections syncable.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Connectivity { .. } | Error::Config { .. } | Error::Mongo(_) | Error::Io(_)
        )
    }
}

/// Result type alias for the MongoDB source
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("missing database");
        assert_eq!(err.to_string(), "Configuration error: missing database");

        let err = Error::connectivity("database 'shop'", "connection refused");
        assert_eq!(
            err.to_string(),
            "Unable to reach database 'shop': connection refused"
        );

        let err = Error::discovery("orders", "sample query timed out");
        assert_eq!(
            err.to_string(),
            "Discovery failed for collection 'orders': sample query timed out"
        );

        let err = Error::cursor_type_mismatch("orders", "amount", "int", "invalid digit");
        assert_eq!(
            err.to_string(),
            "Cursor value for field 'amount' in collection 'orders' cannot be decoded as int: invalid digit"
        );

        let err = Error::cursor_field_missing("orders", "updated_at");
        assert_eq!(
            err.to_string(),
            "Cursor field 'updated_at' not found in the discovered schema of collection 'orders'"
        );

        let err = Error::stream_decode("orders", "unexpected end of document");
        assert_eq!(
            err.to_string(),
            "Failed to decode document from collection 'orders': unexpected end of document"
        );
    }

    #[test]
    fn test_is_fatal() {
        assert!(Error::connectivity("database 'shop'", "timed out").is_fatal());
        assert!(Error::config("bad connection string").is_fatal());

        assert!(!Error::discovery("orders", "boom").is_fatal());
        assert!(!Error::cursor_type_mismatch("orders", "_id", "objectId", "bad hex").is_fatal());
        assert!(!Error::stream_decode("orders", "boom").is_fatal());
        assert!(!Error::StreamNotFound {
            stream: "orders".to_string()
        }
        .is_fatal());
    }

    #[test]
    fn test_result_context() {
        let result: Result<()> = Err(Error::config("inner"));
        let with_context = result.context("outer");
        assert!(with_context
            .unwrap_err()
            .to_string()
            .contains("outer: Configuration error: inner"));
    }
}
