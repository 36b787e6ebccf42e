//! Portable schema types
//!
//! Discovered fields are described by a closed set of portable primitives so
//! downstream consumers never need to understand BSON's native type system.

use bson::spec::ElementType;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

// ============================================================================
// Portable Type
// ============================================================================

/// Portable schema primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortableType {
    /// UTF-8 text, plus native types best represented as text
    String,
    /// Any numeric native type
    Number,
    /// True/false
    Boolean,
    /// Embedded document
    Object,
    /// Array of values
    Array,
    /// Generic fallback for native types with no better projection
    Any,
}

impl PortableType {
    /// Protocol string for this primitive
    pub fn as_str(&self) -> &'static str {
        match self {
            PortableType::String => "string",
            PortableType::Number => "number",
            PortableType::Boolean => "boolean",
            PortableType::Object => "object",
            PortableType::Array => "array",
            PortableType::Any => "any",
        }
    }

    /// JSON-schema property shape for a field of this type.
    ///
    /// The generic fallback becomes the unconstrained schema `{}` since
    /// "any" is not a JSON-schema type.
    pub fn json_schema(&self) -> Value {
        match self {
            PortableType::Any => json!({}),
            other => json!({ "type": other.as_str() }),
        }
    }
}

impl std::fmt::Display for PortableType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a native BSON element type to its portable primitive.
///
/// Total and deterministic: every native type resolves to exactly one
/// primitive, and anything unusual (null-ish values, deprecated pointer
/// types, min/max keys) falls back to [`PortableType::Any`] so discovery
/// never aborts on an exotic value.
pub fn portable_type(native: ElementType) -> PortableType {
    match native {
        ElementType::Boolean => PortableType::Boolean,
        ElementType::Int32 | ElementType::Int64 | ElementType::Double | ElementType::Decimal128 => {
            PortableType::Number
        }
        ElementType::String
        | ElementType::Symbol
        | ElementType::Binary
        | ElementType::DateTime
        | ElementType::Timestamp
        | ElementType::ObjectId
        | ElementType::RegularExpression
        | ElementType::JavaScriptCode => PortableType::String,
        ElementType::Array => PortableType::Array,
        ElementType::EmbeddedDocument | ElementType::JavaScriptCodeWithScope => {
            PortableType::Object
        }
        _ => PortableType::Any,
    }
}

/// Driver-style name for a native element type, used in error messages and
/// catalog output.
pub fn element_type_name(native: ElementType) -> &'static str {
    match native {
        ElementType::Double => "double",
        ElementType::String => "string",
        ElementType::EmbeddedDocument => "document",
        ElementType::Array => "array",
        ElementType::Binary => "binary",
        ElementType::Undefined => "undefined",
        ElementType::ObjectId => "objectId",
        ElementType::Boolean => "boolean",
        ElementType::DateTime => "date",
        ElementType::Null => "null",
        ElementType::RegularExpression => "regex",
        ElementType::DbPointer => "dbPointer",
        ElementType::JavaScriptCode => "javascript",
        ElementType::Symbol => "symbol",
        ElementType::JavaScriptCodeWithScope => "javascriptWithScope",
        ElementType::Int32 => "int",
        ElementType::Timestamp => "timestamp",
        ElementType::Int64 => "long",
        ElementType::Decimal128 => "decimal",
        ElementType::MinKey => "minKey",
        ElementType::MaxKey => "maxKey",
    }
}

// ============================================================================
// Common Field
// ============================================================================

/// One discovered field: its name, the native type it was first observed
/// with, and the portable primitive it is presented as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonField {
    /// Field name, unique within a collection
    pub name: String,

    /// Native type of the first observation
    pub native_type: ElementType,

    /// Portable primitive (may be widened to `Any` on conflicting
    /// observations)
    pub portable_type: PortableType,
}

impl CommonField {
    /// Create a field from its first observation
    pub fn new(name: impl Into<String>, native_type: ElementType) -> Self {
        Self {
            name: name.into(),
            native_type,
            portable_type: portable_type(native_type),
        }
    }

    /// Driver-style name of the native type
    pub fn native_type_name(&self) -> &'static str {
        element_type_name(self.native_type)
    }
}

// ============================================================================
// Table Info
// ============================================================================

/// Discovered metadata for one collection.
///
/// A structural summary, not a validation contract: documents read later may
/// contain fields absent from or typed differently than this table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    /// Database the collection lives in
    pub namespace: String,

    /// Collection name
    pub name: String,

    /// Discovered fields in first-observation order
    pub fields: Vec<CommonField>,

    /// Primary key field names; never empty, always contains the reserved
    /// identity field
    pub primary_keys: Vec<String>,
}

impl TableInfo {
    /// Look up a discovered field by name
    pub fn field(&self, name: &str) -> Option<&CommonField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Discovered field names in first-observation order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// JSON-schema projection of the discovered fields, for catalog output
    pub fn json_schema(&self) -> Value {
        let mut properties = serde_json::Map::new();
        for field in &self.fields {
            properties.insert(field.name.clone(), field.portable_type.json_schema());
        }
        json!({
            "type": "object",
            "properties": properties,
            "additionalProperties": true,
        })
    }
}
