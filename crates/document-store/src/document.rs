use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;

/// Location of a document: a collection path plus a document id.
///
/// Sub-collections are addressed by nesting, e.g. the variant stock record
/// `products/p1/variants/v1` has collection `products/p1/variants` and id `v1`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentPath {
    collection: String,
    id: String,
}

impl DocumentPath {
    /// Creates a path from a collection and a document id.
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Returns the collection this document lives in.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Returns the document id within its collection.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Addresses a document in a sub-collection of this document.
    pub fn child(&self, sub_collection: &str, id: impl Into<String>) -> Self {
        Self {
            collection: format!("{}/{}/{}", self.collection, self.id, sub_collection),
            id: id.into(),
        }
    }
}

impl std::fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// Revision number of a stored document, used for optimistic concurrency control.
///
/// A document that does not exist is at the initial version (0); every
/// write bumps the version by one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the version of a document that does not exist.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the version of a freshly created document.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored document with its revision metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub path: DocumentPath,
    pub data: Value,
    pub version: Version,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Returns the document id.
    pub fn id(&self) -> &str {
        self.path.id()
    }

    /// Looks up a field by dotted path (`payment.total`).
    pub fn field(&self, field: &str) -> Option<&Value> {
        lookup_field(&self.data, field)
    }

    /// Deserializes the document body into a typed value.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.data.clone())?)
    }
}

/// Resolves a dotted field path against a JSON value.
pub fn lookup_field<'a>(value: &'a Value, field: &str) -> Option<&'a Value> {
    field
        .split('.')
        .try_fold(value, |current, segment| current.get(segment))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_path_nests_collection() {
        let product = DocumentPath::new("products", "p1");
        let variant = product.child("variants", "v1");
        assert_eq!(variant.collection(), "products/p1/variants");
        assert_eq!(variant.id(), "v1");
        assert_eq!(variant.to_string(), "products/p1/variants/v1");
    }

    #[test]
    fn version_progression() {
        assert_eq!(Version::initial().next(), Version::first());
        assert!(Version::first() > Version::initial());
    }

    #[test]
    fn field_lookup_follows_dots() {
        let doc = Document {
            path: DocumentPath::new("orders", "o1"),
            data: serde_json::json!({"payment": {"total": 12.5}, "status": "pending"}),
            version: Version::first(),
            updated_at: Utc::now(),
        };
        assert_eq!(doc.field("status"), Some(&serde_json::json!("pending")));
        assert_eq!(doc.field("payment.total"), Some(&serde_json::json!(12.5)));
        assert!(doc.field("payment.missing").is_none());
    }
}
