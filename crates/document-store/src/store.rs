use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::{Document, DocumentPath, DocumentQuery, QueryPage, Result, StoreError, Version};

/// How many times a contended transaction body is run before giving up.
///
/// Only `StoreError::Aborted` counts as contention; every other failure
/// ends the transaction on the first attempt.
pub const MAX_TRANSACTION_ATTEMPTS: u32 = 5;

/// A staged write inside a transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    /// Create or replace the whole document.
    Set { path: DocumentPath, data: Value },
    /// Merge top-level fields into an existing document.
    Update {
        path: DocumentPath,
        fields: Map<String, Value>,
    },
    /// Remove the document.
    Delete { path: DocumentPath },
}

impl Write {
    /// Returns the path this write targets.
    pub fn path(&self) -> &DocumentPath {
        match self {
            Write::Set { path, .. } | Write::Update { path, .. } | Write::Delete { path } => path,
        }
    }

    /// Returns the operation name used in permission errors.
    pub fn operation(&self) -> &'static str {
        match self {
            Write::Set { .. } => "set",
            Write::Update { .. } => "update",
            Write::Delete { .. } => "delete",
        }
    }
}

/// Read set and staged writes of an optimistic transaction.
///
/// Reads go through [`DocumentStore::get_in`], which records the version
/// observed for each path. [`DocumentStore::commit`] applies every staged
/// write atomically, or none of them if any recorded read is stale.
#[derive(Debug, Clone, Default)]
pub struct Transaction {
    reads: HashMap<DocumentPath, Version>,
    writes: Vec<Write>,
}

impl Transaction {
    /// Starts an empty transaction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the version observed for a path. The first observation wins.
    pub fn record_read(&mut self, path: DocumentPath, version: Version) {
        self.reads.entry(path).or_insert(version);
    }

    /// Stages a full document write.
    pub fn set(&mut self, path: DocumentPath, data: Value) {
        self.writes.push(Write::Set { path, data });
    }

    /// Stages a field merge.
    pub fn update(&mut self, path: DocumentPath, fields: Map<String, Value>) {
        self.writes.push(Write::Update { path, fields });
    }

    /// Stages a delete.
    pub fn delete(&mut self, path: DocumentPath) {
        self.writes.push(Write::Delete { path });
    }

    /// Returns the version recorded for a path, if it was read.
    pub fn read_version(&self, path: &DocumentPath) -> Option<Version> {
        self.reads.get(path).copied()
    }

    /// Iterates over the recorded read set.
    pub fn reads(&self) -> impl Iterator<Item = (&DocumentPath, &Version)> {
        self.reads.iter()
    }

    /// Returns the staged writes in staging order.
    pub fn writes(&self) -> &[Write] {
        &self.writes
    }

    /// Returns true if nothing was staged.
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

/// Core trait for document store implementations.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Reads a single document. Returns None if it does not exist.
    async fn get(&self, path: &DocumentPath) -> Result<Option<Document>>;

    /// Creates or replaces a document outside any transaction.
    async fn set(&self, path: &DocumentPath, data: Value) -> Result<()>;

    /// Merges top-level fields into an existing document.
    ///
    /// Fails with `NotFound` if the document does not exist.
    async fn update(&self, path: &DocumentPath, fields: Map<String, Value>) -> Result<()>;

    /// Removes a document. Removing a missing document is not an error.
    async fn delete(&self, path: &DocumentPath) -> Result<()>;

    /// Runs a collection query and returns one page of results.
    async fn query(&self, query: DocumentQuery) -> Result<QueryPage>;

    /// Reads a document as part of a transaction, recording its version.
    async fn get_in(
        &self,
        tx: &mut Transaction,
        path: &DocumentPath,
    ) -> Result<Option<Document>> {
        let doc = self.get(path).await?;
        let version = doc.as_ref().map_or(Version::initial(), |d| d.version);
        tx.record_read(path.clone(), version);
        Ok(doc)
    }

    /// Commits a transaction.
    ///
    /// Fails with `Aborted` if any document in the read set changed since it
    /// was read, and with `PermissionDenied` if any staged write is not
    /// allowed. Either way nothing is written.
    async fn commit(&self, tx: Transaction) -> Result<()>;
}

/// Extension trait providing typed convenience methods for document stores.
#[async_trait]
pub trait DocumentStoreExt: DocumentStore {
    /// Reads a document and deserializes its body.
    async fn get_as<T: DeserializeOwned + Send>(&self, path: &DocumentPath) -> Result<Option<T>> {
        match self.get(path).await? {
            Some(doc) => Ok(Some(doc.deserialize()?)),
            None => Ok(None),
        }
    }

    /// Serializes a value and writes it as the whole document.
    async fn set_as<T: Serialize + Sync>(&self, path: &DocumentPath, value: &T) -> Result<()> {
        let data = serde_json::to_value(value)?;
        self.set(path, data).await
    }

    /// Checks if a document exists.
    async fn exists(&self, path: &DocumentPath) -> Result<bool> {
        Ok(self.get(path).await?.is_some())
    }
}

// Blanket implementation for all DocumentStore implementations
impl<T: DocumentStore + ?Sized> DocumentStoreExt for T {}

/// Validates a transaction before committing.
pub fn validate_transaction(tx: &Transaction) -> std::result::Result<(), StoreError> {
    if tx.is_empty() {
        return Err(StoreError::InvalidTransaction(
            "Cannot commit a transaction without writes".to_string(),
        ));
    }

    for write in tx.writes() {
        validate_path(write.path())?;
        if let Write::Set { data, .. } = write
            && !data.is_object()
        {
            return Err(StoreError::InvalidTransaction(format!(
                "Document body for {} must be an object",
                write.path()
            )));
        }
    }

    Ok(())
}

/// Rejects empty collection or id segments.
pub fn validate_path(path: &DocumentPath) -> std::result::Result<(), StoreError> {
    if path.collection().is_empty() || path.id().is_empty() || path.id().contains('/') {
        return Err(StoreError::InvalidTransaction(format!(
            "Invalid document path: {path}"
        )));
    }
    Ok(())
}
