use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::{
    Document, DocumentPath, DocumentQuery, QueryPage, Result, StoreError, Version,
    store::{DocumentStore, Transaction, Write, validate_path, validate_transaction},
};

/// Write rules enforced by the in-memory store.
///
/// Stands in for the server-side security rules of a hosted document
/// database: a collection prefix marked read-only rejects every write to
/// it and to its sub-collections with `PermissionDenied`.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    read_only_prefixes: Vec<String>,
}

impl AccessPolicy {
    /// Allows every write.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Rejects writes to collections starting with `prefix`.
    pub fn deny_writes(mut self, prefix: impl Into<String>) -> Self {
        self.read_only_prefixes.push(prefix.into());
        self
    }

    fn check(&self, operation: &'static str, path: &DocumentPath) -> Result<()> {
        let denied = self
            .read_only_prefixes
            .iter()
            .any(|prefix| path.collection().starts_with(prefix.as_str()));
        if denied {
            return Err(StoreError::PermissionDenied {
                operation,
                path: path.to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Default)]
struct MemoryState {
    documents: BTreeMap<DocumentPath, Document>,
    /// Last version of each deleted document; a recreated document
    /// continues from it instead of restarting at the first version.
    tombstones: BTreeMap<DocumentPath, Version>,
    policy: AccessPolicy,
}

impl MemoryState {
    fn version_of(&self, path: &DocumentPath) -> Version {
        self.documents
            .get(path)
            .map_or(Version::initial(), |d| d.version)
    }

    fn put(&mut self, path: &DocumentPath, data: Value) {
        let previous = match self.documents.get(path) {
            Some(doc) => doc.version,
            None => self.tombstones.remove(path).unwrap_or(Version::initial()),
        };
        let version = previous.next();
        self.documents.insert(
            path.clone(),
            Document {
                path: path.clone(),
                data,
                version,
                updated_at: Utc::now(),
            },
        );
    }

    fn merge(&mut self, path: &DocumentPath, fields: Map<String, Value>) -> Result<()> {
        let doc = self
            .documents
            .get_mut(path)
            .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
        if let Value::Object(ref mut body) = doc.data {
            body.extend(fields);
        } else {
            doc.data = Value::Object(fields);
        }
        doc.version = doc.version.next();
        doc.updated_at = Utc::now();
        Ok(())
    }

    fn remove(&mut self, path: &DocumentPath) {
        if let Some(doc) = self.documents.remove(path) {
            self.tombstones.insert(path.clone(), doc.version);
        }
    }
}

/// In-memory document store.
///
/// Provides the same interface and transaction semantics as the
/// PostgreSQL implementation: commits are serialized behind a write lock
/// and abort when any document in the read set moved on.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryDocumentStore {
    /// Creates a new empty in-memory store that allows every write.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store enforcing the given write rules.
    pub fn with_policy(policy: AccessPolicy) -> Self {
        Self {
            state: Arc::new(RwLock::new(MemoryState {
                policy,
                ..Default::default()
            })),
        }
    }

    /// Replaces the write rules.
    pub async fn set_policy(&self, policy: AccessPolicy) {
        self.state.write().await.policy = policy;
    }

    /// Writes a document bypassing the write rules, for seeding fixtures.
    pub async fn seed(&self, path: DocumentPath, data: Value) {
        self.state.write().await.put(&path, data);
    }

    /// Returns the number of documents stored in a collection.
    pub async fn document_count(&self, collection: &str) -> usize {
        self.state
            .read()
            .await
            .documents
            .keys()
            .filter(|p| p.collection() == collection)
            .count()
    }

    /// Clears all documents.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.documents.clear();
        state.tombstones.clear();
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, path: &DocumentPath) -> Result<Option<Document>> {
        Ok(self.state.read().await.documents.get(path).cloned())
    }

    async fn set(&self, path: &DocumentPath, data: Value) -> Result<()> {
        validate_path(path)?;
        let mut state = self.state.write().await;
        state.policy.check("set", path)?;
        state.put(path, data);
        Ok(())
    }

    async fn update(&self, path: &DocumentPath, fields: Map<String, Value>) -> Result<()> {
        let mut state = self.state.write().await;
        state.policy.check("update", path)?;
        state.merge(path, fields)
    }

    async fn delete(&self, path: &DocumentPath) -> Result<()> {
        let mut state = self.state.write().await;
        state.policy.check("delete", path)?;
        state.remove(path);
        Ok(())
    }

    async fn query(&self, query: DocumentQuery) -> Result<QueryPage> {
        let state = self.state.read().await;
        let mut documents: Vec<_> = state
            .documents
            .values()
            .filter(|d| d.path.collection() == query.collection)
            .filter(|d| query.filters.iter().all(|f| f.matches(&d.data)))
            .filter(|d| {
                query
                    .start_after
                    .as_ref()
                    .is_none_or(|cursor| query.is_after_cursor(d, cursor))
            })
            .cloned()
            .collect();

        documents.sort_by(|a, b| query.compare(a, b));

        if let Some(limit) = query.limit {
            documents.truncate(limit);
        }

        Ok(QueryPage::new(documents, &query))
    }

    async fn commit(&self, tx: Transaction) -> Result<()> {
        validate_transaction(&tx)?;

        let mut state = self.state.write().await;

        // Check the read set
        for (path, observed) in tx.reads() {
            if state.version_of(path) != *observed {
                metrics::counter!("store_transaction_aborts_total").increment(1);
                tracing::debug!(%path, "transaction read set is stale");
                return Err(StoreError::Aborted {
                    path: path.to_string(),
                });
            }
        }

        // Check every write before applying any of them
        for (index, write) in tx.writes().iter().enumerate() {
            state.policy.check(write.operation(), write.path())?;
            if let Write::Update { path, .. } = write {
                let staged_set = tx.writes()[..index]
                    .iter()
                    .any(|w| matches!(w, Write::Set { path: p, .. } if p == path));
                if !state.documents.contains_key(path) && !staged_set {
                    return Err(StoreError::NotFound(path.to_string()));
                }
            }
        }

        for write in tx.writes().iter().cloned() {
            match write {
                Write::Set { path, data } => state.put(&path, data),
                Write::Update { path, fields } => state.merge(&path, fields)?,
                Write::Delete { path } => state.remove(&path),
            }
        }

        Ok(())
    }
}
