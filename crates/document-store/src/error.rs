use thiserror::Error;

/// Errors that can occur when interacting with the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The caller is not allowed to perform the operation.
    ///
    /// Checkout relies on this kind to pick the degraded order path, so
    /// backends must never report authorization failures any other way.
    #[error("Permission denied: cannot {operation} {path}")]
    PermissionDenied {
        operation: &'static str,
        path: String,
    },

    /// The document does not exist.
    #[error("Document not found: {0}")]
    NotFound(String),

    /// A document read inside a transaction changed before commit.
    #[error("Transaction aborted: {path} changed since it was read")]
    Aborted { path: String },

    /// The query could not be executed as built.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// The transaction could not be committed as built.
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Returns true if the store rejected the operation for lack of permission.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, StoreError::PermissionDenied { .. })
    }

    /// Returns true if a transaction lost a race and may be re-run.
    pub fn is_aborted(&self) -> bool {
        matches!(self, StoreError::Aborted { .. })
    }
}

/// Result type for document store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
