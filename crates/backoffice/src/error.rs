//! Back-office error types.

use document_store::StoreError;
use thiserror::Error;

/// Errors that can occur during back-office operations.
#[derive(Debug, Error)]
pub enum BackofficeError {
    /// Document store error.
    #[error("Document store error: {0}")]
    Store(#[from] StoreError),

    /// The order does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// The requested status is not one an order can be moved to.
    #[error("Unknown order status: {0}")]
    InvalidStatus(String),

    /// The report period ends before it starts.
    #[error("Invalid report period: {0}")]
    InvalidPeriod(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BackofficeError {
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, BackofficeError::Store(err) if err.is_permission_denied())
    }
}

/// Result type for back-office operations.
pub type Result<T> = std::result::Result<T, BackofficeError>;
