//! Checkout error types.

use document_store::StoreError;
use domain::ValidationError;
use thiserror::Error;

/// Errors that can end a checkout attempt.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The form, payment choice or cart is incomplete.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A line asks for more units than are in stock.
    #[error("Insufficient stock for {product_name}")]
    InsufficientStock { product_name: String },

    /// Neither a variant record nor a product stock field exists for a line.
    #[error("Product not found: {product_name} ({product_id})")]
    ProductNotFound {
        product_id: String,
        product_name: String,
    },

    /// The reservation was denied and the fallback order could not be
    /// written either.
    #[error("Your order could not be placed. Please contact an administrator. ({source})")]
    FallbackFailed {
        #[source]
        source: StoreError,
    },

    /// Document store error.
    #[error("Document store error: {0}")]
    Store(#[from] StoreError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CheckoutError {
    /// True when the store refused a write for lack of permission.
    ///
    /// This is the only failure the fallback policy handles.
    pub fn is_authorization_denied(&self) -> bool {
        matches!(self, CheckoutError::Store(err) if err.is_permission_denied())
    }

    /// Short label used for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            CheckoutError::Validation(_) => "validation",
            CheckoutError::InsufficientStock { .. } => "insufficient_stock",
            CheckoutError::ProductNotFound { .. } => "product_not_found",
            CheckoutError::FallbackFailed { .. } => "fallback_failed",
            CheckoutError::Store(err) if err.is_aborted() => "contention",
            CheckoutError::Store(_) => "store",
            CheckoutError::Serialization(_) => "serialization",
        }
    }
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_permission_denied_counts_as_authorization_failure() {
        let denied = CheckoutError::Store(StoreError::PermissionDenied {
            operation: "update",
            path: "products/p1".into(),
        });
        let aborted = CheckoutError::Store(StoreError::Aborted {
            path: "products/p1".into(),
        });
        let stock = CheckoutError::InsufficientStock {
            product_name: "Mug".into(),
        };

        assert!(denied.is_authorization_denied());
        assert!(!aborted.is_authorization_denied());
        assert!(!stock.is_authorization_denied());
        assert_eq!(aborted.reason(), "contention");
    }
}
