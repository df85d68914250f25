//! Domain error types.

use thiserror::Error;

/// Errors raised by cart mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// No line matches the product/variant key.
    #[error("Item not found in cart: {product_id}{}", variant_suffix(.variant_id))]
    ItemNotFound {
        product_id: String,
        variant_id: Option<String>,
    },
}

fn variant_suffix(variant_id: &Option<String>) -> String {
    variant_id
        .as_ref()
        .map(|v| format!(" (variant {v})"))
        .unwrap_or_default()
}

/// An order draft could not be assembled because required input is missing.
///
/// `missing` holds human-readable field labels in form order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Missing required fields: {}", .missing.join(", "))]
pub struct ValidationError {
    pub missing: Vec<&'static str>,
}

impl ValidationError {
    /// Returns true if the given label is among the missing fields.
    pub fn is_missing(&self, label: &str) -> bool {
        self.missing.contains(&label)
    }
}
