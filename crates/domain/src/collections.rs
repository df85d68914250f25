//! Document locations used by the storefront.

use common::OrderId;
use document_store::DocumentPath;

pub const ORDERS: &str = "orders";
pub const PRODUCTS: &str = "products";
pub const VARIANTS: &str = "variants";

/// Location of an order document.
pub fn order_path(order_id: &OrderId) -> DocumentPath {
    DocumentPath::new(ORDERS, order_id.to_string())
}

/// Location of a product document, which may carry a flat `stock` field.
pub fn product_path(product_id: &str) -> DocumentPath {
    DocumentPath::new(PRODUCTS, product_id)
}

/// Location of a per-variant stock record.
pub fn variant_path(product_id: &str, variant_id: &str) -> DocumentPath {
    product_path(product_id).child(VARIANTS, variant_id)
}
