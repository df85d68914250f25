//! Catalog model as read by checkout and the back office.

mod resolver;

use std::collections::{BTreeMap, HashMap};

use document_store::Document;
use serde::{Deserialize, Serialize};

use crate::lenient;
use crate::value_objects::{Money, ProductId, VariantId};

pub use resolver::{LineItemProductResolver, MatchKind, ResolvedProduct};

/// A variant embedded in a product document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Variant {
    pub id: VariantId,
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub color: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub size: Option<String>,
    pub price: Option<Money>,
    #[serde(deserialize_with = "lenient::stock")]
    pub stock: i64,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub image: Option<String>,
}

/// A product document from the `products` collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Product {
    /// Filled from the document path when the body omits it.
    pub id: ProductId,
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub brand: Option<String>,
    #[serde(deserialize_with = "lenient::stock")]
    pub stock: i64,
    pub purchase_cost: Money,
    pub base_price: Money,
    #[serde(deserialize_with = "lenient::percent")]
    pub discount_percent: u8,
    pub images: Vec<String>,
    pub variants: Vec<Variant>,
}

impl Product {
    /// Returns the embedded variant with the given id.
    pub fn variant(&self, variant_id: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.id.as_str() == variant_id)
    }

    /// Catalog price per unit for the product or one of its variants,
    /// after the product discount.
    ///
    /// A variant without its own price sells at the base price. Returns
    /// `None` when the record carries no price at all.
    pub fn unit_price(&self, variant_id: Option<&str>) -> Option<Money> {
        let original = variant_id
            .and_then(|id| self.variant(id))
            .and_then(|v| v.price)
            .unwrap_or(self.base_price);
        if original.is_zero() {
            return None;
        }
        Some(match self.discount_percent.min(100) {
            0 => original,
            discount => original.percent_off(discount),
        })
    }

    /// Returns the first product image, if any.
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

/// Point-in-time view of the catalog.
///
/// Products are keyed by id in ascending order. Variant ids embedded in
/// product documents are indexed back to their owning product.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    products: BTreeMap<ProductId, Product>,
    variant_index: HashMap<String, ProductId>,
}

impl CatalogSnapshot {
    /// Builds a snapshot from already-parsed products.
    pub fn new(products: impl IntoIterator<Item = Product>) -> Self {
        let mut snapshot = Self::default();
        for product in products {
            snapshot.insert(product);
        }
        snapshot
    }

    /// Builds a snapshot from raw product documents.
    ///
    /// Documents that do not parse as products are skipped with a warning.
    pub fn from_documents<'a>(documents: impl IntoIterator<Item = &'a Document>) -> Self {
        let mut snapshot = Self::default();
        for doc in documents {
            match doc.deserialize::<Product>() {
                Ok(mut product) => {
                    if product.id.as_str().is_empty() {
                        product.id = ProductId::new(doc.id());
                    }
                    snapshot.insert(product);
                }
                Err(error) => {
                    tracing::warn!(product_id = %doc.id(), %error, "skipping unreadable product");
                }
            }
        }
        snapshot
    }

    fn insert(&mut self, product: Product) {
        for variant in &product.variants {
            if !variant.id.as_str().is_empty() {
                self.variant_index
                    .insert(variant.id.as_str().to_string(), product.id.clone());
            }
        }
        self.products.insert(product.id.clone(), product);
    }

    /// Looks up a product by id.
    pub fn get(&self, product_id: &str) -> Option<&Product> {
        self.products.get(&ProductId::new(product_id))
    }

    /// Looks up the product that embeds the given variant id.
    pub fn product_for_variant(&self, variant_id: &str) -> Option<&Product> {
        self.variant_index
            .get(variant_id)
            .and_then(|product_id| self.products.get(product_id))
    }

    /// Iterates products in ascending id order.
    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.products.values()
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use document_store::{DocumentPath, Version};
    use serde_json::json;

    use super::*;

    fn product_doc(id: &str, data: serde_json::Value) -> Document {
        Document {
            path: DocumentPath::new("products", id),
            data,
            version: Version::first(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_from_documents_fills_ids_and_indexes_variants() {
        let docs = vec![
            product_doc(
                "p2",
                json!({
                    "name": "Linen Shirt",
                    "purchaseCost": "12.50",
                    "basePrice": 30,
                    "variants": [{"id": "v-red", "color": "red", "stock": 4}]
                }),
            ),
            product_doc("p1", json!({"name": "Canvas Tote", "stock": 7})),
        ];

        let catalog = CatalogSnapshot::from_documents(&docs);

        assert_eq!(catalog.len(), 2);
        let shirt = catalog.get("p2").unwrap();
        assert_eq!(shirt.id.as_str(), "p2");
        assert_eq!(shirt.purchase_cost.cents(), 1250);
        assert_eq!(
            catalog.product_for_variant("v-red").map(|p| p.id.as_str()),
            Some("p2")
        );

        let ids: Vec<_> = catalog.products().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2"]);
    }

    #[test]
    fn test_unreadable_product_is_skipped() {
        let docs = vec![product_doc("bad", json!({"name": "Scarf", "variants": "none"}))];
        let catalog = CatalogSnapshot::from_documents(&docs);
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_mixed_type_fields_still_load() {
        let docs = vec![
            product_doc("p1", json!({"name": "Boot", "purchaseCost": 20, "stock": 4.0})),
            product_doc(
                "p2",
                json!({
                    "name": "Sneaker",
                    "stock": "5",
                    "discountPercent": "10",
                    "variants": [{"id": "v38", "size": 38, "stock": "2"}]
                }),
            ),
        ];

        let catalog = CatalogSnapshot::from_documents(&docs);

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("p1").unwrap().stock, 4);
        let sneaker = catalog.get("p2").unwrap();
        assert_eq!(sneaker.stock, 5);
        assert_eq!(sneaker.discount_percent, 10);
        let variant = sneaker.variant("v38").unwrap();
        assert_eq!(variant.size.as_deref(), Some("38"));
        assert_eq!(variant.stock, 2);
    }

    #[test]
    fn test_unit_price_prefers_variant_and_applies_discount() {
        let product = Product {
            id: ProductId::new("p1"),
            base_price: Money::from_cents(4000),
            discount_percent: 25,
            variants: vec![Variant {
                id: VariantId::new("v-xl"),
                price: Some(Money::from_cents(4800)),
                ..Default::default()
            }],
            ..Default::default()
        };

        assert_eq!(product.unit_price(None), Some(Money::from_cents(3000)));
        assert_eq!(product.unit_price(Some("v-xl")), Some(Money::from_cents(3600)));
        assert_eq!(product.unit_price(Some("v-gone")), Some(Money::from_cents(3000)));
        assert_eq!(Product::default().unit_price(None), None);
    }
}
