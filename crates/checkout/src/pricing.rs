//! Line prices taken from the catalog instead of the submitted cart.

use document_store::Document;
use domain::{CartItem, Money, OrderDocument, Product};

/// Catalog unit price for a cart line, given its product document.
///
/// Products whose record carries no price keep the submitted price, with a
/// warning, so unpriced legacy items can still be sold.
pub(crate) fn catalog_price(product_doc: Option<&Document>, line: &CartItem) -> Money {
    let product = product_doc.and_then(|doc| match doc.deserialize::<Product>() {
        Ok(product) => Some(product),
        Err(error) => {
            tracing::warn!(product_id = %line.product_id, %error, "unreadable product record");
            None
        }
    });
    let variant_id = line.variant_id.as_ref().map(|v| v.as_str());

    match product.and_then(|p| p.unit_price(variant_id)) {
        Some(price) => {
            if price != line.effective_unit_price() {
                tracing::info!(
                    product_id = %line.product_id,
                    submitted = %line.effective_unit_price(),
                    catalog = %price,
                    "cart price replaced by catalog price"
                );
            }
            price
        }
        None => {
            tracing::warn!(product_id = %line.product_id, "product has no catalog price, keeping cart price");
            line.effective_unit_price()
        }
    }
}

/// Rewrites the order's line prices and payment totals.
///
/// `prices` holds one entry per order line, in line order.
pub(crate) fn apply_prices(order: &mut OrderDocument, prices: &[Money]) {
    for (item, price) in order.items.iter_mut().zip(prices) {
        item.price = *price;
    }
    order.recompute_totals();
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use document_store::Version;
    use domain::collections::product_path;
    use domain::{OrderLine, PaymentSummary, ProductId, VariantId};
    use serde_json::{Value, json};

    use super::*;

    fn product_doc(data: Value) -> Document {
        Document {
            path: product_path("p1"),
            data,
            version: Version::first(),
            updated_at: Utc::now(),
        }
    }

    fn submitted(cents: i64, variant: Option<&str>) -> CartItem {
        CartItem {
            product_id: ProductId::new("p1"),
            variant_id: variant.map(VariantId::new),
            unit_price: Some(Money::from_cents(cents)),
            quantity: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_catalog_price_overrides_submitted_price() {
        let doc = product_doc(json!({
            "basePrice": 30,
            "discountPercent": 10,
            "variants": [{"id": "v-xl", "price": 40}]
        }));

        assert_eq!(catalog_price(Some(&doc), &submitted(1, None)).cents(), 2700);
        assert_eq!(catalog_price(Some(&doc), &submitted(1, Some("v-xl"))).cents(), 3600);
    }

    #[test]
    fn test_unpriced_product_keeps_submitted_price() {
        let doc = product_doc(json!({"name": "Sample", "stock": 3}));
        assert_eq!(catalog_price(Some(&doc), &submitted(950, None)).cents(), 950);
        assert_eq!(catalog_price(None, &submitted(950, None)).cents(), 950);
    }

    #[test]
    fn test_apply_prices_rebuilds_totals() {
        let mut order = OrderDocument {
            items: vec![OrderLine {
                price: Money::from_cents(1),
                quantity: 3,
                ..Default::default()
            }],
            payment: PaymentSummary {
                subtotal: Money::from_cents(3),
                shipping: Money::from_cents(500),
                total: Money::from_cents(503),
                ..Default::default()
            },
            ..Default::default()
        };

        apply_prices(&mut order, &[Money::from_cents(2000)]);

        assert_eq!(order.items[0].price.cents(), 2000);
        assert_eq!(order.payment.subtotal.cents(), 6000);
        assert_eq!(order.payment.total.cents(), 6500);
    }
}
