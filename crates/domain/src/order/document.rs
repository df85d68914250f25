//! The order document as stored in the `orders` collection.
//!
//! Orders written by older storefront versions are missing fields or hold
//! them in other types, so every field has a default and the readers are
//! lenient.

use chrono::{DateTime, Utc};
use document_store::Document;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::geolocation::GeoLocation;
use super::status::OrderStatus;
use crate::lenient;
use crate::value_objects::Money;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Customer {
    #[serde(deserialize_with = "lenient::string")]
    pub first_name: String,
    #[serde(deserialize_with = "lenient::string")]
    pub last_name: String,
    #[serde(deserialize_with = "lenient::string")]
    pub email: String,
    #[serde(deserialize_with = "lenient::string")]
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoLocation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShippingAddress {
    #[serde(deserialize_with = "lenient::string")]
    pub address: String,
    #[serde(deserialize_with = "lenient::string")]
    pub city: String,
    #[serde(deserialize_with = "lenient::string")]
    pub zip_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoLocation>,
}

/// One purchased line on an order.
///
/// Product references are spread over `productId`, `id` and `variantId`
/// depending on which storefront version wrote the order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderLine {
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub product_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub variant_id: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub image: Option<String>,
    pub price: Money,
    #[serde(deserialize_with = "lenient_quantity")]
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub size: Option<String>,
}

impl Default for OrderLine {
    fn default() -> Self {
        Self {
            product_id: None,
            id: None,
            variant_id: None,
            name: String::new(),
            image: None,
            price: Money::zero(),
            quantity: 1,
            size: None,
        }
    }
}

impl OrderLine {
    /// Returns price x quantity.
    pub fn line_total(&self) -> Money {
        self.price.multiply(self.quantity)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentSummary {
    #[serde(deserialize_with = "lenient::string")]
    pub method: String,
    pub subtotal: Money,
    pub shipping: Money,
    pub total: Money,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub transaction_number: Option<String>,
    pub receipt_uploaded: bool,
}

/// A hosted payment receipt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentProof {
    pub url: String,
    pub file_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderDocument {
    pub id: String,
    #[serde(deserialize_with = "lenient::string")]
    pub status: String,
    pub customer: Customer,
    pub shipping_address: ShippingAddress,
    pub items: Vec<OrderLine>,
    pub payment: PaymentSummary,
    pub payment_proofs: Vec<PaymentProof>,
    pub requires_inventory_processing: bool,
    pub pending_receipt: bool,
    /// Stock for this order has already been taken out of inventory.
    pub inventory_processed: bool,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub user_id: Option<String>,
    #[serde(with = "epoch_millis", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(with = "epoch_millis", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl OrderDocument {
    /// Parses a stored order, taking the id from the document path.
    pub fn from_document(doc: &Document) -> document_store::Result<Self> {
        let mut order: OrderDocument = doc.deserialize()?;
        order.id = doc.id().to_string();
        Ok(order)
    }

    /// Serializes the order into a document body.
    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// Returns the canonical status, if the stored one is recognized.
    pub fn canonical_status(&self) -> Option<OrderStatus> {
        OrderStatus::parse(&self.status)
    }

    pub fn is_cancelled(&self) -> bool {
        self.canonical_status() == Some(OrderStatus::Cancelled)
    }

    /// Sets the payment subtotal from the line prices and the total from
    /// subtotal plus shipping.
    pub fn recompute_totals(&mut self) {
        self.payment.subtotal = self.items.iter().map(OrderLine::line_total).sum();
        self.payment.total = self.payment.subtotal + self.payment.shipping;
    }

    /// Total units across all lines.
    pub fn total_units(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |units, line| units.saturating_add(line.quantity))
    }
}

fn lenient_quantity<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let quantity = match &value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse::<f64>().map_or(1, |f| f.max(0.0).round() as u64),
        Value::Null => 1,
        _ => {
            return Err(serde::de::Error::custom(format!(
                "invalid quantity: {value}"
            )));
        }
    };
    Ok(u32::try_from(quantity).unwrap_or(u32::MAX))
}

/// Timestamps are stored as epoch milliseconds; older orders hold RFC 3339
/// strings.
mod epoch_millis {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(ts) => serializer.serialize_i64(ts.timestamp_millis()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .and_then(DateTime::from_timestamp_millis),
            Some(Value::String(s)) => DateTime::parse_from_rfc3339(s.trim())
                .ok()
                .map(|ts| ts.with_timezone(&Utc)),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_reads_historical_order_shapes() {
        let order: OrderDocument = serde_json::from_value(json!({
            "status": "Completado",
            "items": [
                {"id": "v1", "name": "Hoodie", "price": "25.5", "quantity": "2"},
                {"productId": "p2", "name": "Cap", "price": 10}
            ],
            "createdAt": "2024-03-01T10:00:00Z"
        }))
        .unwrap();

        assert_eq!(order.items[0].quantity, 2);
        assert_eq!(order.items[0].line_total().cents(), 5100);
        assert_eq!(order.items[1].quantity, 1);
        assert_eq!(order.canonical_status(), Some(OrderStatus::Completed));
        assert_eq!(
            order.created_at,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap())
        );
        assert!(!order.inventory_processed);
    }

    #[test]
    fn test_numeric_and_null_text_fields_are_read() {
        let order: OrderDocument = serde_json::from_value(json!({
            "status": "pending",
            "customer": {"firstName": "Ana", "phone": 5550123},
            "shippingAddress": {"zipCode": 28001},
            "items": [
                {"productId": 17, "name": null, "price": 40, "size": 38, "image": null}
            ]
        }))
        .unwrap();

        let line = &order.items[0];
        assert_eq!(line.product_id.as_deref(), Some("17"));
        assert_eq!(line.name, "");
        assert_eq!(line.size.as_deref(), Some("38"));
        assert_eq!(line.image, None);
        assert_eq!(order.customer.phone, "5550123");
        assert_eq!(order.shipping_address.zip_code, "28001");
    }

    #[test]
    fn test_recompute_totals_follows_line_prices() {
        let mut order = OrderDocument {
            items: vec![
                OrderLine {
                    price: Money::from_cents(1250),
                    quantity: 2,
                    ..Default::default()
                },
                OrderLine {
                    price: Money::from_cents(500),
                    ..Default::default()
                },
            ],
            payment: PaymentSummary {
                subtotal: Money::from_cents(1),
                shipping: Money::from_cents(400),
                total: Money::from_cents(401),
                ..Default::default()
            },
            ..Default::default()
        };

        order.recompute_totals();

        assert_eq!(order.payment.subtotal, Money::from_cents(3000));
        assert_eq!(order.payment.total, Money::from_cents(3400));
    }

    #[test]
    fn test_timestamps_are_written_as_millis() {
        let order = OrderDocument {
            id: "o1".into(),
            status: "pending".into(),
            created_at: DateTime::from_timestamp_millis(1_700_000_000_123),
            ..Default::default()
        };

        let value = order.to_value().unwrap();
        assert_eq!(value["createdAt"], json!(1_700_000_000_123_i64));
        assert!(value.get("updatedAt").is_none());
        assert_eq!(value["requiresInventoryProcessing"], json!(false));
        assert_eq!(value["paymentProofs"], json!([]));
    }

    #[test]
    fn test_cancelled_detection_accepts_legacy_spelling() {
        let order = OrderDocument {
            status: "cancelada".into(),
            ..Default::default()
        };
        assert!(order.is_cancelled());
    }
}
