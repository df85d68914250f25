//! Degraded order creation used when the store denies the reservation.

use chrono::{DateTime, Utc};
use common::OrderId;
use document_store::DocumentStore;
use domain::collections::{order_path, product_path};
use domain::{CartItem, OrderDraft, OrderStatus};

use crate::error::{CheckoutError, Result};
use crate::pricing::{apply_prices, catalog_price};

/// Shown to the customer when the order was placed without reserving stock.
pub const MANUAL_RECONCILIATION_NOTICE: &str = "inventory will be reconciled manually";

/// Writes the order without touching stock.
///
/// Only used after the reservation transaction failed with a permission
/// error. The order is stored as `pending_inventory` with
/// `requiresInventoryProcessing` set so an administrator reconciles stock
/// later. Line prices come from the product records, as in the reservation.
/// This is a single plain write, not a transaction.
#[derive(Debug, Clone)]
pub struct ReservationFallbackPolicy<S> {
    store: S,
}

impl<S: DocumentStore> ReservationFallbackPolicy<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self, lines, draft))]
    pub async fn place_unreserved_order(
        &self,
        lines: &[CartItem],
        draft: &OrderDraft,
        order_id: &OrderId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut prices = Vec::with_capacity(lines.len());
        for line in lines {
            let product = match self.store.get(&product_path(line.product_id.as_str())).await {
                Ok(product) => product,
                Err(error) => {
                    tracing::warn!(product_id = %line.product_id, %error, "product read failed, keeping cart price");
                    None
                }
            };
            prices.push(catalog_price(product.as_ref(), line));
        }

        let mut order = draft.to_document(order_id, OrderStatus::PendingInventory, now);
        apply_prices(&mut order, &prices);
        order.requires_inventory_processing = true;
        order.inventory_processed = false;

        let body = order.to_value()?;
        self.store
            .set(&order_path(order_id), body)
            .await
            .map_err(|source| CheckoutError::FallbackFailed { source })?;

        tracing::warn!(%order_id, "order placed without stock reservation");
        Ok(())
    }
}
