//! Atomic stock reservation and order creation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::OrderId;
use document_store::{DocumentPath, DocumentStore, MAX_TRANSACTION_ATTEMPTS, Transaction};
use domain::collections::{order_path, product_path, variant_path};
use domain::{CartItem, OrderDraft, read_stock};
use serde_json::{Map, json};

use crate::error::{CheckoutError, Result};
use crate::pricing::{apply_prices, catalog_price};

/// A committed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedOrder {
    pub order_id: OrderId,
    /// Number of times the transaction body ran.
    pub attempts: u32,
}

/// Decrements stock for every cart line and writes the order, all or nothing.
///
/// Each line is checked against its stock record: the variant record
/// `products/{pid}/variants/{vid}` when the line names a variant and the
/// record exists, otherwise the flat `stock` field on `products/{pid}`.
/// Several lines drawing on the same record are checked against the running
/// balance. Line prices and payment totals are recomputed from the product
/// records read in the same transaction, so the submitted cart prices are
/// never stored. The order document is staged last with `inventoryProcessed`
/// set.
///
/// The store aborts the commit if any record read changed in the meantime;
/// the body then runs again from fresh reads, up to
/// [`MAX_TRANSACTION_ATTEMPTS`] times. Business failures end the attempt
/// immediately.
#[derive(Debug, Clone)]
pub struct InventoryReservationTransaction<S> {
    store: S,
}

impl<S: DocumentStore> InventoryReservationTransaction<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self, lines, draft), fields(lines = lines.len()))]
    pub async fn reserve(
        &self,
        lines: &[CartItem],
        draft: &OrderDraft,
        order_id: &OrderId,
        now: DateTime<Utc>,
    ) -> Result<ReservedOrder> {
        let mut attempt = 1;
        loop {
            let tx = self.stage(lines, draft, order_id, now).await?;
            match self.store.commit(tx).await {
                Ok(()) => {
                    tracing::info!(%order_id, attempt, "inventory reserved and order committed");
                    return Ok(ReservedOrder {
                        order_id: *order_id,
                        attempts: attempt,
                    });
                }
                Err(err) if err.is_aborted() && attempt < MAX_TRANSACTION_ATTEMPTS => {
                    tracing::debug!(%order_id, attempt, error = %err, "reservation contended, re-running");
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    async fn stage(
        &self,
        lines: &[CartItem],
        draft: &OrderDraft,
        order_id: &OrderId,
        now: DateTime<Utc>,
    ) -> Result<Transaction> {
        let mut tx = Transaction::new();
        let mut balances: BTreeMap<DocumentPath, i64> = BTreeMap::new();
        let mut prices = Vec::with_capacity(lines.len());

        for line in lines {
            let (path, available) = self.stock_record(&mut tx, line, &balances).await?;
            let requested = i64::from(line.quantity);
            if available < requested {
                tracing::info!(
                    product_id = %line.product_id,
                    available,
                    requested,
                    "insufficient stock"
                );
                return Err(CheckoutError::InsufficientStock {
                    product_name: line.name.clone(),
                });
            }
            balances.insert(path, available - requested);

            let product = self
                .store
                .get_in(&mut tx, &product_path(line.product_id.as_str()))
                .await?;
            prices.push(catalog_price(product.as_ref(), line));
        }

        for (path, stock) in balances {
            let mut fields = Map::new();
            fields.insert("stock".to_string(), json!(stock));
            tx.update(path, fields);
        }

        let status = draft.initial_status();
        let mut order = draft.to_document(order_id, status, now);
        apply_prices(&mut order, &prices);
        order.inventory_processed = true;
        order.requires_inventory_processing = false;
        tx.set(order_path(order_id), order.to_value()?);

        Ok(tx)
    }

    /// Finds the record a line draws from and its balance within this
    /// transaction.
    async fn stock_record(
        &self,
        tx: &mut Transaction,
        line: &CartItem,
        balances: &BTreeMap<DocumentPath, i64>,
    ) -> Result<(DocumentPath, i64)> {
        let product_id = line.product_id.as_str();

        if let Some(variant_id) = line.variant_id.as_ref() {
            let path = variant_path(product_id, variant_id.as_str());
            if let Some(balance) = balances.get(&path) {
                return Ok((path, *balance));
            }
            if let Some(doc) = self.store.get_in(tx, &path).await? {
                return Ok((path, read_stock(&doc).unwrap_or(0)));
            }
        }

        let path = product_path(product_id);
        if let Some(balance) = balances.get(&path) {
            return Ok((path, *balance));
        }
        let flat_stock = self
            .store
            .get_in(tx, &path)
            .await?
            .and_then(|doc| read_stock(&doc));
        match flat_stock {
            Some(stock) => Ok((path, stock)),
            None => Err(CheckoutError::ProductNotFound {
                product_id: product_id.to_string(),
                product_name: line.name.clone(),
            }),
        }
    }
}
