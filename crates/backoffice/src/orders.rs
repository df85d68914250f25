//! Order administration: listing, status changes and stock reconciliation.

use chrono::Utc;
use document_store::{
    Direction, DocumentPath, DocumentQuery, DocumentStore, MAX_TRANSACTION_ATTEMPTS, StoreError,
    Transaction,
};
use domain::collections::{ORDERS, product_path, variant_path};
use domain::{
    LineItemProductResolver, OrderDocument, OrderLine, OrderStatus, normalize_status, read_stock,
};
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::catalog::load_catalog;
use crate::error::{BackofficeError, Result};

/// Status corrections written per order list load unless configured.
pub const DEFAULT_MAX_STATUS_CORRECTIONS: usize = 20;

const ORDER_PAGE_SIZE: usize = 500;

/// Orders as shown in the admin list.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListing {
    /// Newest first, statuses normalized.
    pub orders: Vec<OrderDocument>,
    /// Stored statuses rewritten to their canonical form during this load.
    pub corrections_applied: usize,
    /// Stored statuses still waiting for a correction.
    pub corrections_pending: usize,
    /// Set once when corrections stopped because the store denied them.
    pub notice: Option<String>,
}

/// Result of an admin status change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusTransition {
    pub order_id: String,
    pub previous: String,
    pub status: OrderStatus,
    /// Present when this transition took the order's stock out of inventory.
    pub decrement: Option<DecrementSummary>,
}

/// What the completion-time decrement did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecrementSummary {
    pub lines_decremented: usize,
    /// Names of lines that matched no product or whose write failed.
    pub skipped: Vec<String>,
    /// Some line was skipped, so the order stays flagged for manual
    /// reconciliation.
    pub requires_reconciliation: bool,
}

/// Admin operations over stored orders.
///
/// Writes here are single-document and not transactional, except the
/// `inventoryProcessed` check-and-set that guards the completion decrement.
#[derive(Debug, Clone)]
pub struct OrderAdmin<S> {
    store: S,
    max_status_corrections: usize,
}

impl<S: DocumentStore> OrderAdmin<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            max_status_corrections: DEFAULT_MAX_STATUS_CORRECTIONS,
        }
    }

    /// Sets how many stored statuses one list load may rewrite.
    pub fn with_max_status_corrections(mut self, max: usize) -> Self {
        self.max_status_corrections = max;
        self
    }

    /// Loads every order, newest first, and repairs non-canonical statuses.
    ///
    /// Up to `max_status_corrections` stored statuses are rewritten per load.
    /// A permission failure stops the remaining corrections for this load
    /// and produces one notice; other failures are logged and skipped.
    #[tracing::instrument(skip(self))]
    pub async fn load_orders(&self) -> Result<OrderListing> {
        let mut orders = Vec::new();
        let mut query = DocumentQuery::collection(ORDERS)
            .order_by("createdAt", Direction::Descending)
            .limit(ORDER_PAGE_SIZE);

        loop {
            let page = self.store.query(query.clone()).await?;
            for doc in &page.documents {
                match OrderDocument::from_document(doc) {
                    Ok(order) => orders.push(order),
                    Err(error) => {
                        tracing::warn!(order_id = %doc.id(), %error, "skipping unreadable order");
                    }
                }
            }
            match page.next_cursor {
                Some(cursor) => query = query.start_after(cursor),
                None => break,
            }
        }

        let mut stale = Vec::new();
        for order in &mut orders {
            let normalized = normalize_status(&order.status);
            if normalized != order.status {
                order.status = normalized;
                stale.push((order.id.clone(), order.status.clone()));
            }
        }

        let mut listing = OrderListing {
            corrections_pending: stale.len(),
            ..Default::default()
        };
        let budget = stale.len().min(self.max_status_corrections);

        for (index, (order_id, status)) in stale.iter().take(budget).enumerate() {
            let path = DocumentPath::new(ORDERS, order_id.as_str());
            match self.store.update(&path, status_fields(status)).await {
                Ok(()) => {
                    listing.corrections_applied += 1;
                    listing.corrections_pending -= 1;
                    metrics::counter!("status_corrections_total").increment(1);
                }
                Err(err) if err.is_permission_denied() => {
                    let remaining = budget - index;
                    tracing::warn!(remaining, "status corrections denied, stopping for this load");
                    listing.notice = Some(format!(
                        "{remaining} order statuses could not be corrected: permission denied"
                    ));
                    break;
                }
                Err(error) => {
                    tracing::warn!(%order_id, %error, "status correction failed");
                }
            }
        }

        listing.orders = orders;
        Ok(listing)
    }

    /// Loads one order.
    pub async fn get_order(&self, order_id: &str) -> Result<OrderDocument> {
        let path = DocumentPath::new(ORDERS, order_id);
        let doc = self
            .store
            .get(&path)
            .await?
            .ok_or_else(|| BackofficeError::OrderNotFound(order_id.to_string()))?;
        Ok(OrderDocument::from_document(&doc)?)
    }

    /// Moves an order to a new status.
    ///
    /// Moving to `completed` from any other status takes the order's stock
    /// out of inventory, unless that already happened at checkout or through
    /// manual reconciliation.
    #[tracing::instrument(skip(self))]
    pub async fn transition_status(
        &self,
        order_id: &str,
        requested: &str,
    ) -> Result<StatusTransition> {
        let status = OrderStatus::parse(requested)
            .ok_or_else(|| BackofficeError::InvalidStatus(requested.to_string()))?;
        let order = self.get_order(order_id).await?;
        let previous = normalize_status(&order.status);

        let mut fields = status_fields(status.as_str());
        fields.insert("updatedAt".to_string(), json!(Utc::now().timestamp_millis()));
        self.store
            .update(&DocumentPath::new(ORDERS, order_id), fields)
            .await
            .map_err(|err| not_found_as_order(err, order_id))?;
        tracing::info!(%order_id, %previous, status = %status, "order status changed");

        let completing =
            status == OrderStatus::Completed && previous != OrderStatus::Completed.as_str();
        let decrement = if completing {
            self.complete_inventory(order_id).await?
        } else {
            None
        };

        Ok(StatusTransition {
            order_id: order_id.to_string(),
            previous,
            status,
            decrement,
        })
    }

    /// Marks an order's stock as handled outside the system.
    #[tracing::instrument(skip(self))]
    pub async fn mark_inventory_reconciled(&self, order_id: &str) -> Result<()> {
        let mut fields = Map::new();
        fields.insert("inventoryProcessed".to_string(), Value::Bool(true));
        fields.insert("requiresInventoryProcessing".to_string(), Value::Bool(false));
        fields.insert("updatedAt".to_string(), json!(Utc::now().timestamp_millis()));

        self.store
            .update(&DocumentPath::new(ORDERS, order_id), fields)
            .await
            .map_err(|err| not_found_as_order(err, order_id))?;
        tracing::info!(%order_id, "inventory marked as reconciled");
        Ok(())
    }

    /// Decrements stock for an order that is being completed.
    ///
    /// `requiresInventoryProcessing` is cleared only when every line was
    /// decremented. When no line could be decremented the claim on
    /// `inventoryProcessed` is released as well, so a later completion or a
    /// manual reconciliation can still account for the order.
    async fn complete_inventory(&self, order_id: &str) -> Result<Option<DecrementSummary>> {
        let Some(order) = self.claim_inventory(order_id).await? else {
            tracing::info!(%order_id, "inventory already processed, skipping decrement");
            return Ok(None);
        };

        let catalog = load_catalog(&self.store).await?;
        let resolver = LineItemProductResolver::new(&catalog);
        let mut summary = DecrementSummary::default();

        for line in &order.items {
            let Some(resolved) = resolver.resolve(line) else {
                tracing::warn!(%order_id, item = %line.name, "no product for line, stock not decremented");
                summary.skipped.push(line.name.clone());
                continue;
            };
            let product = resolved.product;
            let is_variant = |id: &str| product.variant(id).is_some();
            match self.decrement_line(product.id.as_str(), line, is_variant).await {
                Ok(()) => summary.lines_decremented += 1,
                Err(error) => {
                    tracing::warn!(%order_id, item = %line.name, %error, "stock decrement failed");
                    summary.skipped.push(line.name.clone());
                }
            }
        }

        let mut fields = Map::new();
        if summary.skipped.is_empty() {
            fields.insert("requiresInventoryProcessing".to_string(), Value::Bool(false));
        } else {
            summary.requires_reconciliation = true;
            fields.insert("requiresInventoryProcessing".to_string(), Value::Bool(true));
            if summary.lines_decremented == 0 {
                fields.insert("inventoryProcessed".to_string(), Value::Bool(false));
            }
            tracing::warn!(
                %order_id,
                decremented = summary.lines_decremented,
                skipped = summary.skipped.len(),
                "completion decrement incomplete, order left for manual reconciliation"
            );
        }
        self.store
            .update(&DocumentPath::new(ORDERS, order_id), fields)
            .await
            .map_err(|err| not_found_as_order(err, order_id))?;

        Ok(Some(summary))
    }

    /// Sets `inventoryProcessed` if it is not set yet.
    ///
    /// Returns the order when this call flipped the flag, `None` when some
    /// earlier path already did.
    async fn claim_inventory(&self, order_id: &str) -> Result<Option<OrderDocument>> {
        let path = DocumentPath::new(ORDERS, order_id);
        let mut attempt = 1;
        loop {
            let mut tx = Transaction::new();
            let doc = self
                .store
                .get_in(&mut tx, &path)
                .await?
                .ok_or_else(|| BackofficeError::OrderNotFound(order_id.to_string()))?;
            let order = OrderDocument::from_document(&doc)?;
            if order.inventory_processed {
                return Ok(None);
            }

            let mut fields = Map::new();
            fields.insert("inventoryProcessed".to_string(), Value::Bool(true));
            tx.update(path.clone(), fields);

            match self.store.commit(tx).await {
                Ok(()) => return Ok(Some(order)),
                Err(err) if err.is_aborted() && attempt < MAX_TRANSACTION_ATTEMPTS => attempt += 1,
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Decrements one line's stock record, clamping at zero.
    ///
    /// The variant record is used when the line names a variant of the
    /// resolved product and that record exists; otherwise the product's flat
    /// stock.
    async fn decrement_line(
        &self,
        product_id: &str,
        line: &OrderLine,
        is_known_variant: impl Fn(&str) -> bool,
    ) -> Result<()> {
        let variant_id = line
            .variant_id
            .as_deref()
            .or_else(|| line.id.as_deref().filter(|id| is_known_variant(id)));

        let mut target = None;
        if let Some(variant_id) = variant_id {
            let path = variant_path(product_id, variant_id);
            if let Some(doc) = self.store.get(&path).await? {
                target = Some((path, doc));
            }
        }
        let (path, doc) = match target {
            Some(found) => found,
            None => {
                let path = product_path(product_id);
                let doc = self
                    .store
                    .get(&path)
                    .await?
                    .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
                (path, doc)
            }
        };

        let current = read_stock(&doc).unwrap_or(0);
        let remaining = (current - i64::from(line.quantity)).max(0);

        let mut fields = Map::new();
        fields.insert("stock".to_string(), json!(remaining));
        self.store.update(&path, fields).await?;
        Ok(())
    }
}

fn status_fields(status: &str) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("status".to_string(), Value::String(status.to_string()));
    fields
}

fn not_found_as_order(err: StoreError, order_id: &str) -> BackofficeError {
    match err {
        StoreError::NotFound(_) => BackofficeError::OrderNotFound(order_id.to_string()),
        other => other.into(),
    }
}
