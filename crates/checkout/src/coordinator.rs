//! Checkout coordinator tying draft assembly, uploads and the commit paths
//! together.

use std::time::Instant;

use chrono::Utc;
use common::OrderId;
use document_store::DocumentStore;
use domain::{
    CartAccess, CheckoutForm, Money, OrderDraft, OrderDraftBuilder, OrderStatus, PaymentChoice,
    PaymentProof, RawGeolocation,
};

use crate::error::{CheckoutError, Result};
use crate::fallback::{MANUAL_RECONCILIATION_NOTICE, ReservationFallbackPolicy};
use crate::reservation::InventoryReservationTransaction;
use crate::services::uploads::UploadService;

/// Folder payment receipts are hosted under.
pub const RECEIPT_FOLDER: &str = "payment-receipts";

/// Everything the customer submits at checkout besides the cart.
#[derive(Debug, Clone, Default)]
pub struct CheckoutRequest {
    pub form: CheckoutForm,
    pub payment: PaymentChoice,
    pub geolocation: Option<RawGeolocation>,
    pub user_id: Option<String>,
}

/// How the order was placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// Stock reserved and order written atomically.
    Committed {
        order_id: OrderId,
        status: OrderStatus,
        receipt_pending: bool,
    },
    /// Order written without a reservation, waiting for manual
    /// reconciliation.
    Degraded {
        order_id: OrderId,
        notice: &'static str,
        receipt_pending: bool,
    },
}

impl CheckoutOutcome {
    pub fn order_id(&self) -> OrderId {
        match self {
            CheckoutOutcome::Committed { order_id, .. }
            | CheckoutOutcome::Degraded { order_id, .. } => *order_id,
        }
    }

    pub fn status(&self) -> OrderStatus {
        match self {
            CheckoutOutcome::Committed { status, .. } => *status,
            CheckoutOutcome::Degraded { .. } => OrderStatus::PendingInventory,
        }
    }

    pub fn notice(&self) -> Option<&'static str> {
        match self {
            CheckoutOutcome::Committed { .. } => None,
            CheckoutOutcome::Degraded { notice, .. } => Some(notice),
        }
    }

    /// True when the receipt upload failed and the order awaits it.
    pub fn receipt_pending(&self) -> bool {
        match self {
            CheckoutOutcome::Committed {
                receipt_pending, ..
            }
            | CheckoutOutcome::Degraded {
                receipt_pending, ..
            } => *receipt_pending,
        }
    }
}

/// Places orders from a cart.
///
/// The flow is:
/// 1. Validate the form and cart into an [`OrderDraft`] (no store access)
/// 2. Host the payment receipt, if any; a failed upload only flags the order
/// 3. Reserve stock and write the order in one transaction
/// 4. On a permission failure, write the order through the fallback policy
///
/// The cart is cleared only once an order document exists.
pub struct CheckoutCoordinator<S, U>
where
    S: DocumentStore,
    U: UploadService,
{
    builder: OrderDraftBuilder,
    reservation: InventoryReservationTransaction<S>,
    fallback: ReservationFallbackPolicy<S>,
    uploads: U,
}

impl<S, U> CheckoutCoordinator<S, U>
where
    S: DocumentStore + Clone,
    U: UploadService,
{
    /// Creates a coordinator charging a flat shipping fee.
    pub fn new(store: S, uploads: U, shipping_fee: Money) -> Self {
        Self {
            builder: OrderDraftBuilder::new(shipping_fee),
            reservation: InventoryReservationTransaction::new(store.clone()),
            fallback: ReservationFallbackPolicy::new(store),
            uploads,
        }
    }

    pub fn shipping_fee(&self) -> Money {
        self.builder.shipping_fee()
    }

    #[tracing::instrument(skip(self, cart, request), fields(lines = cart.lines().len()))]
    pub async fn checkout<C>(&self, cart: &mut C, request: CheckoutRequest) -> Result<CheckoutOutcome>
    where
        C: CartAccess + Send + ?Sized,
    {
        metrics::counter!("checkout_attempts_total").increment(1);
        let started = Instant::now();

        let result = self.place_order(cart, request).await;

        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());
        match &result {
            Ok(CheckoutOutcome::Committed { order_id, .. }) => {
                metrics::counter!("checkout_committed_total").increment(1);
                tracing::info!(%order_id, "checkout committed");
            }
            Ok(CheckoutOutcome::Degraded { order_id, .. }) => {
                metrics::counter!("checkout_fallback_total").increment(1);
                tracing::warn!(%order_id, "checkout degraded to manual reconciliation");
            }
            Err(err) => {
                metrics::counter!("checkout_rejected_total", "reason" => err.reason()).increment(1);
                match err {
                    CheckoutError::Store(_)
                    | CheckoutError::FallbackFailed { .. }
                    | CheckoutError::Serialization(_) => {
                        tracing::error!(error = %err, "checkout failed");
                    }
                    _ => tracing::info!(error = %err, "checkout rejected"),
                }
            }
        }
        result
    }

    async fn place_order<C>(&self, cart: &mut C, request: CheckoutRequest) -> Result<CheckoutOutcome>
    where
        C: CartAccess + Send + ?Sized,
    {
        let CheckoutRequest {
            form,
            payment,
            geolocation,
            user_id,
        } = request;

        let mut draft = self
            .builder
            .assemble(cart.lines(), &form, payment, geolocation, user_id)?;
        let order_id = OrderId::new();

        self.host_receipt(&mut draft, &order_id).await;
        let receipt_pending = draft.pending_receipt;

        let now = Utc::now();
        match self.reservation.reserve(cart.lines(), &draft, &order_id, now).await {
            Ok(reserved) => {
                cart.clear();
                Ok(CheckoutOutcome::Committed {
                    order_id: reserved.order_id,
                    status: draft.initial_status(),
                    receipt_pending,
                })
            }
            Err(err) if err.is_authorization_denied() => {
                tracing::warn!(%order_id, error = %err, "reservation denied, using fallback");
                self.fallback
                    .place_unreserved_order(cart.lines(), &draft, &order_id, now)
                    .await?;
                cart.clear();
                Ok(CheckoutOutcome::Degraded {
                    order_id,
                    notice: MANUAL_RECONCILIATION_NOTICE,
                    receipt_pending,
                })
            }
            Err(err) => Err(err),
        }
    }

    async fn host_receipt(&self, draft: &mut OrderDraft, order_id: &OrderId) {
        let Some(receipt) = draft.take_receipt() else {
            return;
        };
        let tags = vec![format!("order:{order_id}"), "payment-receipt".to_string()];
        match self.uploads.upload(&receipt, RECEIPT_FOLDER, &tags).await {
            Ok(file) => draft.attach_payment_proof(PaymentProof {
                url: file.url,
                file_id: file.file_id,
            }),
            Err(error) => {
                tracing::warn!(%order_id, %error, "receipt upload failed, order flagged");
                draft.mark_receipt_pending();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use document_store::{AccessPolicy, DocumentStoreExt, InMemoryDocumentStore};
    use domain::collections::{order_path, variant_path};
    use domain::{Cart, OrderDocument, Product, ProductId, ReceiptFile, Variant, VariantId};
    use serde_json::json;

    use super::*;
    use crate::services::uploads::InMemoryUploadService;

    fn product() -> Product {
        Product {
            id: ProductId::new("p1"),
            name: "Rain Jacket".into(),
            base_price: Money::from_cents(5000),
            variants: vec![Variant {
                id: VariantId::new("v1"),
                stock: 5,
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn cart_with(quantity: i64) -> Cart {
        let product = product();
        let mut cart = Cart::new();
        cart.add_item(&product, product.variant("v1"));
        cart.update_quantity("p1", Some("v1"), quantity).unwrap();
        cart
    }

    fn request(method: &str) -> CheckoutRequest {
        CheckoutRequest {
            form: CheckoutForm {
                full_name: "Lee Park".into(),
                email: "lee@example.com".into(),
                phone: "555".into(),
                address: "1 Main".into(),
                city: "Town".into(),
                zip_code: "9000".into(),
            },
            payment: PaymentChoice {
                method: method.into(),
                transaction_number: Some("TX-77".into()),
                receipt: Some(ReceiptFile {
                    file_name: "r.png".into(),
                    content_type: "image/png".into(),
                    bytes: vec![1],
                }),
            },
            geolocation: None,
            user_id: None,
        }
    }

    async fn setup() -> (
        CheckoutCoordinator<InMemoryDocumentStore, InMemoryUploadService>,
        InMemoryDocumentStore,
        InMemoryUploadService,
    ) {
        let store = InMemoryDocumentStore::new();
        store.seed(variant_path("p1", "v1"), json!({"stock": 5})).await;
        let uploads = InMemoryUploadService::new();
        let coordinator =
            CheckoutCoordinator::new(store.clone(), uploads.clone(), Money::from_cents(1000));
        (coordinator, store, uploads)
    }

    #[tokio::test]
    async fn test_qr_checkout_hosts_receipt() {
        let (coordinator, store, uploads) = setup().await;
        let mut cart = cart_with(1);

        let outcome = coordinator.checkout(&mut cart, request("qr")).await.unwrap();

        assert_eq!(outcome.status(), OrderStatus::PendingPayment);
        assert!(!outcome.receipt_pending());
        assert!(cart.is_empty());
        assert_eq!(uploads.file_count(), 1);

        let order: OrderDocument = store
            .get_as(&order_path(&outcome.order_id()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.payment_proofs.len(), 1);
        assert!(order.payment.receipt_uploaded);
        assert_eq!(order.payment.total.cents(), 6000);
    }

    #[tokio::test]
    async fn test_failed_upload_does_not_block_checkout() {
        let (coordinator, store, uploads) = setup().await;
        uploads.set_fail_on_upload(true);
        let mut cart = cart_with(1);

        let outcome = coordinator.checkout(&mut cart, request("qr")).await.unwrap();

        assert!(outcome.receipt_pending());
        let order: OrderDocument = store
            .get_as(&order_path(&outcome.order_id()))
            .await
            .unwrap()
            .unwrap();
        assert!(order.pending_receipt);
        assert!(order.payment_proofs.is_empty());
    }

    #[tokio::test]
    async fn test_validation_failure_touches_nothing() {
        let (coordinator, store, uploads) = setup().await;
        let mut cart = cart_with(1);
        let mut bad = request("qr");
        bad.form.email.clear();

        let err = coordinator.checkout(&mut cart, bad).await.unwrap_err();

        assert!(matches!(err, CheckoutError::Validation(ref v) if v.is_missing("Email")));
        assert_eq!(cart.item_count(), 1);
        assert_eq!(uploads.file_count(), 0);
        assert_eq!(store.document_count("orders").await, 0);
    }

    #[tokio::test]
    async fn test_fallback_failure_keeps_cart() {
        let (coordinator, store, _) = setup().await;
        store
            .set_policy(
                AccessPolicy::allow_all()
                    .deny_writes("products")
                    .deny_writes("orders"),
            )
            .await;
        let mut cart = cart_with(2);

        let err = coordinator.checkout(&mut cart, request("cash")).await.unwrap_err();

        assert!(matches!(err, CheckoutError::FallbackFailed { .. }));
        assert_eq!(cart.total_units(), 2);
    }
}
