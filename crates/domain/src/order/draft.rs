//! Assembly of an order from the cart and the checkout form.

use chrono::{DateTime, Utc};
use common::OrderId;
use serde::Deserialize;

use super::document::{
    Customer, OrderDocument, OrderLine, PaymentProof, PaymentSummary, ShippingAddress,
};
use super::geolocation::{GeoLocation, RawGeolocation};
use super::status::OrderStatus;
use crate::cart::CartItem;
use crate::error::ValidationError;
use crate::value_objects::Money;

/// Shipping and contact details entered at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckoutForm {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub zip_code: String,
}

/// An uploaded payment receipt, not yet hosted anywhere.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReceiptFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for ReceiptFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiptFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Payment method picked by the customer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentChoice {
    pub method: String,
    pub transaction_number: Option<String>,
    pub receipt: Option<ReceiptFile>,
}

impl PaymentChoice {
    /// QR bank transfers need a transaction number and a receipt.
    pub fn is_qr(&self) -> bool {
        self.method.trim().eq_ignore_ascii_case("qr")
    }
}

/// A validated order that has not been written yet.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    pub customer: Customer,
    pub shipping_address: ShippingAddress,
    pub items: Vec<OrderLine>,
    pub payment: PaymentSummary,
    pub payment_proofs: Vec<PaymentProof>,
    pub pending_receipt: bool,
    pub user_id: Option<String>,
    receipt: Option<ReceiptFile>,
}

impl OrderDraft {
    /// `pending_payment` for QR transfers, `pending` otherwise.
    pub fn initial_status(&self) -> OrderStatus {
        if self.payment.method.trim().eq_ignore_ascii_case("qr") {
            OrderStatus::PendingPayment
        } else {
            OrderStatus::Pending
        }
    }

    /// Takes the receipt out of the draft for uploading.
    pub fn take_receipt(&mut self) -> Option<ReceiptFile> {
        self.receipt.take()
    }

    /// Records the hosted receipt.
    pub fn attach_payment_proof(&mut self, proof: PaymentProof) {
        self.payment_proofs.push(proof);
        self.payment.receipt_uploaded = true;
        self.pending_receipt = false;
    }

    /// Flags the order as still waiting for its receipt.
    pub fn mark_receipt_pending(&mut self) {
        self.payment.receipt_uploaded = false;
        self.pending_receipt = true;
    }

    /// Builds the order document. Inventory flags start cleared.
    pub fn to_document(
        &self,
        order_id: &OrderId,
        status: OrderStatus,
        now: DateTime<Utc>,
    ) -> OrderDocument {
        OrderDocument {
            id: order_id.to_string(),
            status: status.as_str().to_string(),
            customer: self.customer.clone(),
            shipping_address: self.shipping_address.clone(),
            items: self.items.clone(),
            payment: self.payment.clone(),
            payment_proofs: self.payment_proofs.clone(),
            requires_inventory_processing: false,
            pending_receipt: self.pending_receipt,
            inventory_processed: false,
            user_id: self.user_id.clone(),
            created_at: Some(now),
            updated_at: Some(now),
        }
    }
}

/// Validates checkout input and builds an [`OrderDraft`].
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderDraftBuilder {
    shipping_fee: Money,
}

impl OrderDraftBuilder {
    pub fn new(shipping_fee: Money) -> Self {
        Self { shipping_fee }
    }

    pub fn shipping_fee(&self) -> Money {
        self.shipping_fee
    }

    /// Assembles a draft, or lists every missing field.
    pub fn assemble(
        &self,
        cart_items: &[CartItem],
        form: &CheckoutForm,
        payment: PaymentChoice,
        geolocation: Option<RawGeolocation>,
        user_id: Option<String>,
    ) -> Result<OrderDraft, ValidationError> {
        let mut missing = Vec::new();
        let required = [
            ("Full name", &form.full_name),
            ("Email", &form.email),
            ("Phone", &form.phone),
            ("Address", &form.address),
            ("City", &form.city),
            ("Zip code", &form.zip_code),
        ];
        for (label, value) in required {
            if value.trim().is_empty() {
                missing.push(label);
            }
        }
        if payment.is_qr() {
            if payment
                .transaction_number
                .as_deref()
                .is_none_or(|n| n.trim().is_empty())
            {
                missing.push("Transaction number");
            }
            if payment.receipt.as_ref().is_none_or(|r| r.bytes.is_empty()) {
                missing.push("Payment receipt");
            }
        }
        if cart_items.is_empty() {
            missing.push("Cart items");
        }
        if !missing.is_empty() {
            return Err(ValidationError { missing });
        }

        let location = geolocation.map(GeoLocation::from);
        let mut names = form.full_name.split_whitespace();
        let first_name = names.next().unwrap_or_default().to_string();
        let last_name = names.collect::<Vec<_>>().join(" ");

        let items: Vec<OrderLine> = cart_items
            .iter()
            .map(|item| OrderLine {
                product_id: Some(item.product_id.to_string()),
                id: None,
                variant_id: item.variant_id.as_ref().map(|v| v.to_string()),
                name: item.name.clone(),
                image: item.image.clone(),
                price: item.effective_unit_price(),
                quantity: item.quantity,
                size: item.size.clone(),
            })
            .collect();
        let subtotal: Money = cart_items.iter().map(CartItem::line_total).sum();

        let PaymentChoice {
            method,
            transaction_number,
            receipt,
        } = payment;

        Ok(OrderDraft {
            customer: Customer {
                first_name,
                last_name,
                email: form.email.trim().to_string(),
                phone: form.phone.trim().to_string(),
                location: location.clone(),
            },
            shipping_address: ShippingAddress {
                address: form.address.trim().to_string(),
                city: form.city.trim().to_string(),
                zip_code: form.zip_code.trim().to_string(),
                location,
            },
            items,
            payment: PaymentSummary {
                method: method.trim().to_lowercase(),
                subtotal,
                shipping: self.shipping_fee,
                total: subtotal + self.shipping_fee,
                transaction_number: transaction_number
                    .map(|n| n.trim().to_string())
                    .filter(|n| !n.is_empty()),
                receipt_uploaded: false,
            },
            payment_proofs: Vec::new(),
            pending_receipt: false,
            user_id,
            receipt: receipt.filter(|r| !r.bytes.is_empty()),
        })
    }
}
