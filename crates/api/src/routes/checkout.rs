//! Checkout endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use checkout::{CheckoutOutcome, CheckoutRequest};
use document_store::DocumentStore;
use domain::{Cart, CartItem, CheckoutForm, OrderStatus, PaymentChoice, RawGeolocation, ReceiptFile};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutBody {
    pub items: Vec<CartItem>,
    #[serde(default)]
    pub form: CheckoutForm,
    pub payment: PaymentBody,
    #[serde(default)]
    pub geolocation: Option<RawGeolocation>,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentBody {
    pub method: String,
    #[serde(default)]
    pub transaction_number: Option<String>,
    #[serde(default)]
    pub receipt: Option<ReceiptBody>,
}

/// Receipt upload with its content base64-encoded.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptBody {
    pub file_name: String,
    #[serde(default)]
    pub content_type: String,
    pub data: String,
}

// -- Response types --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub order_id: String,
    pub status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<&'static str>,
    pub receipt_pending: bool,
}

impl From<&CheckoutOutcome> for CheckoutResponse {
    fn from(outcome: &CheckoutOutcome) -> Self {
        Self {
            order_id: outcome.order_id().to_string(),
            status: outcome.status(),
            notice: outcome.notice(),
            receipt_pending: outcome.receipt_pending(),
        }
    }
}

impl PaymentBody {
    fn into_choice(self) -> Result<PaymentChoice, ApiError> {
        let receipt = self
            .receipt
            .map(|receipt| {
                let bytes = STANDARD
                    .decode(receipt.data.trim())
                    .map_err(|e| ApiError::BadRequest(format!("Invalid receipt data: {e}")))?;
                Ok::<_, ApiError>(ReceiptFile {
                    file_name: receipt.file_name,
                    content_type: receipt.content_type,
                    bytes,
                })
            })
            .transpose()?;

        Ok(PaymentChoice {
            method: self.method,
            transaction_number: self.transaction_number,
            receipt,
        })
    }
}

// -- Handlers --

/// POST /checkout places an order for the submitted cart lines.
///
/// Responds 201 both for reserved orders and for orders placed without a
/// reservation; the latter carry a `notice`.
#[tracing::instrument(skip(state, body), fields(lines = body.items.len()))]
pub async fn place<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(body): Json<CheckoutBody>,
) -> Result<(StatusCode, Json<CheckoutResponse>), ApiError> {
    let mut cart = Cart::from_items(body.items);
    let request = CheckoutRequest {
        form: body.form,
        payment: body.payment.into_choice()?,
        geolocation: body.geolocation,
        user_id: body.user_id,
    };

    let outcome = state.checkout.checkout(&mut cart, request).await?;
    Ok((StatusCode::CREATED, Json(CheckoutResponse::from(&outcome))))
}
