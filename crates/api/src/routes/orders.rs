//! Order administration endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use backoffice::{OrderListing, StatusTransition};
use document_store::DocumentStore;
use domain::OrderDocument;
use serde::Deserialize;

use crate::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

/// GET /orders lists orders newest first, repairing legacy statuses.
#[tracing::instrument(skip(state))]
pub async fn list<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<OrderListing>, ApiError> {
    Ok(Json(state.admin.load_orders().await?))
}

/// GET /orders/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderDocument>, ApiError> {
    Ok(Json(state.admin.get_order(&id).await?))
}

/// POST /orders/{id}/status moves an order to a new status.
#[tracing::instrument(skip(state, req))]
pub async fn set_status<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<StatusTransition>, ApiError> {
    Ok(Json(state.admin.transition_status(&id, &req.status).await?))
}

/// POST /orders/{id}/reconcile records that the order's stock was handled
/// by hand.
#[tracing::instrument(skip(state))]
pub async fn reconcile<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.admin.mark_inventory_reconciled(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
