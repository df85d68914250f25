//! HTTP API for storefront checkout and the order back office.
//!
//! Exposes checkout, order administration and cost reports over a
//! [`DocumentStore`], with structured logging (tracing) and Prometheus
//! metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use backoffice::{OrderAdmin, ReportEngine};
use checkout::{CheckoutCoordinator, InMemoryUploadService};
use document_store::DocumentStore;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;

/// Shared application state accessible from all handlers.
pub struct AppState<S: DocumentStore> {
    pub checkout: CheckoutCoordinator<S, InMemoryUploadService>,
    pub admin: OrderAdmin<S>,
    pub reports: ReportEngine<S>,
    /// Name of the store backend, reported by `/health`.
    pub backend: &'static str,
}

/// Wires the services over one store according to the configuration.
pub fn create_state<S: DocumentStore + Clone + 'static>(
    store: S,
    backend: &'static str,
    config: &Config,
) -> Arc<AppState<S>> {
    Arc::new(AppState {
        checkout: CheckoutCoordinator::new(
            store.clone(),
            InMemoryUploadService::new(),
            config.shipping_fee,
        ),
        admin: OrderAdmin::new(store.clone())
            .with_max_status_corrections(config.max_status_corrections),
        reports: ReportEngine::new(store)
            .with_page_size(config.report_page_size)
            .with_max_docs(config.report_max_docs),
        backend,
    })
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: DocumentStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route("/checkout", post(routes::checkout::place::<S>))
        .route("/orders", get(routes::orders::list::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/status", post(routes::orders::set_status::<S>))
        .route("/orders/{id}/reconcile", post(routes::orders::reconcile::<S>))
        .route("/reports", get(routes::reports::summary::<S>))
        .route("/reports/export.csv", get(routes::reports::export_csv::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
