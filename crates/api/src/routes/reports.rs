//! Cost and profit report endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use backoffice::{Report, ReportPage, ReportScope, ReportTotals, ReportView, write_csv};
use chrono::{DateTime, Utc};
use document_store::DocumentStore;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;

/// Query parameters shared by the report and export endpoints.
///
/// `from` and `to` select a period report and must be given together;
/// without them the report covers all orders.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportParams {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub force_full: bool,
    pub min_qty: u32,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

impl ReportParams {
    fn scope(&self) -> Result<ReportScope, ApiError> {
        match (self.from, self.to) {
            (Some(from), Some(to)) => Ok(ReportScope::Period { from, to }),
            (None, None) => Ok(ReportScope::Historic {
                force_full: self.force_full,
            }),
            _ => Err(ApiError::BadRequest(
                "from and to must be given together".to_string(),
            )),
        }
    }

    fn view(&self) -> ReportView {
        let defaults = ReportView::default();
        ReportView::new(self.min_qty, self.page_size.unwrap_or(defaults.page_size))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub scope: ReportScope,
    pub totals: ReportTotals,
    pub partial: bool,
    pub docs_read: usize,
    #[serde(flatten)]
    pub page: ReportPage,
}

async fn build<S: DocumentStore + Clone + 'static>(
    state: &AppState<S>,
    params: &ReportParams,
) -> Result<Report, ApiError> {
    let scope = params.scope()?;
    Ok(state.reports.run(scope).await?)
}

/// GET /reports returns totals and one page of rows.
#[tracing::instrument(skip(state))]
pub async fn summary<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<ReportParams>,
) -> Result<Json<ReportResponse>, ApiError> {
    let report = build(&state, &params).await?;
    let page = params.view().page(&report, params.page.unwrap_or(1));

    Ok(Json(ReportResponse {
        scope: report.scope,
        totals: report.totals,
        partial: report.partial,
        docs_read: report.docs_read,
        page,
    }))
}

/// GET /reports/export.csv returns every row passing the quantity filter.
#[tracing::instrument(skip(state))]
pub async fn export_csv<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<ReportParams>,
) -> Result<impl IntoResponse, ApiError> {
    let report = build(&state, &params).await?;
    let csv = write_csv(params.view().filtered(&report));

    let filename = match report.scope {
        ReportScope::Period { from, to } => format!(
            "report-{}-{}.csv",
            from.format("%Y%m%d"),
            to.format("%Y%m%d")
        ),
        ReportScope::Historic { .. } => "report-all.csv".to_string(),
    };

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        csv,
    ))
}
