use chrono::{DateTime, Duration, Utc};
use document_store::{Direction, DocumentQuery, DocumentStore};
use domain::collections::ORDERS;
use domain::{LineItemProductResolver, OrderDocument};

use super::{Report, ReportRow, ReportScope, ReportTotals};
use crate::catalog::load_catalog;
use crate::error::{BackofficeError, Result};

/// Orders fetched per query page.
pub const DEFAULT_PAGE_SIZE: usize = 500;
/// Historic scans stop after this many order documents unless forced.
pub const DEFAULT_MAX_DOCS: usize = 5000;

const CREATED_AT: &str = "createdAt";

/// Builds cost and profit reports by scanning orders page by page.
#[derive(Debug, Clone)]
pub struct ReportEngine<S> {
    store: S,
    page_size: usize,
    max_docs: usize,
}

impl<S: DocumentStore> ReportEngine<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            page_size: DEFAULT_PAGE_SIZE,
            max_docs: DEFAULT_MAX_DOCS,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_max_docs(mut self, max_docs: usize) -> Self {
        self.max_docs = max_docs;
        self
    }

    /// Runs a report over the given scope.
    ///
    /// Period reports filter on `createdAt` in the store and always read
    /// every matching order. Historic reports scan the whole collection and
    /// stop at the document cap unless `force_full` is set; a report cut
    /// short by the cap is flagged partial.
    #[tracing::instrument(skip(self))]
    pub async fn run(&self, scope: ReportScope) -> Result<Report> {
        let base = DocumentQuery::collection(ORDERS).order_by(CREATED_AT, Direction::Descending);
        let (orders, docs_read, partial) = match scope {
            ReportScope::Period { from, to } => {
                if to < from {
                    return Err(BackofficeError::InvalidPeriod(format!(
                        "{} is before {}",
                        to.to_rfc3339(),
                        from.to_rfc3339()
                    )));
                }
                self.scan_period(base, from, to).await?
            }
            ReportScope::Historic { force_full: true } => self.scan(base, None).await?,
            ReportScope::Historic { force_full: false } => {
                self.scan(base, Some(self.max_docs)).await?
            }
        };
        metrics::counter!("report_docs_read_total").increment(docs_read as u64);

        let catalog = load_catalog(&self.store).await?;
        let resolver = LineItemProductResolver::new(&catalog);

        let mut rows = Vec::new();
        let mut totals = ReportTotals::default();
        for order in orders.iter().filter(|order| !order.is_cancelled()) {
            totals.orders += 1;
            for line in &order.items {
                let resolved = resolver.resolve(line);
                let purchase_cost = resolved
                    .map(|r| r.product.purchase_cost)
                    .unwrap_or_default();
                let product_id = resolved
                    .map(|r| r.product.id.to_string())
                    .or_else(|| line.product_id.clone())
                    .unwrap_or_default();

                let revenue = line.line_total();
                let cost = purchase_cost.multiply(line.quantity);
                let row = ReportRow {
                    order_id: order.id.clone(),
                    date: order.created_at,
                    product_id,
                    product_name: line.name.clone(),
                    quantity: line.quantity,
                    price: line.price,
                    purchase_cost,
                    revenue,
                    cost,
                    profit: revenue - cost,
                };
                totals.add_row(&row);
                rows.push(row);
            }
        }

        if partial {
            tracing::warn!(docs_read, "report stopped at document cap");
        }
        tracing::info!(docs_read, rows = rows.len(), "report built");

        Ok(Report {
            scope,
            rows,
            totals,
            partial,
            docs_read,
        })
    }

    /// Reads every order created within `from..=to`.
    ///
    /// Current orders store `createdAt` as epoch milliseconds. Older ones
    /// hold RFC 3339 text, which the store compares as text: that range is
    /// taken by calendar date, widened by a day on each side to cover any
    /// UTC offset, and trimmed to the exact period once parsed.
    async fn scan_period(
        &self,
        base: DocumentQuery,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<(Vec<OrderDocument>, usize, bool)> {
        let millis = base
            .clone()
            .where_gte(CREATED_AT, from.timestamp_millis())
            .where_lte(CREATED_AT, to.timestamp_millis());
        let (mut orders, mut read, _) = self.scan(millis, None).await?;

        let first_day = from.checked_sub_signed(Duration::days(1)).unwrap_or(from);
        let last_day = to.checked_add_signed(Duration::days(2)).unwrap_or(to);
        let text = base
            .where_gte(CREATED_AT, calendar_date(first_day))
            .where_lte(CREATED_AT, calendar_date(last_day));
        let (text_dated, text_read, _) = self.scan(text, None).await?;
        read += text_read;
        orders.extend(
            text_dated
                .into_iter()
                .filter(|order| order.created_at.is_some_and(|ts| ts >= from && ts <= to)),
        );
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok((orders, read, false))
    }

    /// Reads pages until the query is exhausted or `cap` documents were read.
    ///
    /// Returns the parsed orders, the number of documents read and whether
    /// unread orders remain past the cap.
    async fn scan(
        &self,
        base: DocumentQuery,
        cap: Option<usize>,
    ) -> Result<(Vec<OrderDocument>, usize, bool)> {
        let mut orders = Vec::new();
        let mut read = 0;
        let mut cursor = None;

        loop {
            let budget = cap.map_or(self.page_size, |cap| self.page_size.min(cap - read));
            if budget == 0 {
                let Some(cursor) = cursor else {
                    return Ok((orders, read, false));
                };
                let peek = base.clone().start_after(cursor).limit(1);
                let more = !self.store.query(peek).await?.is_empty();
                return Ok((orders, read, more));
            }

            let mut query = base.clone().limit(budget);
            if let Some(cursor) = cursor.take() {
                query = query.start_after(cursor);
            }
            let page = self.store.query(query).await?;
            read += page.len();
            for doc in &page.documents {
                match OrderDocument::from_document(doc) {
                    Ok(order) => orders.push(order),
                    Err(error) => {
                        tracing::warn!(order_id = %doc.id(), %error, "skipping unreadable order");
                    }
                }
            }

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => return Ok((orders, read, false)),
            }
        }
    }
}

fn calendar_date(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d").to_string()
}
