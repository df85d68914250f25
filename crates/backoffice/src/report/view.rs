use serde::Serialize;

use super::{Report, ReportRow};

/// Display settings for a report: a minimum-quantity filter and paging.
///
/// Paging only applies to [`ReportView::page`]; exports go through
/// [`ReportView::filtered`] and get every matching row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportView {
    pub min_qty: u32,
    pub page_size: usize,
}

impl Default for ReportView {
    fn default() -> Self {
        Self {
            min_qty: 0,
            page_size: 50,
        }
    }
}

/// One page of filtered rows, numbered from 1.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPage {
    pub rows: Vec<ReportRow>,
    pub page: usize,
    pub total_pages: usize,
    pub total_rows: usize,
}

impl ReportView {
    pub fn new(min_qty: u32, page_size: usize) -> Self {
        Self {
            min_qty,
            page_size: page_size.max(1),
        }
    }

    /// Rows with at least `min_qty` units, in report order.
    pub fn filtered<'a>(&self, report: &'a Report) -> Vec<&'a ReportRow> {
        report
            .rows
            .iter()
            .filter(|row| row.quantity >= self.min_qty)
            .collect()
    }

    /// Returns page `page` of the filtered rows. Out-of-range pages are
    /// clamped to the last page.
    pub fn page(&self, report: &Report, page: usize) -> ReportPage {
        let rows = self.filtered(report);
        let page_size = self.page_size.max(1);
        let total_rows = rows.len();
        let total_pages = total_rows.div_ceil(page_size).max(1);
        let page = page.clamp(1, total_pages);

        let rows = rows
            .into_iter()
            .skip((page - 1) * page_size)
            .take(page_size)
            .cloned()
            .collect();

        ReportPage {
            rows,
            page,
            total_pages,
            total_rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use domain::Money;

    use super::*;
    use crate::report::{ReportScope, ReportTotals};

    fn report(quantities: &[u32]) -> Report {
        let rows = quantities
            .iter()
            .enumerate()
            .map(|(i, &quantity)| ReportRow {
                order_id: format!("o{i}"),
                date: None,
                product_id: "p1".into(),
                product_name: "Tote".into(),
                quantity,
                price: Money::from_cents(100),
                purchase_cost: Money::zero(),
                revenue: Money::from_cents(100).multiply(quantity),
                cost: Money::zero(),
                profit: Money::from_cents(100).multiply(quantity),
            })
            .collect();
        Report {
            scope: ReportScope::Historic { force_full: false },
            rows,
            totals: ReportTotals::default(),
            partial: false,
            docs_read: quantities.len(),
        }
    }

    #[test]
    fn test_min_qty_filter() {
        let report = report(&[1, 3, 2, 5]);
        let view = ReportView::new(2, 10);

        let ids: Vec<_> = view.filtered(&report).iter().map(|r| r.order_id.as_str()).collect();
        assert_eq!(ids, vec!["o1", "o2", "o3"]);
    }

    #[test]
    fn test_paging_clamps_and_counts() {
        let report = report(&[1; 7]);
        let view = ReportView::new(0, 3);

        let last = view.page(&report, 3);
        assert_eq!(last.rows.len(), 1);
        assert_eq!(last.total_pages, 3);
        assert_eq!(last.total_rows, 7);

        assert_eq!(view.page(&report, 99).page, 3);
        assert_eq!(view.page(&report, 0).page, 1);
    }

    #[test]
    fn test_empty_report_has_one_empty_page() {
        let page = ReportView::default().page(&report(&[]), 1);
        assert!(page.rows.is_empty());
        assert_eq!(page.total_pages, 1);
    }
}
