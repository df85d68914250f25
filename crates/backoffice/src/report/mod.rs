//! Revenue, cost and profit reports over stored orders.

mod csv;
mod engine;
mod view;

use chrono::{DateTime, Utc};
use domain::Money;
use serde::Serialize;

pub use csv::{CSV_HEADER, write_csv};
pub use engine::{DEFAULT_MAX_DOCS, DEFAULT_PAGE_SIZE, ReportEngine};
pub use view::{ReportPage, ReportView};

/// Which orders a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "mode")]
pub enum ReportScope {
    /// Orders created within `[from, to]`, both ends inclusive.
    Period {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },
    /// Every order. The scan stops at the engine's document cap unless
    /// `force_full` is set.
    Historic { force_full: bool },
}

/// One order line with its cost attribution.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub order_id: String,
    pub date: Option<DateTime<Utc>>,
    /// Resolved catalog product, falling back to the id stored on the line.
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub price: Money,
    /// Zero when the line matches no catalog product.
    pub purchase_cost: Money,
    pub revenue: Money,
    pub cost: Money,
    pub profit: Money,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportTotals {
    pub orders: usize,
    pub units: u64,
    pub revenue: Money,
    pub cost: Money,
    pub profit: Money,
}

impl ReportTotals {
    fn add_row(&mut self, row: &ReportRow) {
        self.units += u64::from(row.quantity);
        self.revenue += row.revenue;
        self.cost += row.cost;
        self.profit += row.profit;
    }
}

/// Aggregated report. Cancelled orders contribute neither rows nor totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub scope: ReportScope,
    pub rows: Vec<ReportRow>,
    pub totals: ReportTotals,
    /// The scan stopped at the document cap with orders left unread.
    pub partial: bool,
    /// Order documents read, cancelled ones included.
    pub docs_read: usize,
}
