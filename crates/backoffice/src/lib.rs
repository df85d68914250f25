//! Back-office side of the order subsystem.
//!
//! This crate provides:
//! - [`OrderAdmin`] for listing orders with status self-healing, status
//!   transitions with the completion-time stock decrement, and manual
//!   inventory reconciliation
//! - [`ReportEngine`] for cost and profit reports over orders, with
//!   [`ReportView`] filtering and CSV export

pub mod catalog;
pub mod error;
pub mod orders;
pub mod report;

pub use catalog::load_catalog;
pub use error::{BackofficeError, Result};
pub use orders::{
    DEFAULT_MAX_STATUS_CORRECTIONS, DecrementSummary, OrderAdmin, OrderListing, StatusTransition,
};
pub use report::{
    CSV_HEADER, DEFAULT_MAX_DOCS, DEFAULT_PAGE_SIZE, Report, ReportEngine, ReportPage, ReportRow,
    ReportScope, ReportTotals, ReportView, write_csv,
};
