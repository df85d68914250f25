//! Order commit path for the storefront.
//!
//! Checkout turns the cart into a committed order in one of two ways:
//! 1. Reserve stock and write the order in a single atomic transaction
//! 2. When the store refuses the transaction for lack of permission, write
//!    the order alone, flagged for manual inventory reconciliation
//!
//! Business failures (validation, insufficient stock, unknown products)
//! leave the cart and the store untouched.

pub mod coordinator;
pub mod error;
pub mod fallback;
mod pricing;
pub mod reservation;
pub mod services;

pub use coordinator::{CheckoutCoordinator, CheckoutOutcome, CheckoutRequest};
pub use error::{CheckoutError, Result};
pub use fallback::{MANUAL_RECONCILIATION_NOTICE, ReservationFallbackPolicy};
pub use reservation::{InventoryReservationTransaction, ReservedOrder};
pub use services::{InMemoryUploadService, UploadError, UploadService, UploadedFile};
